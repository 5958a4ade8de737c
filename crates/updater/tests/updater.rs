use async_trait::async_trait;
use qmlsync_fs::backend::MockFileSystem;
use qmlsync_parse::models::{QmlDocument, QmlTypes};
use qmlsync_store::ids::{ModuleId, ProjectPartId, SourceContextId, SourceId};
use qmlsync_store::types::{
    ExportedTypeRecord, FileStatus, Import, Module, ModuleDependency, ModuleKind, ProjectData, Snapshot, Source,
    TypeRecord, Version,
};
use qmlsync_store::{Database, ProjectStorage, Repository, StorageHandle, SynchronizationPackage};
use qmlsync_updater::error::ErrorKind;
use qmlsync_updater::{
    DiagnosticKind, DocumentParser, IdPaths, InMemoryPathWatcher, PathCache, PathWatcherNotifier, ProjectChunkId,
    ProjectStorageUpdater, QueueNotifier, SourceType, TypesParser, run_notification_loop,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

const PART: ProjectPartId = ProjectPartId::new(1);
const OTHER_PART: ProjectPartId = ProjectPartId::new(2);

const QMLDIR: &str = "module M\nFoo 1.0 Foo.qml\nBar 1.0 Bar.qml\n";
const FOO: &str = "import QtQuick 2.15\nItem {\n    property int size\n}\n";
const BAR: &str = "import QtQuick\nRectangle {}\n";

#[derive(Default)]
struct CountingDocuments(AtomicUsize);

impl DocumentParser for CountingDocuments {
    fn parse(&self, text: &str) -> qmlsync_parse::error::Result<QmlDocument> {
        self.0.fetch_add(1, Ordering::SeqCst);
        qmlsync_parse::parse_qml(text)
    }
}

#[derive(Default)]
struct CountingTypes(AtomicUsize);

impl TypesParser for CountingTypes {
    fn parse(&self, text: &str) -> qmlsync_parse::error::Result<QmlTypes> {
        self.0.fetch_add(1, Ordering::SeqCst);
        qmlsync_parse::parse_qmltypes(text)
    }
}

/// Delegates to a real repository, except that commits can be made to fail.
struct FailingStorage {
    inner: Repository,
    fail: AtomicBool,
}

#[async_trait]
impl ProjectStorage for FailingStorage {
    async fn synchronize(&self, package: SynchronizationPackage) -> qmlsync_store::error::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            exn::bail!(qmlsync_store::error::ErrorKind::Database);
        }
        self.inner.synchronize(package).await
    }
    async fn fetch_file_status(&self, source_id: SourceId) -> qmlsync_store::error::Result<Option<FileStatus>> {
        self.inner.fetch_file_status(source_id).await
    }
    async fn fetch_project_datas(
        &self,
        project_source_id: SourceId,
        part: ProjectPartId,
    ) -> qmlsync_store::error::Result<Vec<ProjectData>> {
        self.inner.fetch_project_datas(project_source_id, part).await
    }
    async fn fetch_project_part_ids(&self, project_source_id: SourceId) -> qmlsync_store::error::Result<Vec<ProjectPartId>> {
        self.inner.fetch_project_part_ids(project_source_id).await
    }
    async fn fetch_project_source_ids(&self, part: ProjectPartId) -> qmlsync_store::error::Result<Vec<SourceId>> {
        self.inner.fetch_project_source_ids(part).await
    }
    async fn fetch_types(&self, source_id: SourceId) -> qmlsync_store::error::Result<Vec<TypeRecord>> {
        self.inner.fetch_types(source_id).await
    }
    async fn fetch_exported_types(&self, module_id: ModuleId) -> qmlsync_store::error::Result<Vec<ExportedTypeRecord>> {
        self.inner.fetch_exported_types(module_id).await
    }
    async fn fetch_imports(&self, source_id: SourceId) -> qmlsync_store::error::Result<Vec<Import>> {
        self.inner.fetch_imports(source_id).await
    }
    async fn fetch_module_dependencies(&self, source_id: SourceId) -> qmlsync_store::error::Result<Vec<ModuleDependency>> {
        self.inner.fetch_module_dependencies(source_id).await
    }
    async fn fetch_source_context_id(&self, path: &str) -> qmlsync_store::error::Result<SourceContextId> {
        self.inner.fetch_source_context_id(path).await
    }
    async fn fetch_source_id(&self, context: SourceContextId, name: &str) -> qmlsync_store::error::Result<SourceId> {
        self.inner.fetch_source_id(context, name).await
    }
    async fn fetch_all_source_contexts(&self) -> qmlsync_store::error::Result<Vec<(SourceContextId, String)>> {
        self.inner.fetch_all_source_contexts().await
    }
    async fn fetch_all_sources(&self) -> qmlsync_store::error::Result<Vec<Source>> {
        self.inner.fetch_all_sources().await
    }
    async fn fetch_module_id(&self, name: &str, kind: ModuleKind) -> qmlsync_store::error::Result<ModuleId> {
        self.inner.fetch_module_id(name, kind).await
    }
    async fn fetch_module(&self, module_id: ModuleId) -> qmlsync_store::error::Result<Module> {
        self.inner.fetch_module(module_id).await
    }
    async fn fetch_project_part_id(&self, name: &str) -> qmlsync_store::error::Result<ProjectPartId> {
        self.inner.fetch_project_part_id(name).await
    }
    async fn snapshot(&self) -> qmlsync_store::error::Result<Snapshot> {
        self.inner.snapshot().await
    }
}

struct Fixture {
    db: Database,
    fs: Arc<MockFileSystem>,
    storage: Arc<FailingStorage>,
    watcher: Arc<InMemoryPathWatcher>,
    documents: Arc<CountingDocuments>,
    types: Arc<CountingTypes>,
    updater: Arc<ProjectStorageUpdater>,
}

impl Fixture {
    async fn new(files: &[(&str, &str)]) -> Self {
        let db = Database::connect_in_memory().await.unwrap();
        let fs = Arc::new(MockFileSystem::with_files(files.iter().copied()));
        let storage = Arc::new(FailingStorage { inner: Repository::from(&db), fail: AtomicBool::new(false) });
        let handle: StorageHandle = storage.clone();
        let paths = Arc::new(PathCache::new(handle.clone()));
        let watcher = Arc::new(InMemoryPathWatcher::default());
        let documents = Arc::new(CountingDocuments::default());
        let types = Arc::new(CountingTypes::default());
        let updater = ProjectStorageUpdater::new(fs.clone(), handle, paths, watcher.clone())
            .with_parsers(documents.clone(), types.clone());
        let updater = Arc::new(updater);
        Self { db, fs, storage, watcher, documents, types, updater }
    }

    async fn update(&self, directories: &[&str], qmltypes: &[&str]) -> qmlsync_updater::UpdateReport {
        self.update_part(directories, qmltypes, PART).await
    }

    async fn update_part(
        &self,
        directories: &[&str],
        qmltypes: &[&str],
        part: ProjectPartId,
    ) -> qmlsync_updater::UpdateReport {
        let directories: Vec<PathBuf> = directories.iter().map(PathBuf::from).collect();
        let qmltypes: Vec<PathBuf> = qmltypes.iter().map(PathBuf::from).collect();
        self.updater.update(&directories, &qmltypes, part).await.unwrap()
    }

    fn directory(&self, path: &str) -> SourceId {
        self.updater.paths().lookup_directory(Path::new(path)).unwrap()
    }

    async fn members(&self, directory: &str, part: ProjectPartId) -> Vec<SourceId> {
        let datas = self.storage.fetch_project_datas(self.directory(directory), part).await.unwrap();
        datas.into_iter().map(|data| data.source_id).collect()
    }

    fn id(&self, path: &str) -> SourceId {
        self.updater.paths().lookup(Path::new(path)).unwrap()
    }

    async fn exports(&self, module: &str, kind: ModuleKind) -> Vec<(String, Version)> {
        let module_id = self.storage.fetch_module_id(module, kind).await.unwrap();
        let mut exports: Vec<(String, Version)> = self
            .storage
            .fetch_exported_types(module_id)
            .await
            .unwrap()
            .into_iter()
            .map(|record| (record.name, record.version))
            .collect();
        exports.sort();
        exports
    }

    async fn snapshot(&self) -> Snapshot {
        self.storage.snapshot().await.unwrap()
    }

    fn parses(&self) -> usize {
        self.documents.0.load(Ordering::SeqCst)
    }
}

fn module_files() -> Vec<(&'static str, &'static str)> {
    vec![("/qml/M/qmldir", QMLDIR), ("/qml/M/Foo.qml", FOO), ("/qml/M/Bar.qml", BAR)]
}

#[tokio::test]
async fn test_first_update_and_idempotence() {
    let fixture = Fixture::new(&[("/qml/M/qmldir", "module M\nFoo 1.0 Foo.qml\n"), ("/qml/M/Foo.qml", FOO)]).await;

    let report = fixture.update(&["/qml/M"], &[]).await;
    assert_eq!(report.documents_parsed, 1);
    assert!(report.diagnostics.is_empty());
    assert_eq!(fixture.exports("M", ModuleKind::QmlLibrary).await, vec![("Foo".to_string(), Version::new(1, 0))]);

    let foo = fixture.id("/qml/M/Foo.qml");
    let types = fixture.storage.fetch_types(foo).await.unwrap();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].name, "Foo");
    assert_eq!(types[0].prototype.as_deref(), Some("Item"));
    assert_eq!(types[0].properties[0].name, "size");

    assert_eq!(fixture.watcher.watched(PART, SourceType::Directory).len(), 1);
    assert_eq!(fixture.watcher.watched(PART, SourceType::QmlDir), vec![fixture.id("/qml/M/qmldir")]);
    assert_eq!(fixture.watcher.watched(PART, SourceType::Qml), vec![foo]);

    let before = fixture.snapshot().await;
    let report = fixture.update(&["/qml/M"], &[]).await;
    assert_eq!(report.documents_parsed, 0);
    assert_eq!(fixture.parses(), 1);
    assert_eq!(fixture.snapshot().await, before);
    fixture.db.close().await;
}

#[tokio::test]
async fn test_document_imports_are_stored() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update(&["/qml/M"], &[]).await;

    let imports = fixture.storage.fetch_imports(fixture.id("/qml/M/Foo.qml")).await.unwrap();
    let quick = fixture.storage.fetch_module_id("QtQuick", ModuleKind::QmlLibrary).await.unwrap();
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].module_id, quick);
    assert_eq!(imports[0].version, Version::new(2, 15));
    fixture.db.close().await;
}

#[tokio::test]
async fn test_changed_document_is_the_only_one_parsed() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update(&["/qml/M"], &[]).await;
    assert_eq!(fixture.parses(), 2);

    fixture.fs.write("/qml/M/Foo.qml", "import QtQuick\nItem {\n    property string label\n}\n").await;
    let foo = fixture.id("/qml/M/Foo.qml");
    let report = fixture.updater.paths_changed(&[foo]).await.unwrap();

    assert_eq!(report.documents_parsed, 1);
    assert_eq!(fixture.parses(), 3);
    let types = fixture.storage.fetch_types(foo).await.unwrap();
    assert_eq!(types[0].properties[0].name, "label");
    assert_eq!(
        fixture.exports("M", ModuleKind::QmlLibrary).await,
        vec![("Bar".to_string(), Version::new(1, 0)), ("Foo".to_string(), Version::new(1, 0))]
    );
    fixture.db.close().await;
}

#[tokio::test]
async fn test_qmldir_change_reparses_components() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update(&["/qml/M"], &[]).await;

    fixture.fs.write("/qml/M/qmldir", "module M\nFoo 2.0 Foo.qml\nBar 1.0 Bar.qml\n").await;
    let report = fixture.update(&["/qml/M"], &[]).await;

    assert_eq!(report.documents_parsed, 2);
    assert_eq!(
        fixture.exports("M", ModuleKind::QmlLibrary).await,
        vec![("Bar".to_string(), Version::new(1, 0)), ("Foo".to_string(), Version::new(2, 0))]
    );
    fixture.db.close().await;
}

#[tokio::test]
async fn test_deleted_component_is_removed() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update(&["/qml/M"], &[]).await;
    let foo = fixture.id("/qml/M/Foo.qml");
    assert!(fixture.watcher.watched(PART, SourceType::Qml).contains(&foo));

    assert!(fixture.fs.remove("/qml/M/Foo.qml").await);
    let report = fixture.updater.paths_changed(&[foo]).await.unwrap();

    assert!(report.removed_sources >= 1);
    assert_eq!(fixture.exports("M", ModuleKind::QmlLibrary).await, vec![("Bar".to_string(), Version::new(1, 0))]);
    assert!(fixture.storage.fetch_types(foo).await.unwrap().is_empty());
    assert!(fixture.storage.fetch_file_status(foo).await.unwrap().is_none());
    assert!(!fixture.watcher.watched(PART, SourceType::Qml).contains(&foo));
    assert!(fixture.watcher.watched(PART, SourceType::Qml).contains(&fixture.id("/qml/M/Bar.qml")));
    fixture.db.close().await;
}

#[tokio::test]
async fn test_new_component_is_picked_up() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update(&["/qml/M"], &[]).await;

    fixture.fs.write("/qml/M/Baz.qml", "import QtQuick\nItem {}\n").await;
    let directory = fixture.updater.paths().lookup_directory(Path::new("/qml/M")).unwrap();
    let report = fixture.updater.paths_changed(&[directory]).await.unwrap();

    assert_eq!(report.documents_parsed, 1);
    let baz = fixture.id("/qml/M/Baz.qml");
    assert!(fixture.watcher.watched(PART, SourceType::Qml).contains(&baz));
    assert_eq!(fixture.exports("/qml/M", ModuleKind::PathLibrary).await.len(), 3);
    fixture.db.close().await;
}

#[tokio::test]
async fn test_missing_qmltypes_path() {
    let fixture = Fixture::new(&module_files()).await;
    let report = fixture.update(&["/qml/M"], &["/qml/missing.qmltypes"]).await;

    assert_eq!(report.documents_parsed, 2);
    assert_eq!(fixture.types.0.load(Ordering::SeqCst), 0);
    assert!(fixture.watcher.watched(PART, SourceType::QmlTypes).is_empty());
    assert_eq!(fixture.exports("M", ModuleKind::QmlLibrary).await.len(), 2);
    fixture.db.close().await;
}

const BUILTINS: &str = r#"
Module {
    Component {
        name: "QObject"
        exports: ["QML/QtObject 1.0"]
    }
}
"#;

#[tokio::test]
async fn test_removed_qmltypes_path() {
    let fixture = Fixture::new(&[("/qml/builtins.qmltypes", BUILTINS)]).await;
    let report = fixture.update(&[], &["/qml/builtins.qmltypes"]).await;
    assert_eq!(report.type_infos_parsed, 1);
    let builtins = fixture.id("/qml/builtins.qmltypes");
    assert_eq!(fixture.storage.fetch_types(builtins).await.unwrap()[0].name, "QObject");
    assert_eq!(fixture.exports("QML", ModuleKind::CppLibrary).await, vec![("QtObject".to_string(), Version::new(1, 0))]);
    assert_eq!(fixture.watcher.watched(PART, SourceType::QmlTypes), vec![builtins]);

    fixture.fs.remove("/qml/builtins.qmltypes").await;
    let report = fixture.update(&[], &["/qml/builtins.qmltypes"]).await;

    assert!(report.removed_sources >= 1);
    assert!(fixture.storage.fetch_types(builtins).await.unwrap().is_empty());
    assert!(fixture.exports("QML", ModuleKind::CppLibrary).await.is_empty());
    assert!(fixture.watcher.watched(PART, SourceType::QmlTypes).is_empty());
    fixture.db.close().await;
}

#[tokio::test]
async fn test_qmldir_typeinfo() {
    let fixture = Fixture::new(&[
        ("/qml/M/qmldir", "module M\ntypeinfo plugins.qmltypes\nFoo 1.0 Foo.qml\n"),
        ("/qml/M/plugins.qmltypes", BUILTINS),
        ("/qml/M/Foo.qml", FOO),
    ])
    .await;
    let report = fixture.update(&["/qml/M"], &[]).await;

    assert_eq!(report.type_infos_parsed, 1);
    let plugins = fixture.id("/qml/M/plugins.qmltypes");
    assert_eq!(fixture.watcher.watched(PART, SourceType::QmlTypes), vec![plugins]);
    let directory = fixture.updater.paths().lookup_directory(Path::new("/qml/M")).unwrap();
    let datas = fixture.storage.fetch_project_datas(directory, PART).await.unwrap();
    assert_eq!(datas.len(), 2);
    assert!(datas.iter().any(|data| data.source_id == plugins));

    fixture.update(&["/qml/M"], &[]).await;
    assert_eq!(fixture.types.0.load(Ordering::SeqCst), 1);
    fixture.db.close().await;
}

#[tokio::test]
async fn test_stale_directories_are_removed() {
    let mut files = module_files();
    files.push(("/qml/N/Other.qml", "import QtQuick\nItem {}\n"));
    let fixture = Fixture::new(&files).await;
    fixture.update(&["/qml/M", "/qml/N"], &[]).await;
    let other = fixture.id("/qml/N/Other.qml");
    assert_eq!(fixture.storage.fetch_types(other).await.unwrap().len(), 1);

    let report = fixture.update(&["/qml/M"], &[]).await;
    assert!(report.removed_sources >= 2);
    assert!(fixture.storage.fetch_types(other).await.unwrap().is_empty());
    assert!(!fixture.watcher.watched(PART, SourceType::Qml).contains(&other));
    assert_eq!(fixture.exports("M", ModuleKind::QmlLibrary).await.len(), 2);
    fixture.db.close().await;
}

#[tokio::test]
async fn test_failed_commit_changes_nothing() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update(&["/qml/M"], &[]).await;
    let snapshot = fixture.snapshot().await;
    let watched = fixture.watcher.id_paths(PART);

    fixture.fs.write("/qml/M/Baz.qml", "import QtQuick\nItem {}\n").await;
    fixture.fs.write("/qml/M/Foo.qml", "import QtQuick\nItem {}\n").await;
    fixture.storage.fail.store(true, Ordering::SeqCst);
    let err = fixture
        .updater
        .update(&[PathBuf::from("/qml/M")], &[], PART)
        .await
        .unwrap_err();

    assert!(matches!(&*err, ErrorKind::Storage));
    assert!(err.is_retryable());
    assert_eq!(fixture.snapshot().await, snapshot);
    assert_eq!(fixture.watcher.id_paths(PART), watched);

    fixture.storage.fail.store(false, Ordering::SeqCst);
    fixture.update(&["/qml/M"], &[]).await;
    assert!(fixture.watcher.watched(PART, SourceType::Qml).contains(&fixture.id("/qml/M/Baz.qml")));
    fixture.db.close().await;
}

#[tokio::test]
async fn test_parse_failure_keeps_previous_records() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update(&["/qml/M"], &[]).await;
    let snapshot = fixture.snapshot().await;

    fixture.fs.write("/qml/M/Foo.qml", "").await;
    let report = fixture.update(&["/qml/M"], &[]).await;

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::Parse);
    assert_eq!(report.diagnostics[0].path, PathBuf::from("/qml/M/Foo.qml"));
    assert_eq!(fixture.snapshot().await, snapshot);

    fixture.fs.write("/qml/M/Foo.qml", FOO).await;
    let report = fixture.update(&["/qml/M"], &[]).await;
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.documents_parsed, 1);
    fixture.db.close().await;
}

#[tokio::test]
async fn test_unreadable_document_is_retried() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update(&["/qml/M"], &[]).await;
    let foo = fixture.id("/qml/M/Foo.qml");

    fixture.fs.write("/qml/M/Foo.qml", "import QtQuick\nItem {}\n").await;
    fixture.fs.set_unreadable("/qml/M/Foo.qml", true).await;
    let report = fixture.update(&["/qml/M"], &[]).await;

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::Io);
    assert!(fixture.storage.fetch_types(foo).await.unwrap().is_empty());
    assert!(fixture.watcher.watched(PART, SourceType::Qml).contains(&foo));

    fixture.fs.set_unreadable("/qml/M/Foo.qml", false).await;
    let report = fixture.update(&["/qml/M"], &[]).await;
    assert_eq!(report.documents_parsed, 1);
    assert_eq!(
        fixture.exports("M", ModuleKind::QmlLibrary).await,
        vec![("Bar".to_string(), Version::new(1, 0)), ("Foo".to_string(), Version::new(1, 0))]
    );
    fixture.db.close().await;
}

#[tokio::test]
async fn test_shadowed_export() {
    let fixture = Fixture::new(&[
        ("/qml/M/qmldir", "module M\nFoo 1.0 Foo.qml\nFoo 1.0 Bar.qml\n"),
        ("/qml/M/Foo.qml", FOO),
        ("/qml/M/Bar.qml", BAR),
    ])
    .await;
    let report = fixture.update(&["/qml/M"], &[]).await;

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::Shadowed);
    assert_eq!(report.diagnostics[0].path, PathBuf::from("/qml/M/Bar.qml"));

    let module = fixture.storage.fetch_module_id("M", ModuleKind::QmlLibrary).await.unwrap();
    let exports = fixture.storage.fetch_exported_types(module).await.unwrap();
    let foo_type = fixture.storage.fetch_types(fixture.id("/qml/M/Foo.qml")).await.unwrap();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].type_id, foo_type[0].type_id);
    fixture.db.close().await;
}

#[tokio::test]
async fn test_missing_directory() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update(&["/qml/M"], &[]).await;

    fixture.fs.remove("/qml/M").await;
    let report = fixture.update(&["/qml/M"], &[]).await;

    assert!(report.removed_sources >= 3);
    assert!(fixture.exports("M", ModuleKind::QmlLibrary).await.is_empty());
    assert!(fixture.watcher.id_paths(PART).is_empty());
    fixture.db.close().await;
}

#[tokio::test]
async fn test_invalid_scope() {
    let fixture = Fixture::new(&[]).await;
    let err = fixture.updater.update(&[], &[], ProjectPartId::new(-1)).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::InvalidScope(-1)));
    fixture.db.close().await;
}

fn both_exports() -> Vec<(String, Version)> {
    vec![("Bar".to_string(), Version::new(1, 0)), ("Foo".to_string(), Version::new(1, 0))]
}

#[tokio::test]
async fn test_parts_sharing_a_directory() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update_part(&["/qml/M"], &[], PART).await;
    let report = fixture.update_part(&["/qml/M"], &[], OTHER_PART).await;
    assert_eq!(report.documents_parsed, 0, "the second part reuses what the first parsed");
    assert_eq!(fixture.members("/qml/M", OTHER_PART).await, fixture.members("/qml/M", PART).await);
    assert_eq!(fixture.watcher.watched(OTHER_PART, SourceType::Qml).len(), 2);

    // The first part lets go of the directory while the other still names it.
    let report = fixture.update_part(&[], &[], PART).await;
    assert_eq!(report.removed_sources, 0);
    assert!(fixture.members("/qml/M", PART).await.is_empty());
    assert_eq!(fixture.members("/qml/M", OTHER_PART).await.len(), 2);
    assert_eq!(fixture.exports("M", ModuleKind::QmlLibrary).await, both_exports());
    let foo = fixture.id("/qml/M/Foo.qml");
    assert_eq!(fixture.storage.fetch_types(foo).await.unwrap().len(), 1);
    assert!(fixture.storage.fetch_file_status(foo).await.unwrap().is_some());

    let before = fixture.snapshot().await;
    let report = fixture.update_part(&["/qml/M"], &[], OTHER_PART).await;
    assert_eq!(report.documents_parsed, 0);
    assert_eq!(fixture.parses(), 2);
    assert_eq!(fixture.snapshot().await, before);

    // Dropped by the last part, the directory goes away entirely.
    let report = fixture.update_part(&[], &[], OTHER_PART).await;
    assert!(report.removed_sources >= 3);
    assert!(fixture.exports("M", ModuleKind::QmlLibrary).await.is_empty());
    assert!(fixture.storage.fetch_types(foo).await.unwrap().is_empty());
    fixture.db.close().await;
}

#[tokio::test]
async fn test_new_component_reaches_every_part() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update_part(&["/qml/M"], &[], PART).await;
    fixture.update_part(&["/qml/M"], &[], OTHER_PART).await;

    fixture.fs.write("/qml/M/Baz.qml", "import QtQuick\nItem {}\n").await;
    let report = fixture.updater.paths_changed(&[fixture.directory("/qml/M")]).await.unwrap();

    assert_eq!(report.documents_parsed, 1);
    let baz = fixture.id("/qml/M/Baz.qml");
    for part in [PART, OTHER_PART] {
        assert!(fixture.members("/qml/M", part).await.contains(&baz));
        assert!(fixture.watcher.watched(part, SourceType::Qml).contains(&baz));
    }
    fixture.db.close().await;
}

#[tokio::test]
async fn test_shared_qmltypes_file() {
    let fixture = Fixture::new(&[("/qml/builtins.qmltypes", BUILTINS)]).await;
    fixture.update_part(&[], &["/qml/builtins.qmltypes"], PART).await;
    let report = fixture.update_part(&[], &["/qml/builtins.qmltypes"], OTHER_PART).await;
    assert_eq!(report.type_infos_parsed, 0);
    let builtins = fixture.id("/qml/builtins.qmltypes");
    assert_eq!(fixture.storage.fetch_project_source_ids(OTHER_PART).await.unwrap(), vec![builtins]);

    fixture.update_part(&[], &[], PART).await;
    assert_eq!(fixture.exports("QML", ModuleKind::CppLibrary).await, vec![("QtObject".to_string(), Version::new(1, 0))]);
    assert_eq!(fixture.types.0.load(Ordering::SeqCst), 1);
    fixture.db.close().await;
}

#[tokio::test]
async fn test_watched_ids_limit_the_pass() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update(&["/qml/M"], &[]).await;
    let foo = fixture.id("/qml/M/Foo.qml");
    let bar = fixture.id("/qml/M/Bar.qml");

    fixture.fs.write("/qml/M/Foo.qml", "import QtQuick\nItem {\n    property string label\n}\n").await;
    fixture.fs.write("/qml/M/Bar.qml", "import QtQuick\nRectangle {\n    property real radius\n}\n").await;
    let id_paths = vec![
        IdPaths { id: ProjectChunkId { project_part_id: PART, source_type: SourceType::Qml }, source_ids: vec![foo] },
        IdPaths {
            id: ProjectChunkId { project_part_id: OTHER_PART, source_type: SourceType::Qml },
            source_ids: vec![bar],
        },
    ];
    let report = fixture.updater.paths_with_ids_changed(&id_paths).await.unwrap();

    assert_eq!(report.documents_parsed, 1);
    assert_eq!(fixture.storage.fetch_types(foo).await.unwrap()[0].properties[0].name, "label");
    assert!(fixture.storage.fetch_types(bar).await.unwrap()[0].properties.is_empty(), "OTHER_PART watches nothing");
    assert_eq!(fixture.exports("M", ModuleKind::QmlLibrary).await, both_exports());
    fixture.db.close().await;
}

#[tokio::test]
async fn test_notification_loop_applies_changes() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update(&["/qml/M"], &[]).await;
    let foo = fixture.id("/qml/M/Foo.qml");

    let (notifier, queue) = QueueNotifier::new();
    let worker = tokio::spawn(run_notification_loop(fixture.updater.clone(), queue, Duration::ZERO));
    fixture.fs.write("/qml/M/Foo.qml", "import QtQuick\nItem {\n    property string label\n}\n").await;
    fixture.fs.write("/qml/M/Baz.qml", "import QtQuick\nItem {}\n").await;
    notifier.paths_changed(vec![foo]).await;
    notifier
        .paths_with_ids_changed(vec![IdPaths {
            id: ProjectChunkId { project_part_id: PART, source_type: SourceType::Directory },
            source_ids: vec![fixture.directory("/qml/M")],
        }])
        .await;
    drop(notifier);
    worker.await.unwrap();

    assert_eq!(fixture.storage.fetch_types(foo).await.unwrap()[0].properties[0].name, "label");
    let baz = fixture.id("/qml/M/Baz.qml");
    assert!(fixture.watcher.watched(PART, SourceType::Qml).contains(&baz));
    assert_eq!(fixture.exports("/qml/M", ModuleKind::PathLibrary).await.len(), 3);
    assert_eq!(fixture.parses(), 4);
    fixture.db.close().await;
}

#[tokio::test]
async fn test_concurrent_passes_on_one_scope() {
    let fixture = Fixture::new(&module_files()).await;
    fixture.update(&["/qml/M"], &[]).await;
    let foo = fixture.id("/qml/M/Foo.qml");

    fixture.fs.write("/qml/M/Foo.qml", "import QtQuick\nItem {\n    property string label\n}\n").await;
    let directories = [PathBuf::from("/qml/M")];
    let changed = [foo];
    let (full, scoped, again) = tokio::join!(
        fixture.updater.update(&directories, &[], PART),
        fixture.updater.paths_changed(&changed),
        fixture.updater.paths_changed(&changed),
    );
    let parsed = full.unwrap().documents_parsed + scoped.unwrap().documents_parsed + again.unwrap().documents_parsed;
    assert_eq!(parsed, 1);
    assert_eq!(fixture.parses(), 3);

    let snapshot = fixture.snapshot().await;
    assert_eq!(fixture.storage.fetch_types(foo).await.unwrap()[0].properties[0].name, "label");
    assert_eq!(fixture.exports("M", ModuleKind::QmlLibrary).await, both_exports());
    fixture.update(&["/qml/M"], &[]).await;
    assert_eq!(fixture.snapshot().await, snapshot);
    fixture.db.close().await;
}

#[tokio::test]
async fn test_unparsable_qmldir_on_first_pass() {
    let fixture = Fixture::new(&[
        ("/qml/M/qmldir", "module M\nmodule N\n"),
        ("/qml/M/Foo.qml", FOO),
        ("/qml/M/Bar.qml", BAR),
    ])
    .await;
    let report = fixture.update(&["/qml/M"], &[]).await;

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::Parse);
    assert_eq!(report.documents_parsed, 2);
    assert_eq!(fixture.exports("/qml/M", ModuleKind::PathLibrary).await, both_exports_unversioned());
    assert_eq!(fixture.watcher.watched(PART, SourceType::Qml).len(), 2);
    assert!(fixture.exports("M", ModuleKind::QmlLibrary).await.is_empty());

    fixture.fs.write("/qml/M/qmldir", QMLDIR).await;
    let report = fixture.update(&["/qml/M"], &[]).await;
    assert!(report.diagnostics.is_empty());
    assert_eq!(fixture.exports("M", ModuleKind::QmlLibrary).await, both_exports());
    fixture.db.close().await;
}

fn both_exports_unversioned() -> Vec<(String, Version)> {
    vec![("Bar".to_string(), Version::NONE), ("Foo".to_string(), Version::NONE)]
}
