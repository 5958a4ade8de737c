//! The project storage updater.
//!
//! An update pass walks the given directories and qmltypes files, compares
//! every file's fingerprint with what the storage recorded, parses only what
//! changed and commits the differences as one [`SynchronizationPackage`].
//! Afterwards the watcher is told what to watch for the pass's project part.

mod directory;
mod pass;
mod report;
mod scope;
mod types;

pub use self::report::{Diagnostic, DiagnosticKind, UpdateReport};

use self::pass::Pass;
use self::scope::Scope;
use crate::error::{ErrorKind, Result};
use crate::file_status::FileStatusCache;
use crate::parser::{DocumentParser, QmlDocumentParser, QmlTypesParser, TypesParser};
use crate::path_cache::PathCache;
use crate::watcher::{IdPaths, SourceType, WatcherHandle};
use exn::ResultExt;
use qmlsync_fs::FsHandle;
use qmlsync_store::StorageHandle;
use qmlsync_store::ids::{ProjectPartId, SourceId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

type Owned = HashMap<SourceId, Vec<(SourceType, SourceId)>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassKind {
    /// Everything the scope consists of; projects the scope no longer
    /// names are removed afterwards.
    Full,
    /// Only the directories and qmltypes files touched by a change
    /// notification.
    Scoped,
}

pub struct ProjectStorageUpdater {
    fs: FsHandle,
    storage: StorageHandle,
    paths: Arc<PathCache>,
    file_statuses: FileStatusCache,
    document_parser: Arc<dyn DocumentParser>,
    types_parser: Arc<dyn TypesParser>,
    watcher: WatcherHandle,
    scopes: std::sync::Mutex<HashMap<ProjectPartId, Arc<Mutex<Scope>>>>,
}

impl ProjectStorageUpdater {
    pub fn new(fs: FsHandle, storage: StorageHandle, paths: Arc<PathCache>, watcher: WatcherHandle) -> Self {
        Self {
            file_statuses: FileStatusCache::new(fs.clone()),
            fs,
            storage,
            paths,
            document_parser: Arc::new(QmlDocumentParser),
            types_parser: Arc::new(QmlTypesParser),
            watcher,
            scopes: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn with_parsers(mut self, documents: Arc<dyn DocumentParser>, types: Arc<dyn TypesParser>) -> Self {
        self.document_parser = documents;
        self.types_parser = types;
        self
    }

    pub fn paths(&self) -> &PathCache {
        &self.paths
    }

    /// Bring the storage in line with `directories` and `qmltypes_paths`
    /// for one project part, and replace that part's watch set.
    ///
    /// Paths that cannot be normalised are reported and skipped. Anything
    /// the part contained before but no longer names is removed. If the
    /// commit fails, neither the storage nor the watch set changes.
    #[instrument(skip_all, fields(project_part = %project_part_id, directories = directories.len(), qmltypes = qmltypes_paths.len()))]
    pub async fn update(
        &self,
        directories: &[PathBuf],
        qmltypes_paths: &[PathBuf],
        project_part_id: ProjectPartId,
    ) -> Result<UpdateReport> {
        if !project_part_id.is_valid_scope() {
            exn::bail!(ErrorKind::InvalidScope(project_part_id.raw()));
        }
        let mut report = UpdateReport::default();
        let directories = normalize_all(directories, &mut report);
        let qmltypes_paths = normalize_all(qmltypes_paths, &mut report);

        let scope = self.scope(project_part_id);
        let mut scope = scope.lock().await;
        self.file_statuses.clear();

        let owned = self
            .run_pass(project_part_id, &directories, &qmltypes_paths, PassKind::Full, &mut report)
            .await?;
        scope.directories = directories;
        scope.qmltypes_paths = qmltypes_paths;
        scope.watch_set.replace_all(owned);
        self.install_watch_set(project_part_id, &scope).await?;

        tracing::info!(
            documents = report.documents_parsed,
            type_infos = report.type_infos_parsed,
            removed = report.removed_sources,
            diagnostics = report.diagnostics.len(),
            "Update finished"
        );
        Ok(report)
    }

    /// Re-examine the directories and qmltypes files the given ids belong
    /// to, in every project part that watches them.
    #[instrument(skip_all, fields(changed = source_ids.len()))]
    pub async fn paths_changed(&self, source_ids: &[SourceId]) -> Result<UpdateReport> {
        self.invalidate(source_ids);
        let parts: Vec<ProjectPartId> = self.lock_scopes().keys().copied().collect();
        let mut report = UpdateReport::default();
        for project_part_id in parts {
            report.merge(self.update_scope(project_part_id, source_ids).await?);
        }
        Ok(report)
    }

    /// Like [`paths_changed`](Self::paths_changed), but the watcher already
    /// knows which project part each id was watched for.
    #[instrument(skip_all, fields(chunks = id_paths.len()))]
    pub async fn paths_with_ids_changed(&self, id_paths: &[IdPaths]) -> Result<UpdateReport> {
        let mut by_part: BTreeMap<ProjectPartId, Vec<SourceId>> = BTreeMap::new();
        for chunk in id_paths {
            by_part.entry(chunk.id.project_part_id).or_default().extend(&chunk.source_ids);
        }
        let mut report = UpdateReport::default();
        for (project_part_id, source_ids) in by_part {
            self.invalidate(&source_ids);
            report.merge(self.update_scope(project_part_id, &source_ids).await?);
        }
        Ok(report)
    }

    // ===== Passes

    async fn update_scope(&self, project_part_id: ProjectPartId, changed: &[SourceId]) -> Result<UpdateReport> {
        let Some(scope) = self.lock_scopes().get(&project_part_id).cloned() else {
            return Ok(UpdateReport::default());
        };
        let mut scope = scope.lock().await;
        let (directories, qmltypes_paths) = self.affected(&scope, changed);
        if directories.is_empty() && qmltypes_paths.is_empty() {
            tracing::trace!(project_part = %project_part_id, "Change is outside of the scope");
            return Ok(UpdateReport::default());
        }

        let mut report = UpdateReport::default();
        let owned = self
            .run_pass(project_part_id, &directories, &qmltypes_paths, PassKind::Scoped, &mut report)
            .await?;
        scope.watch_set.replace_owners(owned);
        self.install_watch_set(project_part_id, &scope).await?;
        tracing::debug!(
            project_part = %project_part_id,
            directories = directories.len(),
            qmltypes = qmltypes_paths.len(),
            documents = report.documents_parsed,
            "Scoped update finished"
        );
        Ok(report)
    }

    async fn run_pass(
        &self,
        project_part_id: ProjectPartId,
        directories: &[PathBuf],
        qmltypes_paths: &[PathBuf],
        kind: PassKind,
        report: &mut UpdateReport,
    ) -> Result<Owned> {
        let mut pass = Pass::new(self, project_part_id, directories.len() + qmltypes_paths.len()).await?;
        pass.update_qml_types(qmltypes_paths).await?;
        pass.update_directories(directories).await?;
        if kind == PassKind::Full {
            pass.sweep_stale_projects().await?;
        }

        let (package, ids, pass_report) = pass.finish();
        if package.is_empty() {
            tracing::debug!("Nothing to synchronize");
        } else {
            self.storage.synchronize(package).await.or_raise(|| ErrorKind::Storage)?;
        }
        report.merge(pass_report);
        Ok(ids.into_owned())
    }

    /// Directories and qmltypes files of `scope` that own, or are, one of
    /// the changed ids.
    fn affected(&self, scope: &Scope, changed: &[SourceId]) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let mut owners = HashSet::with_capacity(changed.len() * 2);
        for source_id in changed {
            owners.insert(*source_id);
            owners.extend(scope.watch_set.owner_of(*source_id));
            owners.extend(self.paths.directory_of(*source_id));
        }
        let directories = scope
            .directories
            .iter()
            .filter(|directory| self.paths.lookup_directory(directory).is_some_and(|id| owners.contains(&id)))
            .cloned()
            .collect();
        let qmltypes_paths = scope
            .qmltypes_paths
            .iter()
            .filter(|path| self.paths.lookup(path).is_some_and(|id| owners.contains(&id)))
            .cloned()
            .collect();
        (directories, qmltypes_paths)
    }

    async fn install_watch_set(&self, project_part_id: ProjectPartId, scope: &Scope) -> Result<()> {
        self.watcher
            .update_id_paths(project_part_id, scope.watch_set.id_paths(project_part_id))
            .await
            .or_raise(|| ErrorKind::Watcher)
    }

    /// Drop cached fingerprints of the changed ids and of the directories
    /// containing them.
    fn invalidate(&self, source_ids: &[SourceId]) {
        let directories: Vec<SourceId> = source_ids.iter().filter_map(|id| self.paths.directory_of(*id)).collect();
        self.file_statuses.invalidate(source_ids.iter().copied().chain(directories));
    }

    fn scope(&self, project_part_id: ProjectPartId) -> Arc<Mutex<Scope>> {
        self.lock_scopes().entry(project_part_id).or_default().clone()
    }

    fn lock_scopes(&self) -> std::sync::MutexGuard<'_, HashMap<ProjectPartId, Arc<Mutex<Scope>>>> {
        self.scopes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Normalise and deduplicate input paths, keeping their order.
fn normalize_all(paths: &[PathBuf], report: &mut UpdateReport) -> Vec<PathBuf> {
    let mut seen = HashSet::with_capacity(paths.len());
    let mut normalized = Vec::with_capacity(paths.len());
    for path in paths {
        match qmlsync_fs::normalize_path(path) {
            Ok(path) => {
                if seen.insert(path.clone()) {
                    normalized.push(path);
                }
            },
            Err(err) => report.diagnostics.push(Diagnostic {
                path: path.clone(),
                kind: DiagnosticKind::InvalidPath,
                message: (*err).to_string(),
            }),
        }
    }
    normalized
}
