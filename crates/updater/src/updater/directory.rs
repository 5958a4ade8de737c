use super::pass::Pass;
use super::report::DiagnosticKind;
use crate::convert;
use crate::error::{ErrorKind, Result};
use crate::state::FileState;
use crate::watcher::SourceType;
use exn::ResultExt;
use qmlsync_parse::models::{ImportKind, QmlDir, QmlDocument};
use qmlsync_store::ids::{ModuleId, ProjectPartId, SourceContextId, SourceId};
use qmlsync_store::types::{
    ChangeLevel, DependencyKind, ExportedType, FileType, Import, ModuleDependency, ModuleKind, ProjectData, Version,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::instrument;

const QMLDIR: &str = "qmldir";

/// A component file of a directory with the exports it gets.
#[derive(Debug)]
struct ComponentFile {
    file_name: String,
    type_name: String,
    singleton: bool,
    exports: Vec<ExportedType>,
}

/// Name of the module a directory forms for path imports.
pub(super) fn path_module_name(directory: &Path) -> String {
    directory.display().to_string()
}

fn type_name(file_name: &str) -> &str {
    let name = file_name.rsplit('/').next().unwrap_or(file_name);
    name.strip_suffix(".qml").unwrap_or(name)
}

impl Pass<'_> {
    pub(super) async fn update_directories(&mut self, directories: &[PathBuf]) -> Result<()> {
        for directory in directories {
            self.update_directory(directory).await?;
        }
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(path = %directory.display()))]
    async fn update_directory(&mut self, directory: &Path) -> Result<()> {
        let updater = self.updater;
        let (context, directory_id) = updater.paths.directory_source_id(directory).await?;
        if !self.projects.insert(directory_id) {
            return Ok(());
        }
        self.ids.recompute(directory_id);
        let qmldir_path = directory.join(QMLDIR);
        let qmldir_id = updater.paths.source_id_in(context, QMLDIR).await?;

        let directory_state = self.file_state(directory_id, directory).await?;
        if directory_state == FileState::NotExists {
            self.file_state(qmldir_id, &qmldir_path).await?;
            tracing::debug!("Directory is gone; forgetting its project");
            return self.forget_project(directory_id, true).await;
        }
        self.ids.watch(SourceType::Directory, directory_id, directory_id);

        let (qmldir_state, qmldir_known) = self.observe(qmldir_id, &qmldir_path).await?;
        if qmldir_state != FileState::NotExists {
            self.ids.watch(SourceType::QmlDir, qmldir_id, directory_id);
        }

        if directory_state == FileState::NotChanged && qmldir_state == FileState::NotChanged {
            self.ids.not_updated.insert(qmldir_id);
            return self.revalidate_project_datas(directory_id).await;
        }

        let qmldir = match qmldir_state {
            FileState::NotExists => QmlDir::default(),
            _ => match self.read(&qmldir_path).await {
                Some(text) => match qmlsync_parse::parse_qmldir(&text) {
                    Ok(qmldir) => qmldir,
                    Err(err) => {
                        self.diagnose(&qmldir_path, DiagnosticKind::Parse, &*err);
                        self.retain_previous(qmldir_id);
                        self.retain_previous(directory_id);
                        if self.is_recorded(directory_id).await? {
                            return self.revalidate_project_datas(directory_id).await;
                        }
                        // Nothing stored yet: the documents still form the path module.
                        return self
                            .rebuild_directory(directory, context, directory_id, &QmlDir::default(), false)
                            .await;
                    },
                },
                None => {
                    self.forget_content(qmldir_id);
                    QmlDir::default()
                },
            },
        };

        let force = qmldir_state == FileState::Changed || (qmldir_state == FileState::NotExists && qmldir_known);
        self.push_qmldir_dependencies(qmldir_id, &qmldir).await?;
        self.rebuild_directory(directory, context, directory_id, &qmldir, force)
            .await
    }

    /// `true` when some part holds membership records for the directory.
    async fn is_recorded(&self, directory_id: SourceId) -> Result<bool> {
        Ok(self.claimed.contains(&directory_id) || !self.other_holders(directory_id).await?.is_empty())
    }

    async fn push_qmldir_dependencies(&mut self, qmldir_id: SourceId, qmldir: &QmlDir) -> Result<()> {
        self.package.updated_module_dependency_source_ids.push(qmldir_id);
        let dependencies = [(&qmldir.imports, DependencyKind::Import), (&qmldir.dependencies, DependencyKind::Depends)];
        for (imports, kind) in dependencies {
            for import in imports {
                let module_id = self.module_id(&import.module, ModuleKind::QmlLibrary).await?;
                self.package.module_dependencies.push(ModuleDependency {
                    source_id: qmldir_id,
                    module_id,
                    version: convert::version(import.version),
                    kind,
                });
            }
        }
        Ok(())
    }

    /// Re-derive a directory's project data, qmldir records and component
    /// exports. Component documents are only parsed if they changed, or if
    /// `force` says the qmldir changed under them.
    async fn rebuild_directory(
        &mut self,
        directory: &Path,
        context: SourceContextId,
        directory_id: SourceId,
        qmldir: &QmlDir,
        force: bool,
    ) -> Result<()> {
        self.package.updated_project_source_ids.push(directory_id);
        let path_module = self.module_id(&path_module_name(directory), ModuleKind::PathLibrary).await?;
        let module = match &qmldir.module {
            Some(name) => Some(self.module_id(name, ModuleKind::QmlLibrary).await?),
            None => None,
        };

        if !qmldir.type_infos.is_empty() {
            let name = qmldir.module.clone().unwrap_or_else(|| path_module_name(directory));
            let cpp_module = self.module_id(&name, ModuleKind::CppLibrary).await?;
            self.parse_type_infos(directory, directory_id, &qmldir.type_infos, cpp_module)
                .await?;
        }

        let components = self.component_files(directory, qmldir, module, path_module).await;
        let project_module = module.unwrap_or(path_module);
        for component in components {
            self.parse_qml_component(directory, context, directory_id, component, project_module, force)
                .await?;
        }
        Ok(())
    }

    /// Declared components in qmldir order, followed by any other `.qml`
    /// file of the directory. Every file gets an unversioned export into the
    /// directory's path module. Declared exports go to the qmldir's module;
    /// the first declaration of a name and version wins.
    async fn component_files(
        &mut self,
        directory: &Path,
        qmldir: &QmlDir,
        module: Option<ModuleId>,
        path_module: ModuleId,
    ) -> Vec<ComponentFile> {
        let mut files: Vec<ComponentFile> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut claimed: HashSet<(String, Version)> = HashSet::new();

        let listed = match self.updater.fs.file_names_with_extension(directory, "qml").await {
            Ok(names) => names,
            Err(err) => {
                self.diagnose(directory, DiagnosticKind::Io, &*err);
                Vec::new()
            },
        };
        let declared = qmldir.components.iter().map(|component| component.file_name.as_str());
        for file_name in declared.chain(listed.iter().map(String::as_str)) {
            positions.entry(file_name.to_string()).or_insert_with(|| {
                files.push(ComponentFile {
                    file_name: file_name.to_string(),
                    type_name: type_name(file_name).to_string(),
                    singleton: false,
                    exports: vec![ExportedType {
                        module_id: path_module,
                        name: type_name(file_name).to_string(),
                        version: Version::NONE,
                    }],
                });
                files.len() - 1
            });
        }

        for component in &qmldir.components {
            let file = &mut files[positions[&component.file_name]];
            file.singleton |= component.singleton;
            let Some(module_id) = module else { continue };
            if component.internal {
                continue;
            }
            let version = convert::version(component.version);
            if !claimed.insert((component.type_name.clone(), version)) {
                let path = directory.join(&component.file_name);
                self.diagnose(
                    &path,
                    DiagnosticKind::Shadowed,
                    format!("{} {} is already declared by an earlier entry", component.type_name, component.version),
                );
                continue;
            }
            files[positions[&component.file_name]].exports.push(ExportedType {
                module_id,
                name: component.type_name.clone(),
                version,
            });
        }
        files
    }

    async fn parse_qml_component(
        &mut self,
        directory: &Path,
        context: SourceContextId,
        directory_id: SourceId,
        component: ComponentFile,
        module_id: ModuleId,
        force: bool,
    ) -> Result<()> {
        let path = match qmlsync_fs::normalize_path(directory.join(&component.file_name)) {
            Ok(path) => path,
            Err(err) => {
                self.diagnose(&directory.join(&component.file_name), DiagnosticKind::InvalidPath, &*err);
                return Ok(());
            },
        };
        let source_id = match path.parent() {
            Some(parent) if parent == directory => {
                self.updater.paths.source_id_in(context, &component.file_name).await?
            },
            _ => self.updater.paths.source_id(&path).await?,
        };

        let state = self.file_state(source_id, &path).await?;
        if state == FileState::NotExists {
            return Ok(());
        }
        self.ids.watch(SourceType::Qml, source_id, directory_id);
        self.package.project_datas.push(ProjectData {
            project_source_id: directory_id,
            source_id,
            module_id: Some(module_id),
            file_type: FileType::QmlDocument,
            project_part_id: self.project_part_id,
        });
        if state == FileState::NotChanged && !force {
            self.ids.not_updated.insert(source_id);
            return Ok(());
        }

        let Some(document) = self.parse_document(source_id, &path).await else {
            return Ok(());
        };
        let ty = convert::document_type(
            source_id,
            &component.type_name,
            &document,
            component.singleton,
            component.exports,
        );
        self.push_document(source_id, directory, ty, &document).await
    }

    // ===== Unchanged directories

    /// The directory listing and qmldir are as stored, so the stored project
    /// data is the list of members. Each member is still checked; changed
    /// documents are re-parsed without touching their exports.
    ///
    /// A part naming a directory another part already synchronized takes
    /// over that part's members.
    async fn revalidate_project_datas(&mut self, directory_id: SourceId) -> Result<()> {
        let own = self.claimed.contains(&directory_id);
        let datas = if own {
            self.stored_project_datas(directory_id, self.project_part_id).await?
        } else {
            match self.other_holders(directory_id).await?.first() {
                Some(holder) => {
                    let mut datas = self.stored_project_datas(directory_id, *holder).await?;
                    for data in &mut datas {
                        data.project_part_id = self.project_part_id;
                    }
                    tracing::debug!(holder = %holder, members = datas.len(), "Joining project of another project part");
                    datas
                },
                None => Vec::new(),
            }
        };
        let total = datas.len();
        let mut kept = Vec::with_capacity(total);
        for data in datas {
            let Some(path) = self.source_path(data.source_id).await? else {
                self.package.removed_source_ids.push(data.source_id);
                continue;
            };
            let state = match data.file_type {
                FileType::QmlTypes => {
                    let state = self.parse_type_info(&data, &path).await?;
                    if state != FileState::NotExists {
                        self.ids.watch(SourceType::QmlTypes, data.source_id, directory_id);
                    }
                    state
                },
                FileType::QmlDocument => {
                    let state = self.file_state(data.source_id, &path).await?;
                    match state {
                        FileState::NotChanged => {
                            self.ids.not_updated.insert(data.source_id);
                        },
                        FileState::Changed => self.reparse_document(data.source_id, &path).await?,
                        FileState::NotExists => {},
                    }
                    if state != FileState::NotExists {
                        self.ids.watch(SourceType::Qml, data.source_id, directory_id);
                    }
                    state
                },
            };
            if state != FileState::NotExists {
                kept.push(data);
            }
        }
        if kept.len() != total || (!own && total > 0) {
            self.package.updated_project_source_ids.push(directory_id);
            self.package.project_datas.extend(kept);
        }
        Ok(())
    }

    async fn stored_project_datas(&self, directory_id: SourceId, part: ProjectPartId) -> Result<Vec<ProjectData>> {
        self.updater
            .storage
            .fetch_project_datas(directory_id, part)
            .await
            .or_raise(|| ErrorKind::Storage)
    }

    /// Re-parse a document whose exports are still valid. The qmldir's
    /// singleton flag is taken from what the storage has.
    async fn reparse_document(&mut self, source_id: SourceId, path: &Path) -> Result<()> {
        let Some(document) = self.parse_document(source_id, path).await else {
            return Ok(());
        };
        let stored = self
            .updater
            .storage
            .fetch_types(source_id)
            .await
            .or_raise(|| ErrorKind::Storage)?;
        let singleton = stored.iter().any(|record| record.traits.is_singleton);
        let file_name = qmlsync_fs::file_name(path).unwrap_or_default();
        let mut ty = convert::document_type(source_id, type_name(file_name), &document, singleton, Vec::new());
        ty.change_level = ChangeLevel::ExcludeExportedTypes;
        let directory = path.parent().unwrap_or(path);
        self.push_document(source_id, directory, ty, &document).await
    }

    async fn source_path(&self, source_id: SourceId) -> Result<Option<PathBuf>> {
        let paths = &self.updater.paths;
        if let Some(path) = paths.source_path(source_id) {
            return Ok(Some(path));
        }
        // Stored by an earlier run of the process.
        paths.populate().await?;
        Ok(paths.source_path(source_id))
    }

    // ===== Documents

    async fn parse_document(&mut self, source_id: SourceId, path: &Path) -> Option<QmlDocument> {
        let Some(text) = self.read(path).await else {
            self.forget_content(source_id);
            return None;
        };
        match self.updater.document_parser.parse(&text) {
            Ok(document) => {
                self.report.documents_parsed += 1;
                Some(document)
            },
            Err(err) => {
                self.diagnose(path, DiagnosticKind::Parse, &*err);
                self.retain_previous(source_id);
                None
            },
        }
    }

    async fn push_document(
        &mut self,
        source_id: SourceId,
        directory: &Path,
        ty: qmlsync_store::types::Type,
        document: &QmlDocument,
    ) -> Result<()> {
        self.package.updated_source_ids.push(source_id);
        for import in &document.imports {
            let module_id = match &import.kind {
                ImportKind::Module(name) => self.module_id(name, ModuleKind::QmlLibrary).await?,
                ImportKind::Directory(relative) => match qmlsync_fs::normalize_path(directory.join(relative)) {
                    Ok(target) => self.module_id(&path_module_name(&target), ModuleKind::PathLibrary).await?,
                    Err(err) => {
                        self.diagnose(&directory.join(relative), DiagnosticKind::InvalidPath, &*err);
                        continue;
                    },
                },
                ImportKind::Script(_) => continue,
            };
            self.package.imports.push(Import {
                source_id,
                module_id,
                version: convert::version(import.version),
                alias: import.alias.clone(),
            });
        }
        self.package.types.push(ty);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name() {
        assert_eq!(type_name("Button.qml"), "Button");
        assert_eq!(type_name("controls/Slider.qml"), "Slider");
        assert_eq!(type_name("qmldir"), "qmldir");
    }

    #[test]
    fn test_path_module_name() {
        assert_eq!(path_module_name(Path::new("/qml/M")), "/qml/M");
    }
}
