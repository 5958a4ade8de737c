use super::pass::Pass;
use super::report::DiagnosticKind;
use crate::convert;
use crate::error::Result;
use crate::state::FileState;
use crate::watcher::SourceType;
use qmlsync_parse::models::QmlTypes;
use qmlsync_store::ids::{ModuleId, SourceId};
use qmlsync_store::types::{DependencyKind, ExportedType, FileType, ModuleDependency, ModuleKind, ProjectData, Version};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Module that explicitly listed qmltypes files belong to.
pub(super) const BUILTINS_MODULE: &str = "QML";

impl Pass<'_> {
    /// qmltypes files named directly by the caller. Each one is its own
    /// project with itself as the only member.
    pub(super) async fn update_qml_types(&mut self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let module_id = self.module_id(BUILTINS_MODULE, ModuleKind::CppLibrary).await?;
        for path in paths {
            let source_id = self.updater.paths.source_id(path).await?;
            if !self.projects.insert(source_id) {
                continue;
            }
            self.ids.recompute(source_id);
            let data = ProjectData {
                project_source_id: source_id,
                source_id,
                module_id: Some(module_id),
                file_type: FileType::QmlTypes,
                project_part_id: self.project_part_id,
            };
            let state = self.parse_type_info(&data, path).await?;
            match state {
                FileState::Changed => {
                    self.package.project_datas.push(data);
                    self.package.updated_project_source_ids.push(source_id);
                },
                FileState::NotExists => self.package.updated_project_source_ids.push(source_id),
                // Parsed for another part already; this part only joins.
                FileState::NotChanged if !self.claimed.contains(&source_id) => {
                    self.package.project_datas.push(data);
                    self.package.updated_project_source_ids.push(source_id);
                },
                FileState::NotChanged => {},
            }
            if state != FileState::NotExists {
                self.ids.watch(SourceType::QmlTypes, source_id, source_id);
            }
        }
        Ok(())
    }

    /// `typeinfo` entries of a qmldir. Existing ones become members of the
    /// directory project.
    pub(super) async fn parse_type_infos(
        &mut self,
        directory: &Path,
        directory_id: SourceId,
        type_infos: &[String],
        module_id: ModuleId,
    ) -> Result<()> {
        for type_info in type_infos {
            let path = match qmlsync_fs::normalize_path(directory.join(type_info)) {
                Ok(path) => path,
                Err(err) => {
                    self.diagnose(&directory.join(type_info), DiagnosticKind::InvalidPath, &*err);
                    continue;
                },
            };
            let source_id = self.updater.paths.source_id(&path).await?;
            let data = ProjectData {
                project_source_id: directory_id,
                source_id,
                module_id: Some(module_id),
                file_type: FileType::QmlTypes,
                project_part_id: self.project_part_id,
            };
            if self.parse_type_info(&data, &path).await? != FileState::NotExists {
                self.package.project_datas.push(data);
                self.ids.watch(SourceType::QmlTypes, source_id, directory_id);
            }
        }
        Ok(())
    }

    /// Parse one qmltypes file if it changed.
    ///
    /// A file that cannot be read is reported as changed with its content
    /// dropped; one that does not parse is reported as unchanged and keeps
    /// what the storage has.
    pub(super) async fn parse_type_info(&mut self, data: &ProjectData, path: &Path) -> Result<FileState> {
        let source_id = data.source_id;
        let state = self.file_state(source_id, path).await?;
        match state {
            FileState::NotChanged => {
                self.ids.not_updated.insert(source_id);
            },
            FileState::NotExists => {
                self.package.updated_source_ids.push(source_id);
                self.package.updated_module_dependency_source_ids.push(source_id);
            },
            FileState::Changed => {
                let Some(text) = self.read(path).await else {
                    self.forget_content(source_id);
                    return Ok(FileState::Changed);
                };
                match self.updater.types_parser.parse(&text) {
                    Ok(types) => {
                        self.report.type_infos_parsed += 1;
                        self.push_type_info(source_id, path, &types).await?;
                    },
                    Err(err) => {
                        self.diagnose(path, DiagnosticKind::Parse, &*err);
                        self.retain_previous(source_id);
                        return Ok(FileState::NotChanged);
                    },
                }
            },
        }
        Ok(state)
    }

    async fn push_type_info(&mut self, source_id: SourceId, path: &Path, types: &QmlTypes) -> Result<()> {
        self.package.updated_source_ids.push(source_id);
        self.package.updated_module_dependency_source_ids.push(source_id);
        for dependency in &types.dependencies {
            let module_id = self.module_id(&dependency.module, ModuleKind::CppLibrary).await?;
            self.package.module_dependencies.push(ModuleDependency {
                source_id,
                module_id,
                version: convert::version(dependency.version),
                kind: DependencyKind::Depends,
            });
        }

        let mut claimed: HashSet<(ModuleId, String, Version)> = HashSet::new();
        for info in &types.components {
            let mut exports = Vec::with_capacity(info.exports.len());
            for export in &info.exports {
                let module_id = self.module_id(&export.module, ModuleKind::CppLibrary).await?;
                let version = convert::version(export.version);
                if !claimed.insert((module_id, export.name.clone(), version)) {
                    self.diagnose(
                        path,
                        DiagnosticKind::Shadowed,
                        format!("{}/{} {} is already exported by an earlier component", export.module, export.name, export.version),
                    );
                    continue;
                }
                exports.push(ExportedType { module_id, name: export.name.clone(), version });
            }
            self.package.types.push(convert::type_info_type(source_id, info, exports));
        }
        Ok(())
    }
}
