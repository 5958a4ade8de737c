use super::ProjectStorageUpdater;
use super::report::{Diagnostic, DiagnosticKind, UpdateReport};
use crate::error::{ErrorKind, Result};
use crate::ids_data::SourceIdsData;
use crate::path_cache::DIRECTORY_SOURCE_NAME;
use crate::state::{FileState, classify};
use exn::ResultExt;
use qmlsync_store::SynchronizationPackage;
use qmlsync_store::ids::{ModuleId, ProjectPartId, SourceId};
use qmlsync_store::types::ModuleKind;
use std::collections::HashSet;
use std::fmt::Display;
use std::path::Path;

/// State of one update pass.
///
/// Everything the pass decides goes into `package`; nothing touches the
/// storage until [`finish`](Self::finish) hands the package back for the
/// commit. Reads from the storage (stored fingerprints, project data, module
/// ids) happen along the way.
pub(super) struct Pass<'a> {
    pub(super) updater: &'a ProjectStorageUpdater,
    pub(super) project_part_id: ProjectPartId,
    pub(super) package: SynchronizationPackage,
    pub(super) ids: SourceIdsData,
    pub(super) report: UpdateReport,
    /// Directories and explicit qmltypes files handled so far.
    pub(super) projects: HashSet<SourceId>,
    /// Projects the storage holds for this part when the pass starts.
    pub(super) claimed: HashSet<SourceId>,
}

impl<'a> Pass<'a> {
    pub(super) async fn new(
        updater: &'a ProjectStorageUpdater,
        project_part_id: ProjectPartId,
        roots: usize,
    ) -> Result<Self> {
        let claimed = updater
            .storage
            .fetch_project_source_ids(project_part_id)
            .await
            .or_raise(|| ErrorKind::Storage)?;
        Ok(Self {
            updater,
            project_part_id,
            package: SynchronizationPackage { project_part_id, ..Default::default() },
            ids: SourceIdsData::with_capacity(roots),
            report: UpdateReport::default(),
            projects: HashSet::with_capacity(roots),
            claimed: claimed.into_iter().collect(),
        })
    }

    pub(super) fn diagnose(&mut self, path: &Path, kind: DiagnosticKind, message: impl Display) {
        let diagnostic = Diagnostic { path: path.to_path_buf(), kind, message: message.to_string() };
        tracing::warn!(%diagnostic, "Skipping file");
        self.report.diagnostics.push(diagnostic);
    }

    // ===== File state

    /// Classify `path` and record the fingerprint bookkeeping that goes with
    /// the answer. The second value tells whether the storage knew the file.
    ///
    /// A file that cannot be inspected counts as missing.
    pub(super) async fn observe(&mut self, source_id: SourceId, path: &Path) -> Result<(FileState, bool)> {
        let updater = self.updater;
        let current = match updater.file_statuses.find(source_id, path).await {
            Ok(status) => status,
            Err(err) => {
                self.diagnose(path, DiagnosticKind::Io, &*err);
                None
            },
        };
        let stored = updater.storage.fetch_file_status(source_id).await.or_raise(|| ErrorKind::Storage)?;
        let state = classify(current.as_ref(), stored.as_ref());
        match (state, current) {
            (FileState::NotChanged, _) => {
                self.ids.not_updated_file_status.insert(source_id);
            },
            (FileState::Changed, Some(current)) => {
                self.package.file_statuses.push(current);
                self.package.updated_file_status_source_ids.push(source_id);
            },
            (FileState::Changed | FileState::NotExists, _) => {
                self.package.updated_file_status_source_ids.push(source_id);
                if stored.is_some() {
                    self.package.removed_source_ids.push(source_id);
                }
            },
        }
        Ok((state, stored.is_some()))
    }

    pub(super) async fn file_state(&mut self, source_id: SourceId, path: &Path) -> Result<FileState> {
        Ok(self.observe(source_id, path).await?.0)
    }

    /// Keep everything the storage has for a file that failed to parse,
    /// including its old fingerprint, so it is looked at again once fixed.
    pub(super) fn retain_previous(&mut self, source_id: SourceId) {
        self.package.file_statuses.retain(|status| status.source_id != source_id);
        self.ids.not_updated_file_status.insert(source_id);
        self.ids.not_updated.insert(source_id);
    }

    /// Drop the content of a file that exists but cannot be read.
    ///
    /// The fingerprints of the file and of its directory are forgotten, so
    /// the next pass rebuilds the directory and reads the file again with
    /// its exports.
    pub(super) fn forget_content(&mut self, source_id: SourceId) {
        self.forget_fingerprint(source_id);
        if let Some(directory) = self.updater.paths.directory_of(source_id) {
            self.forget_fingerprint(directory);
        }
        self.package.updated_source_ids.push(source_id);
        self.package.updated_module_dependency_source_ids.push(source_id);
    }

    fn forget_fingerprint(&mut self, source_id: SourceId) {
        self.package.file_statuses.retain(|status| status.source_id != source_id);
        self.ids.not_updated_file_status.remove(&source_id);
        if !self.package.updated_file_status_source_ids.contains(&source_id) {
            self.package.updated_file_status_source_ids.push(source_id);
        }
    }

    pub(super) async fn read(&mut self, path: &Path) -> Option<String> {
        let updater = self.updater;
        match updater.fs.read_to_string(path).await {
            Ok(text) => Some(text),
            Err(err) => {
                self.diagnose(path, DiagnosticKind::Io, &*err);
                None
            },
        }
    }

    pub(super) async fn module_id(&self, name: &str, kind: ModuleKind) -> Result<ModuleId> {
        self.updater.storage.fetch_module_id(name, kind).await.or_raise(|| ErrorKind::Storage)
    }

    // ===== Removal

    /// Parts other than this one holding `project_source_id`.
    pub(super) async fn other_holders(&self, project_source_id: SourceId) -> Result<Vec<ProjectPartId>> {
        let mut parts = self
            .updater
            .storage
            .fetch_project_part_ids(project_source_id)
            .await
            .or_raise(|| ErrorKind::Storage)?;
        parts.retain(|part| *part != self.project_part_id);
        Ok(parts)
    }

    /// Queue a project (directory or explicit qmltypes file) and all of its
    /// members for removal.
    ///
    /// A project that still exists and is named by another part is only
    /// released by this one; its content stays. A project that is `gone`
    /// is removed for every part.
    pub(super) async fn forget_project(&mut self, project_source_id: SourceId, gone: bool) -> Result<()> {
        let others = self.other_holders(project_source_id).await?;
        if !gone && !others.is_empty() {
            tracing::debug!(project = %project_source_id, "Releasing project still named by another project part");
            self.package.released_project_source_ids.push(project_source_id);
            return Ok(());
        }
        let holder = match others.first() {
            Some(other) if !self.claimed.contains(&project_source_id) => *other,
            _ => self.project_part_id,
        };
        let updater = self.updater;
        let datas = updater
            .storage
            .fetch_project_datas(project_source_id, holder)
            .await
            .or_raise(|| ErrorKind::Storage)?;
        self.package.removed_source_ids.extend(datas.iter().map(|data| data.source_id));
        self.package.removed_source_ids.push(project_source_id);
        self.package.updated_project_source_ids.push(project_source_id);
        self.package.updated_module_dependency_source_ids.push(project_source_id);

        let is_directory = updater.paths.source_name(project_source_id).as_deref() == Some(DIRECTORY_SOURCE_NAME);
        if is_directory
            && let Some(context) = updater.paths.source_context_of(project_source_id)
            && let Some(qmldir) = updater.paths.lookup_in(context, "qmldir")
        {
            self.package.removed_source_ids.push(qmldir);
            self.package.updated_source_ids.push(qmldir);
            self.package.updated_module_dependency_source_ids.push(qmldir);
        }
        tracing::debug!(project = %project_source_id, members = datas.len(), "Forgetting project");
        Ok(())
    }

    /// Remove the projects this part stored before but no longer names.
    pub(super) async fn sweep_stale_projects(&mut self) -> Result<()> {
        let mut stale: Vec<SourceId> = self.claimed.difference(&self.projects).copied().collect();
        stale.sort_unstable();
        for project_source_id in stale {
            self.forget_project(project_source_id, false).await?;
        }
        Ok(())
    }

    // ===== Commit

    /// Resolve conflicting mentions and hand back the package to commit,
    /// the collected ids and the report.
    ///
    /// "Not updated" wins over "updated", and nothing the pass still
    /// watches or kept is removed.
    pub(super) fn finish(self) -> (SynchronizationPackage, SourceIdsData, UpdateReport) {
        let Self { mut package, ids, mut report, .. } = self;
        package.updated_source_ids.retain(|id| !ids.not_updated.contains(id));
        package
            .updated_file_status_source_ids
            .retain(|id| !ids.not_updated_file_status.contains(id));
        package.removed_source_ids.retain(|id| !ids.is_kept(*id));
        package.normalize();
        report.removed_sources = package.removed_source_ids.len();
        (package, ids, report)
    }
}
