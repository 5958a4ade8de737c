//! The batch of changes one update pass hands to the storage.

use crate::ids::{ProjectPartId, SourceId};
use crate::types::{FileStatus, Import, ModuleDependency, ProjectData, Type};

/// Everything one update pass wants written, committed in one transaction.
///
/// Each `updated_*` list names the sources whose records of that kind are
/// replaced wholesale. An id listed there without any new record in the
/// matching data list has its records deleted.
///
/// Project membership is held per project part. A project listed in
/// `updated_project_source_ids` gets the same members for every part that
/// already names it, since they all watch the same directory or file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SynchronizationPackage {
    /// The part the pass ran for.
    pub project_part_id: ProjectPartId,
    pub types: Vec<Type>,
    /// Sources whose types and imports are replaced.
    pub updated_source_ids: Vec<SourceId>,
    pub file_statuses: Vec<FileStatus>,
    pub updated_file_status_source_ids: Vec<SourceId>,
    pub project_datas: Vec<ProjectData>,
    pub updated_project_source_ids: Vec<SourceId>,
    /// Projects this part stops naming while another part still does.
    pub released_project_source_ids: Vec<SourceId>,
    pub imports: Vec<Import>,
    pub module_dependencies: Vec<ModuleDependency>,
    pub updated_module_dependency_source_ids: Vec<SourceId>,
    /// Sources this part forgets. Their records are deleted once no part
    /// holds them as a project or a project member.
    pub removed_source_ids: Vec<SourceId>,
}

impl SynchronizationPackage {
    /// `true` when committing this package would not touch the storage.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.updated_source_ids.is_empty()
            && self.file_statuses.is_empty()
            && self.updated_file_status_source_ids.is_empty()
            && self.project_datas.is_empty()
            && self.updated_project_source_ids.is_empty()
            && self.released_project_source_ids.is_empty()
            && self.imports.is_empty()
            && self.module_dependencies.is_empty()
            && self.updated_module_dependency_source_ids.is_empty()
            && self.removed_source_ids.is_empty()
    }

    /// Sort and deduplicate the id lists.
    pub fn normalize(&mut self) {
        for ids in [
            &mut self.updated_source_ids,
            &mut self.updated_file_status_source_ids,
            &mut self.updated_project_source_ids,
            &mut self.released_project_source_ids,
            &mut self.updated_module_dependency_source_ids,
            &mut self.removed_source_ids,
        ] {
            ids.sort_unstable();
            ids.dedup();
        }
    }
}
