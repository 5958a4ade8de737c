use crate::error::Result;
use crate::ids::{ModuleId, ProjectPartId, SourceContextId, SourceId};
use crate::package::SynchronizationPackage;
use crate::types::{
    ExportedTypeRecord, FileStatus, Import, Module, ModuleDependency, ModuleKind, ProjectData, Snapshot, Source,
    TypeRecord,
};
use async_trait::async_trait;
use std::sync::Arc;

pub type StorageHandle = Arc<dyn ProjectStorage + Send + Sync>;

/// Durable store of everything an update pass learns.
///
/// The `fetch_*_id` methods intern: they return the existing id for a key or
/// allocate one, so they write even on a dry-run storage.
#[async_trait]
pub trait ProjectStorage {
    /// Apply a whole package in one transaction. On error nothing is written.
    async fn synchronize(&self, package: SynchronizationPackage) -> Result<()>;

    async fn fetch_file_status(&self, source_id: SourceId) -> Result<Option<FileStatus>>;

    /// Project datas a part holds for the project (directory or qmltypes
    /// file) `project_source_id`.
    async fn fetch_project_datas(
        &self,
        project_source_id: SourceId,
        project_part_id: ProjectPartId,
    ) -> Result<Vec<ProjectData>>;

    /// Every part holding a record for the project `project_source_id`.
    async fn fetch_project_part_ids(&self, project_source_id: SourceId) -> Result<Vec<ProjectPartId>>;

    /// Every project source recorded for a scope.
    async fn fetch_project_source_ids(&self, project_part_id: ProjectPartId) -> Result<Vec<SourceId>>;

    async fn fetch_types(&self, source_id: SourceId) -> Result<Vec<TypeRecord>>;

    async fn fetch_exported_types(&self, module_id: ModuleId) -> Result<Vec<ExportedTypeRecord>>;

    async fn fetch_imports(&self, source_id: SourceId) -> Result<Vec<Import>>;

    async fn fetch_module_dependencies(&self, source_id: SourceId) -> Result<Vec<ModuleDependency>>;

    async fn fetch_source_context_id(&self, path: &str) -> Result<SourceContextId>;

    async fn fetch_source_id(&self, source_context_id: SourceContextId, name: &str) -> Result<SourceId>;

    async fn fetch_all_source_contexts(&self) -> Result<Vec<(SourceContextId, String)>>;

    async fn fetch_all_sources(&self) -> Result<Vec<Source>>;

    async fn fetch_module_id(&self, name: &str, kind: ModuleKind) -> Result<ModuleId>;

    async fn fetch_module(&self, module_id: ModuleId) -> Result<Module>;

    async fn fetch_project_part_id(&self, name: &str) -> Result<ProjectPartId>;

    async fn snapshot(&self) -> Result<Snapshot>;
}
