//! SQLite implementation of [`ProjectStorage`].

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::ids::{ModuleId, ProjectPartId, SourceContextId, SourceId};
use crate::models::{
    ExportedTypeRow, FileStatusRow, ImportRow, ModuleDependencyRow, ModuleRow, ProjectDataRow, SourceRow, TypeRow,
};
use crate::package::SynchronizationPackage;
use crate::storage::ProjectStorage;
use crate::types::{
    ChangeLevel, ExportedTypeRecord, FileStatus, Import, Module, ModuleDependency, ModuleKind, ProjectData, Snapshot,
    Source, TypeRecord,
};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{HashMap, HashSet};
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    ///
    /// A dry-run repository logs what `synchronize` would write instead of
    /// writing it.
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    // =========================================================================
    // Synchronize
    // =========================================================================

    async fn synchronize_file_statuses(conn: &mut SqliteConnection, package: &SynchronizationPackage) -> Result<()> {
        let refreshed: HashSet<SourceId> = package.file_statuses.iter().map(|s| s.source_id).collect();
        for source_id in package.updated_file_status_source_ids.iter().filter(|id| !refreshed.contains(id)) {
            sqlx::query(include_str!("../queries/delete_file_status.sql"))
                .bind(source_id.raw())
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for status in &package.file_statuses {
            let row = FileStatusRow::from(status);
            sqlx::query(include_str!("../queries/upsert_file_status.sql"))
                .bind(row.source_id)
                .bind(row.size)
                .bind(row.last_modified)
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        Ok(())
    }

    async fn fetch_project_holders(conn: &mut SqliteConnection, project_source_id: SourceId) -> Result<Vec<i64>> {
        sqlx::query_scalar(include_str!("../queries/get_project_part_ids.sql"))
            .bind(project_source_id.raw())
            .fetch_all(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    async fn synchronize_project_datas(conn: &mut SqliteConnection, package: &SynchronizationPackage) -> Result<()> {
        let part = package.project_part_id.raw();
        for project_source_id in &package.released_project_source_ids {
            sqlx::query(include_str!("../queries/release_project_datas.sql"))
                .bind(project_source_id.raw())
                .bind(part)
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        // Other parts naming a replaced project receive the same members.
        let mut holders: HashMap<SourceId, Vec<i64>> = HashMap::new();
        for project_source_id in &package.updated_project_source_ids {
            let parts = Self::fetch_project_holders(conn, *project_source_id).await?;
            holders.insert(*project_source_id, parts.into_iter().filter(|p| *p != part).collect());
            sqlx::query(include_str!("../queries/delete_project_datas.sql"))
                .bind(project_source_id.raw())
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for data in &package.project_datas {
            let row = ProjectDataRow::from(data);
            let copies = holders.get(&data.project_source_id).map(Vec::as_slice).unwrap_or_default();
            for project_part_id in std::iter::once(row.project_part_id).chain(copies.iter().copied()) {
                sqlx::query(include_str!("../queries/upsert_project_data.sql"))
                    .bind(row.project_source_id)
                    .bind(row.source_id)
                    .bind(row.module_id)
                    .bind(row.file_type)
                    .bind(project_part_id)
                    .execute(&mut *conn)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
            }
        }
        Ok(())
    }

    async fn synchronize_module_dependencies(
        conn: &mut SqliteConnection,
        package: &SynchronizationPackage,
    ) -> Result<()> {
        for source_id in &package.updated_module_dependency_source_ids {
            sqlx::query(include_str!("../queries/delete_module_dependencies.sql"))
                .bind(source_id.raw())
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for dependency in &package.module_dependencies {
            let (major, minor) = dependency.version.to_columns();
            sqlx::query(include_str!("../queries/upsert_module_dependency.sql"))
                .bind(dependency.source_id.raw())
                .bind(dependency.module_id.raw())
                .bind(dependency.kind as i64)
                .bind(major)
                .bind(minor)
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        Ok(())
    }

    async fn synchronize_imports(conn: &mut SqliteConnection, package: &SynchronizationPackage) -> Result<()> {
        for source_id in &package.updated_source_ids {
            sqlx::query(include_str!("../queries/delete_imports.sql"))
                .bind(source_id.raw())
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for import in &package.imports {
            let (major, minor) = import.version.to_columns();
            sqlx::query(include_str!("../queries/insert_import.sql"))
                .bind(import.source_id.raw())
                .bind(import.module_id.raw())
                .bind(major)
                .bind(minor)
                .bind(import.alias.as_deref())
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        Ok(())
    }

    async fn synchronize_types(conn: &mut SqliteConnection, package: &SynchronizationPackage) -> Result<()> {
        let mut declared: HashMap<SourceId, HashSet<&str>> = HashMap::new();
        for ty in &package.types {
            declared.entry(ty.source_id).or_default().insert(ty.name.as_str());
        }
        // Types an updated source no longer declares go away, their exports
        // with them (ON DELETE CASCADE).
        for source_id in &package.updated_source_ids {
            let existing: Vec<(i64, String)> = sqlx::query_as(include_str!("../queries/get_type_names.sql"))
                .bind(source_id.raw())
                .fetch_all(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
            let names = declared.get(source_id);
            for (type_id, name) in existing {
                if names.is_some_and(|names| names.contains(name.as_str())) {
                    continue;
                }
                sqlx::query(include_str!("../queries/delete_type.sql"))
                    .bind(type_id)
                    .execute(&mut *conn)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
            }
        }
        for ty in &package.types {
            let row = TypeRow::try_from(ty)?;
            let type_id: i64 = sqlx::query_scalar(include_str!("../queries/upsert_type.sql"))
                .bind(row.source_id)
                .bind(row.name)
                .bind(row.prototype)
                .bind(row.extension)
                .bind(row.default_property)
                .bind(row.traits)
                .bind(row.properties)
                .bind(row.functions)
                .bind(row.signals)
                .bind(row.enumerations)
                .fetch_one(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
            if ty.change_level == ChangeLevel::ExcludeExportedTypes {
                continue;
            }
            sqlx::query(include_str!("../queries/delete_exported_types_of_type.sql"))
                .bind(type_id)
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
            for export in &ty.exported_types {
                let (major, minor) = export.version.to_columns();
                sqlx::query(include_str!("../queries/upsert_exported_type.sql"))
                    .bind(export.module_id.raw())
                    .bind(export.name.as_str())
                    .bind(major)
                    .bind(minor)
                    .bind(type_id)
                    .execute(&mut *conn)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
            }
        }
        Ok(())
    }

    async fn remove_sources(conn: &mut SqliteConnection, package: &SynchronizationPackage) -> Result<()> {
        let statements = [
            include_str!("../queries/delete_file_status.sql"),
            include_str!("../queries/delete_imports.sql"),
            include_str!("../queries/delete_module_dependencies.sql"),
            include_str!("../queries/delete_types_of_source.sql"),
        ];
        for source_id in &package.removed_source_ids {
            sqlx::query(include_str!("../queries/delete_project_datas_of_source.sql"))
                .bind(source_id.raw())
                .bind(package.project_part_id.raw())
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
            let referenced: bool = sqlx::query_scalar(include_str!("../queries/is_source_referenced.sql"))
                .bind(source_id.raw())
                .fetch_one(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
            if referenced {
                tracing::trace!(source_id = %source_id, "Keeping source held by another project part");
                continue;
            }
            for statement in statements {
                sqlx::query(statement)
                    .bind(source_id.raw())
                    .execute(&mut *conn)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectStorage for Repository {
    #[instrument(
        skip_all,
        fields(
            types = package.types.len(),
            file_statuses = package.file_statuses.len(),
            removed = package.removed_source_ids.len(),
        )
    )]
    async fn synchronize(&self, package: SynchronizationPackage) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                updated_sources = package.updated_source_ids.len(),
                project_datas = package.project_datas.len(),
                imports = package.imports.len(),
                "Skipping synchronization during dry-run mode"
            );
            return Ok(());
        }
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        Self::synchronize_file_statuses(&mut *tx, &package).await?;
        Self::synchronize_project_datas(&mut *tx, &package).await?;
        Self::synchronize_module_dependencies(&mut *tx, &package).await?;
        Self::synchronize_imports(&mut *tx, &package).await?;
        Self::synchronize_types(&mut *tx, &package).await?;
        Self::remove_sources(&mut *tx, &package).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        tracing::debug!("Synchronized");
        Ok(())
    }

    async fn fetch_file_status(&self, source_id: SourceId) -> Result<Option<FileStatus>> {
        let row: Option<FileStatusRow> = sqlx::query_as(include_str!("../queries/get_file_status.sql"))
            .bind(source_id.raw())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.map(FileStatus::from))
    }

    async fn fetch_project_datas(
        &self,
        project_source_id: SourceId,
        project_part_id: ProjectPartId,
    ) -> Result<Vec<ProjectData>> {
        let rows: Vec<ProjectDataRow> = sqlx::query_as(include_str!("../queries/get_project_datas.sql"))
            .bind(project_source_id.raw())
            .bind(project_part_id.raw())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(ProjectData::try_from).collect()
    }

    async fn fetch_project_part_ids(&self, project_source_id: SourceId) -> Result<Vec<ProjectPartId>> {
        let mut conn = self.pool.acquire().await.or_raise(|| ErrorKind::Database)?;
        let ids = Self::fetch_project_holders(&mut *conn, project_source_id).await?;
        Ok(ids.into_iter().map(ProjectPartId::new).collect())
    }

    async fn fetch_project_source_ids(&self, project_part_id: ProjectPartId) -> Result<Vec<SourceId>> {
        let ids: Vec<i64> = sqlx::query_scalar(include_str!("../queries/get_project_source_ids.sql"))
            .bind(project_part_id.raw())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(ids.into_iter().map(SourceId::new).collect())
    }

    async fn fetch_types(&self, source_id: SourceId) -> Result<Vec<TypeRecord>> {
        let rows: Vec<TypeRow> = sqlx::query_as(include_str!("../queries/get_types.sql"))
            .bind(source_id.raw())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(TypeRecord::try_from).collect()
    }

    async fn fetch_exported_types(&self, module_id: ModuleId) -> Result<Vec<ExportedTypeRecord>> {
        let rows: Vec<ExportedTypeRow> = sqlx::query_as(include_str!("../queries/get_exported_types.sql"))
            .bind(module_id.raw())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(ExportedTypeRecord::try_from).collect()
    }

    async fn fetch_imports(&self, source_id: SourceId) -> Result<Vec<Import>> {
        let rows: Vec<ImportRow> = sqlx::query_as(include_str!("../queries/get_imports.sql"))
            .bind(source_id.raw())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Import::try_from).collect()
    }

    async fn fetch_module_dependencies(&self, source_id: SourceId) -> Result<Vec<ModuleDependency>> {
        let rows: Vec<ModuleDependencyRow> = sqlx::query_as(include_str!("../queries/get_module_dependencies.sql"))
            .bind(source_id.raw())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(ModuleDependency::try_from).collect()
    }

    async fn fetch_source_context_id(&self, path: &str) -> Result<SourceContextId> {
        let id: i64 = sqlx::query_scalar(include_str!("../queries/upsert_source_context.sql"))
            .bind(path)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(SourceContextId::new(id))
    }

    async fn fetch_source_id(&self, source_context_id: SourceContextId, name: &str) -> Result<SourceId> {
        let id: i64 = sqlx::query_scalar(include_str!("../queries/upsert_source.sql"))
            .bind(source_context_id.raw())
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(SourceId::new(id))
    }

    async fn fetch_all_source_contexts(&self) -> Result<Vec<(SourceContextId, String)>> {
        let rows: Vec<(i64, String)> = sqlx::query_as(include_str!("../queries/all_source_contexts.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(|(id, path)| (SourceContextId::new(id), path)).collect())
    }

    async fn fetch_all_sources(&self) -> Result<Vec<Source>> {
        let rows: Vec<SourceRow> = sqlx::query_as(include_str!("../queries/all_sources.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(Source::from).collect())
    }

    async fn fetch_module_id(&self, name: &str, kind: ModuleKind) -> Result<ModuleId> {
        let id: i64 = sqlx::query_scalar(include_str!("../queries/upsert_module.sql"))
            .bind(name)
            .bind(kind as i64)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(ModuleId::new(id))
    }

    async fn fetch_module(&self, module_id: ModuleId) -> Result<Module> {
        let row: Option<ModuleRow> = sqlx::query_as(include_str!("../queries/get_module.sql"))
            .bind(module_id.raw())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.ok_or_raise(|| ErrorKind::ModuleNotFound(module_id.raw()))?.try_into()
    }

    async fn fetch_project_part_id(&self, name: &str) -> Result<ProjectPartId> {
        let id: i64 = sqlx::query_scalar(include_str!("../queries/upsert_project_part.sql"))
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(ProjectPartId::new(id))
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let file_statuses: Vec<FileStatusRow> = sqlx::query_as(include_str!("../queries/all_file_statuses.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let project_datas: Vec<ProjectDataRow> = sqlx::query_as(include_str!("../queries/all_project_datas.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let types: Vec<TypeRow> = sqlx::query_as(include_str!("../queries/all_types.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let exported_types: Vec<ExportedTypeRow> = sqlx::query_as(include_str!("../queries/all_exported_types.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let imports: Vec<ImportRow> = sqlx::query_as(include_str!("../queries/all_imports.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let module_dependencies: Vec<ModuleDependencyRow> =
            sqlx::query_as(include_str!("../queries/all_module_dependencies.sql"))
                .fetch_all(&self.pool)
                .await
                .or_raise(|| ErrorKind::Database)?;
        Ok(Snapshot {
            file_statuses: file_statuses.into_iter().map(FileStatus::from).collect(),
            project_datas: project_datas.into_iter().map(ProjectData::try_from).collect::<Result<_>>()?,
            types: types.into_iter().map(TypeRecord::try_from).collect::<Result<_>>()?,
            exported_types: exported_types
                .into_iter()
                .map(ExportedTypeRecord::try_from)
                .collect::<Result<_>>()?,
            imports: imports.into_iter().map(Import::try_from).collect::<Result<_>>()?,
            module_dependencies: module_dependencies
                .into_iter()
                .map(ModuleDependency::try_from)
                .collect::<Result<_>>()?,
        })
    }
}
