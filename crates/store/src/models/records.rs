use crate::error::{Error, ErrorKind};
use crate::ids::{ModuleId, SourceContextId, SourceId};
use crate::types::{DependencyKind, Import, Module, ModuleDependency, ModuleKind, Source, Version};
use exn::OptionExt;

#[derive(sqlx::FromRow)]
pub(crate) struct ImportRow {
    pub(crate) source_id: i64,
    pub(crate) module_id: i64,
    pub(crate) major_version: i64,
    pub(crate) minor_version: i64,
    #[sqlx(default)]
    pub(crate) alias: Option<String>,
}
impl TryFrom<ImportRow> for Import {
    type Error = Error;
    fn try_from(row: ImportRow) -> Result<Self, Self::Error> {
        Ok(Self {
            source_id: SourceId::new(row.source_id),
            module_id: ModuleId::new(row.module_id),
            version: Version::from_columns(row.major_version, row.minor_version)
                .ok_or_raise(|| ErrorKind::InvalidData("import version"))?,
            alias: row.alias,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ModuleDependencyRow {
    pub(crate) source_id: i64,
    pub(crate) module_id: i64,
    pub(crate) kind: i64,
    pub(crate) major_version: i64,
    pub(crate) minor_version: i64,
}
impl TryFrom<ModuleDependencyRow> for ModuleDependency {
    type Error = Error;
    fn try_from(row: ModuleDependencyRow) -> Result<Self, Self::Error> {
        Ok(Self {
            source_id: SourceId::new(row.source_id),
            module_id: ModuleId::new(row.module_id),
            version: Version::from_columns(row.major_version, row.minor_version)
                .ok_or_raise(|| ErrorKind::InvalidData("dependency version"))?,
            kind: DependencyKind::from_raw(row.kind).ok_or_raise(|| ErrorKind::InvalidData("dependency kind"))?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ModuleRow {
    pub(crate) name: String,
    pub(crate) kind: i64,
}
impl TryFrom<ModuleRow> for Module {
    type Error = Error;
    fn try_from(row: ModuleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            name: row.name,
            kind: ModuleKind::from_raw(row.kind).ok_or_raise(|| ErrorKind::InvalidData("module kind"))?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SourceRow {
    pub(crate) source_id: i64,
    pub(crate) source_context_id: i64,
    pub(crate) name: String,
}
impl From<SourceRow> for Source {
    fn from(row: SourceRow) -> Self {
        Self {
            source_id: SourceId::new(row.source_id),
            source_context_id: SourceContextId::new(row.source_context_id),
            name: row.name,
        }
    }
}
