mod facet;
mod file_status;
mod project_data;
mod records;
mod type_row;

pub(crate) use self::file_status::FileStatusRow;
pub(crate) use self::project_data::ProjectDataRow;
pub(crate) use self::records::{ImportRow, ModuleDependencyRow, ModuleRow, SourceRow};
pub(crate) use self::type_row::{ExportedTypeRow, TypeRow};
