use crate::error::{Error, ErrorKind};
use crate::ids::{ModuleId, ProjectPartId, SourceId};
use crate::types::{FileType, ProjectData};
use exn::OptionExt;

#[derive(sqlx::FromRow)]
pub(crate) struct ProjectDataRow {
    pub(crate) project_source_id: i64,
    pub(crate) source_id: i64,
    #[sqlx(default)]
    pub(crate) module_id: Option<i64>,
    pub(crate) file_type: i64,
    pub(crate) project_part_id: i64,
}
impl From<&ProjectData> for ProjectDataRow {
    fn from(data: &ProjectData) -> Self {
        Self {
            project_source_id: data.project_source_id.raw(),
            source_id: data.source_id.raw(),
            module_id: data.module_id.map(ModuleId::raw),
            file_type: data.file_type as i64,
            project_part_id: data.project_part_id.raw(),
        }
    }
}
impl TryFrom<ProjectDataRow> for ProjectData {
    type Error = Error;
    fn try_from(row: ProjectDataRow) -> Result<Self, Self::Error> {
        Ok(Self {
            project_source_id: SourceId::new(row.project_source_id),
            source_id: SourceId::new(row.source_id),
            module_id: row.module_id.map(ModuleId::new),
            file_type: FileType::from_raw(row.file_type).ok_or_raise(|| ErrorKind::InvalidData("file type"))?,
            project_part_id: ProjectPartId::new(row.project_part_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_model() {
        let row = ProjectDataRow {
            project_source_id: 1,
            source_id: 2,
            module_id: None,
            file_type: 2,
            project_part_id: 0,
        };
        let data = ProjectData::try_from(row).unwrap();
        assert_eq!(data.file_type, FileType::QmlTypes);
        assert_eq!(data.module_id, None);
    }

    #[test]
    fn test_unknown_file_type() {
        let row = ProjectDataRow {
            project_source_id: 1,
            source_id: 2,
            module_id: Some(3),
            file_type: 9,
            project_part_id: 0,
        };
        let err = ProjectData::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("file type")));
    }
}
