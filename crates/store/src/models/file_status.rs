use crate::ids::SourceId;
use crate::types::FileStatus;

#[derive(sqlx::FromRow)]
pub(crate) struct FileStatusRow {
    pub(crate) source_id: i64,
    pub(crate) size: i64,
    pub(crate) last_modified: i64,
}
impl From<&FileStatus> for FileStatusRow {
    fn from(status: &FileStatus) -> Self {
        Self {
            source_id: status.source_id.raw(),
            size: status.size,
            last_modified: status.last_modified,
        }
    }
}
impl From<FileStatusRow> for FileStatus {
    fn from(row: FileStatusRow) -> Self {
        Self {
            source_id: SourceId::new(row.source_id),
            size: row.size,
            last_modified: row.last_modified,
        }
    }
}
