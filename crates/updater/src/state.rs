use qmlsync_fs::FileInfo;
use qmlsync_store::ids::SourceId;
use qmlsync_store::types::FileStatus;

/// Where a file stands relative to what the storage last recorded.
///
/// Always derived from the on-disk fingerprint and the stored status; never
/// stored itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    NotChanged,
    Changed,
    NotExists,
}

pub fn classify(current: Option<&FileStatus>, stored: Option<&FileStatus>) -> FileState {
    match (current, stored) {
        (None, _) => FileState::NotExists,
        (Some(current), Some(stored)) if current == stored => FileState::NotChanged,
        (Some(_), _) => FileState::Changed,
    }
}

/// Fingerprint of a file as the storage records it.
pub(crate) fn file_status(source_id: SourceId, info: &FileInfo) -> FileStatus {
    FileStatus {
        source_id,
        size: i64::try_from(info.size).unwrap_or(i64::MAX),
        last_modified: info.modified_millis(),
    }
}
