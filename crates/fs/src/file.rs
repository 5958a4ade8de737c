//! File metadata returned by filesystem implementations.

use std::path::PathBuf;
use time::UtcDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    File,
    Directory,
}

/// Metadata about one filesystem entry.
///
/// Size and modification time together form the fingerprint the updater
/// compares against the stored file status. A directory's modification time
/// changes whenever an entry is added to or removed from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Absolute, normalised path
    pub path: PathBuf,
    pub kind: FileKind,
    /// Size in bytes (zero for directories)
    pub size: u64,
    /// Last modified timestamp
    pub modified: UtcDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, kind: FileKind, size: u64, modified: UtcDateTime) -> Self {
        Self { path: path.into(), kind, size, modified }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Modification time in whole milliseconds since the Unix epoch.
    ///
    /// Millisecond precision is what gets persisted, so comparisons against
    /// stored statuses must use this rather than the raw timestamp.
    pub fn modified_millis(&self) -> i64 {
        let millis = self.modified.unix_timestamp_nanos() / 1_000_000;
        i64::try_from(millis).unwrap_or(i64::MAX)
    }

    /// File extension as a string slice, if any.
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()?.to_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modified_millis_truncates() {
        let modified = UtcDateTime::from_unix_timestamp_nanos(1_700_000_000_123_456_789).unwrap();
        let info = FileInfo::new("/qml/Foo.qml", FileKind::File, 12, modified);
        assert_eq!(info.modified_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_extension() {
        let modified = UtcDateTime::from_unix_timestamp(0).unwrap();
        assert_eq!(FileInfo::new("/qml/Foo.qml", FileKind::File, 0, modified).extension(), Some("qml"));
        assert_eq!(FileInfo::new("/qml/qmldir", FileKind::File, 0, modified).extension(), None);
    }
}
