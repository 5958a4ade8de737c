use crate::state::file_status;
use qmlsync_fs::FsHandle;
use qmlsync_fs::error::Result;
use qmlsync_store::ids::SourceId;
use qmlsync_store::types::FileStatus;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Memoised on-disk fingerprints, keyed by source id.
///
/// A missing file is cached as `None` too, so a pass stats each path at most
/// once. Entries go stale as soon as the disk changes; callers invalidate
/// the ids a watcher reports, and a full update clears everything.
pub struct FileStatusCache {
    fs: FsHandle,
    entries: Mutex<HashMap<SourceId, Option<FileStatus>>>,
}

impl FileStatusCache {
    pub fn new(fs: FsHandle) -> Self {
        Self { fs, entries: Mutex::new(HashMap::new()) }
    }

    /// Current fingerprint of `path`, from the cache when possible.
    ///
    /// Stat failures are not cached, so the next call tries again.
    pub async fn find(&self, source_id: SourceId, path: &Path) -> Result<Option<FileStatus>> {
        if let Some(cached) = self.lock().get(&source_id) {
            return Ok(*cached);
        }
        let status = self.fs.stat(path).await?.map(|info| file_status(source_id, &info));
        self.lock().insert(source_id, status);
        Ok(status)
    }

    pub fn invalidate(&self, source_ids: impl IntoIterator<Item = SourceId>) {
        let mut entries = self.lock();
        for source_id in source_ids {
            entries.remove(&source_id);
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SourceId, Option<FileStatus>>> {
        // A poisoned map only ever holds fingerprints; keep using it.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmlsync_fs::backend::MockFileSystem;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_find_caches_until_invalidated() {
        let fs = Arc::new(MockFileSystem::with_files([("/qml/Foo.qml", "Item {}")]));
        let cache = FileStatusCache::new(fs.clone());
        let id = SourceId::new(1);
        let path = Path::new("/qml/Foo.qml");

        let first = cache.find(id, path).await.unwrap().unwrap();
        assert_eq!(first.size, 7);

        fs.write(path, "Item { }").await;
        assert_eq!(cache.find(id, path).await.unwrap(), Some(first));

        cache.invalidate([id]);
        let second = cache.find(id, path).await.unwrap().unwrap();
        assert_eq!(second.size, 8);
        assert!(second.last_modified > first.last_modified);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let fs = Arc::new(MockFileSystem::default());
        let cache = FileStatusCache::new(fs.clone());
        let id = SourceId::new(2);
        assert_eq!(cache.find(id, Path::new("/qml/Gone.qml")).await.unwrap(), None);

        fs.write("/qml/Gone.qml", "Item {}").await;
        cache.clear();
        assert!(cache.find(id, Path::new("/qml/Gone.qml")).await.unwrap().is_some());
    }
}
