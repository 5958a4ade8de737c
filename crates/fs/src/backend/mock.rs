//! In-memory filesystem for testing.

use super::FileInfoStream;
use crate::FileSystem;
use crate::error::{ErrorKind, Result};
use crate::file::{FileInfo, FileKind};
use crate::path::normalize;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use time::{Duration, UtcDateTime};
use tokio::sync::RwLock;

const EPOCH: i64 = 1_700_000_000;

/// In-memory filesystem for testing.
///
/// Modification times come from a logical clock that advances by one second
/// on every mutation, so two consecutive writes to the same file always
/// produce different fingerprints. Like a real filesystem, a directory's
/// modification time moves whenever an entry is added to or removed from it,
/// but not when an existing file is rewritten.
///
/// # Examples
///
/// ```
/// use qmlsync_fs::backend::MockFileSystem;
/// use qmlsync_fs::FileSystem;
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fs = MockFileSystem::with_files([
///     ("/qml/Foo/qmldir", "module Foo\n"),
/// ]);
/// assert!(fs.exists(Path::new("/qml/Foo")).await?);
///
/// fs.write("/qml/Foo/Bar.qml", "Item {}").await;
/// assert!(fs.exists(Path::new("/qml/Foo/Bar.qml")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockFileSystem {
    name: String,
    state: RwLock<MockState>,
}

#[derive(Default)]
struct MockState {
    clock: i64,
    files: BTreeMap<PathBuf, (UtcDateTime, Vec<u8>)>,
    directories: BTreeMap<PathBuf, UtcDateTime>,
    unreadable: HashSet<PathBuf>,
}
impl MockState {
    fn tick(&mut self) -> UtcDateTime {
        self.clock += 1;
        UtcDateTime::UNIX_EPOCH + Duration::seconds(EPOCH + self.clock)
    }

    /// Create `directory` and any missing ancestors, bumping the parent of
    /// each newly created one.
    fn ensure_directory(&mut self, directory: &Path, now: UtcDateTime) {
        if self.directories.contains_key(directory) {
            return;
        }
        if let Some(parent) = directory.parent() {
            self.ensure_directory(parent, now);
            self.directories.insert(parent.to_path_buf(), now);
        }
        self.directories.insert(directory.to_path_buf(), now);
    }

    fn write(&mut self, path: PathBuf, data: Vec<u8>) {
        let now = self.tick();
        let parent = path.parent().map(Path::to_path_buf);
        let created = self.files.insert(path, (now, data)).is_none();
        if let Some(parent) = parent {
            self.ensure_directory(&parent, now);
            if created {
                self.directories.insert(parent, now);
            }
        }
    }

    fn remove(&mut self, path: &Path) -> bool {
        let now = self.tick();
        let removed_file = self.files.remove(path).is_some();
        let removed_dir = self.directories.remove(path).is_some();
        if removed_dir {
            self.files.retain(|p, _| !p.starts_with(path));
            self.directories.retain(|p, _| !p.starts_with(path));
        }
        let removed = removed_file || removed_dir;
        if removed && let Some(parent) = path.parent() {
            self.directories.insert(parent.to_path_buf(), now);
        }
        removed
    }
}

impl MockFileSystem {
    /// Create a mock filesystem pre-populated with files.
    ///
    /// Panics if any path fails normalisation. If test setup is wrong, then
    /// the test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl AsRef<Path>, impl Into<Vec<u8>>)>) -> Self {
        let mut state = MockState::default();
        let root = state.tick();
        state.directories.insert(PathBuf::from("/"), root);
        for (path, data) in files {
            let Ok(normalized) = normalize(path.as_ref()) else {
                // Deliberate: there is no error result for broken test setup.
                panic!("MockFileSystem::with_files: invalid path {}", path.as_ref().display());
            };
            state.write(normalized, data.into());
        }
        Self {
            name: "mock".to_string(),
            state: RwLock::new(state),
        }
    }

    /// Change the name of the mock filesystem.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn normalized(path: impl AsRef<Path>) -> PathBuf {
        match normalize(path.as_ref()) {
            Ok(path) => path,
            Err(_) => panic!("MockFileSystem: invalid path {}", path.as_ref().display()),
        }
    }

    /// Create or overwrite a file, creating parent directories as needed.
    pub async fn write(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) {
        self.state.write().await.write(Self::normalized(path), data.into());
    }

    /// Create an empty directory (and its ancestors).
    pub async fn create_dir(&self, path: impl AsRef<Path>) {
        let path = Self::normalized(path);
        let mut state = self.state.write().await;
        let now = state.tick();
        state.ensure_directory(&path, now);
    }

    /// Bump the modification time of a file without changing its contents.
    pub async fn touch(&self, path: impl AsRef<Path>) {
        let path = Self::normalized(path);
        let mut state = self.state.write().await;
        let now = state.tick();
        if let Some((modified, _)) = state.files.get_mut(&path) {
            *modified = now;
        } else if let Some(modified) = state.directories.get_mut(&path) {
            *modified = now;
        }
    }

    /// Remove a file, or a directory with everything beneath it. Returns
    /// whether anything was removed.
    pub async fn remove(&self, path: impl AsRef<Path>) -> bool {
        self.state.write().await.remove(&Self::normalized(path))
    }

    /// Make reads of `path` fail with an I/O error (or succeed again).
    pub async fn set_unreadable(&self, path: impl AsRef<Path>, unreadable: bool) {
        let path = Self::normalized(path);
        let mut state = self.state.write().await;
        match unreadable {
            true => state.unreadable.insert(path),
            false => state.unreadable.remove(&path),
        };
    }
}
impl Default for MockFileSystem {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl FileSystem for MockFileSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, directory: &'a Path) -> FileInfoStream<'a> {
        let directory = match normalize(directory) {
            Ok(directory) => directory,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding.
            let entries: Vec<FileInfo> = {
                let guard = self.state.read().await;
                let files = guard
                    .files
                    .iter()
                    .filter(|(path, _)| path.parent() == Some(directory.as_path()))
                    .map(|(path, (modified, data))| FileInfo::new(path, FileKind::File, data.len() as u64, *modified));
                let directories = guard
                    .directories
                    .iter()
                    .filter(|(path, _)| path.parent() == Some(directory.as_path()))
                    .map(|(path, modified)| FileInfo::new(path, FileKind::Directory, 0, *modified));
                files.chain(directories).collect()
            };
            for entry in entries {
                yield Ok(entry);
            }
        })
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = normalize(path)?;
        let guard = self.state.read().await;
        if guard.unreadable.contains(&path) {
            exn::bail!(ErrorKind::Io(std::io::Error::other(format!("injected read failure: {}", path.display()))));
        }
        if guard.directories.contains_key(&path) {
            exn::bail!(ErrorKind::WrongKind(path));
        }
        let (_modified, data) = guard.files.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(data.clone())
    }

    async fn stat(&self, path: &Path) -> Result<Option<FileInfo>> {
        let path = normalize(path)?;
        let guard = self.state.read().await;
        if let Some((modified, data)) = guard.files.get(&path) {
            return Ok(Some(FileInfo::new(path, FileKind::File, data.len() as u64, *modified)));
        }
        Ok(guard.directories.get(&path).map(|modified| FileInfo::new(path, FileKind::Directory, 0, *modified)))
    }
}
