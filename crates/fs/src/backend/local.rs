//! Local filesystem implementation.
//!
//! Reads go through `tokio::fs`. The filesystem can be rooted somewhere other
//! than `/`, in which case every absolute path is resolved beneath that root
//! and paths reported back are relative to it again.

use crate::backend::FileInfoStream;
use crate::error::{ErrorKind, Result};
use crate::file::{FileInfo, FileKind};
use crate::{FileSystem, path::normalize};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

/// Local filesystem reader.
///
/// # Examples
///
/// ```no_run
/// use qmlsync_fs::backend::LocalFileSystem;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // Paths map 1:1 onto the host filesystem.
/// let fs = LocalFileSystem::default();
/// // Paths resolve beneath `/srv/sandbox`.
/// let sandboxed = LocalFileSystem::new("sandbox", "/srv/sandbox")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalFileSystem {
    name: String,
    root: PathBuf,
}
impl LocalFileSystem {
    /// Create a local filesystem rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not absolute or is not a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || !root.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Ok(Self { name: name.into(), root })
    }

    /// Resolve an absolute (virtual) path to a host path beneath the root.
    fn host_path(&self, path: &Path) -> Result<PathBuf> {
        let normalized = normalize(path).inspect_err(|_| {
            tracing::warn!(filesystem = %self.name, path = %path.display(), "Rejecting path outside of the filesystem root");
        })?;
        // Normalised paths always start with `/`, so this only strips it.
        let relative = normalized.strip_prefix("/").or_raise(|| ErrorKind::InvalidPath(normalized.clone()))?;
        Ok(self.root.join(relative))
    }

    /// Convert a host path beneath the root back into an absolute (virtual) path.
    fn virtual_path(&self, host: &Path) -> Result<PathBuf> {
        let relative = host.strip_prefix(&self.root).or_raise(|| ErrorKind::InvalidPath(host.to_path_buf()))?;
        normalize(Path::new("/").join(relative))
    }

    fn file_info(path: PathBuf, metadata: &Metadata) -> Result<FileInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?.into();
        let (kind, size) = match metadata.is_dir() {
            true => (FileKind::Directory, 0),
            false => (FileKind::File, metadata.len()),
        };
        Ok(FileInfo::new(path, kind, size, modified))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::IsADirectory | std::io::ErrorKind::NotADirectory => {
                ErrorKind::WrongKind(path.to_path_buf())
            },
            _ => ErrorKind::Io(e),
        }
    }

    async fn process_entry(&self, entry: DirEntry) -> Result<Option<FileInfo>> {
        let host = entry.path();
        // Follows symlinks, so a link to a qml file counts as a qml file.
        let metadata = match fs::metadata(&host).await {
            Ok(metadata) => metadata,
            // Broken symlink, or the entry vanished while listing.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => exn::bail!(Self::map_io_error(e, &host)),
        };
        if !metadata.is_file() && !metadata.is_dir() {
            tracing::trace!(path = %host.display(), "Skipping special file");
            return Ok(None);
        }
        Ok(Some(Self::file_info(self.virtual_path(&host)?, &metadata)?))
    }
}
impl Default for LocalFileSystem {
    fn default() -> Self {
        Self { name: "local".to_string(), root: PathBuf::from("/") }
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, directory: &'a Path) -> FileInfoStream<'a> {
        let host = match self.host_path(directory) {
            Ok(host) => host,
            Err(e) => return Box::pin(futures::stream::once(async { Result::Err(e) })),
        };

        Box::pin(stream! {
            let entries = match fs::read_dir(&host).await {
                Ok(entries) => Some(entries),
                // A directory that vanished has no entries.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
                Err(err) => {
                    tracing::debug!(path = %directory.display(), error = %err, "Failed to list directory");
                    yield Err(exn::Exn::from(Self::map_io_error(err, directory)));
                    None
                }
            };
            if let Some(mut entries) = entries {
                loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, directory))); break; },
                    };
                    match self.process_entry(entry).await {
                        Ok(Some(info)) => yield Ok(info),
                        Ok(None) => {},
                        Err(e) => yield Err(e),
                    }
                }
            }
        })
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let host = self.host_path(path)?;
        let data = fs::read(&host).await.map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "Failed to read file");
            Self::map_io_error(e, path)
        })?;
        Ok(data)
    }

    async fn stat(&self, path: &Path) -> Result<Option<FileInfo>> {
        let host = self.host_path(path)?;
        let normalized = normalize(path)?;
        match fs::metadata(&host).await {
            Ok(metadata) => Ok(Some(Self::file_info(normalized, &metadata)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Failed to inspect path");
                exn::bail!(Self::map_io_error(e, path))
            },
        }
    }
}
