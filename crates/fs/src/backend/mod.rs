//! Filesystem trait and implementations.
//!
//! The updater only ever needs four things from a filesystem: does a path
//! exist, what are its contents, what does a directory contain, and what is
//! its current fingerprint. [`FileSystem`] describes exactly that so the
//! updater can run against the real disk or an in-memory tree in tests.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalFileSystem;
#[cfg(feature = "mock")]
pub use self::mock::MockFileSystem;
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Read-only view of a filesystem.
///
/// # Path Handling
/// All paths are absolute. Implementations normalise them with
/// [`normalize_path`](crate::normalize_path) and reject anything that does
/// not normalise.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use qmlsync_fs::{FileSystem, error::Result};
///
/// async fn qmldir_size(fs: &dyn FileSystem, directory: &Path) -> Result<Option<u64>> {
///     Ok(fs.stat(&directory.join("qmldir")).await?.map(|info| info.size))
/// }
/// ```
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Name of the filesystem (used for logging only).
    fn name(&self) -> &str;

    /// Stream the direct children of a directory.
    ///
    /// Only regular files and directories are yielded; the listing is not
    /// recursive. Listing a directory that does not exist yields nothing
    /// rather than an error, matching how the updater treats vanished
    /// directories.
    fn list_stream<'a>(&'a self, directory: &'a Path) -> FileInfoStream<'a>;

    /// Collect [`list_stream()`](Self::list_stream) into a [`Vec`], sorted by path.
    async fn list(&self, directory: &Path) -> Result<Vec<FileInfo>> {
        let mut entries: Vec<FileInfo> = self.list_stream(directory).try_collect().await?;
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// Names of the regular files in `directory` with the given extension,
    /// sorted.
    async fn file_names_with_extension(&self, directory: &Path, extension: &str) -> Result<Vec<String>> {
        Ok(self
            .list(directory)
            .await?
            .into_iter()
            .filter(|info| !info.is_dir() && info.extension() == Some(extension))
            .filter_map(|info| crate::path::file_name(&info.path).map(str::to_string))
            .collect())
    }

    /// Check if a path exists (file or directory).
    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.stat(path).await?.is_some())
    }

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Read file contents as UTF-8 text.
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|_| exn::Exn::from(ErrorKind::InvalidEncoding(path.to_path_buf())))
    }

    /// Fingerprint of a path without reading its contents.
    ///
    /// Returns `Ok(None)` when nothing exists at `path`. Errors are reserved
    /// for paths that exist but cannot be inspected.
    async fn stat(&self, path: &Path) -> Result<Option<FileInfo>>;
}
