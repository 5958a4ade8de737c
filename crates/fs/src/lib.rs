//! Filesystem access for the qmlsync updater.
//!
//! The updater never writes to the filesystem; it lists directories, reads
//! file contents and asks for cheap fingerprints (size and modification time)
//! so it can decide whether a file has to be parsed again.

pub mod backend;
pub mod error;
pub mod file;
mod path;

pub use crate::backend::FileSystem;
pub use crate::file::{FileInfo, FileKind};
pub use crate::path::{file_name, normalize as normalize_path, split as split_path};
use std::sync::Arc;

pub type FsHandle = Arc<dyn FileSystem + Send + Sync>;
