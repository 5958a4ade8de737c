//! SQLite project storage.
//!
//! Holds what the updater knows about a QML project: which files exist and
//! when they last changed, which directory or qmltypes project they belong
//! to, the types they declare and the modules those types are exported
//! from. The files on disk are the source of truth; deleting the database
//! only costs a full re-parse.
//!
//! Paths, modules and project parts are interned into small integer ids
//! (see [`ids`]) which stay stable for as long as the database lives.
//! Everything else is written through [`ProjectStorage::synchronize`], one
//! [`SynchronizationPackage`] per update pass, in a single transaction.

mod db;
pub mod error;
pub mod ids;
mod models;
mod package;
mod repo;
mod storage;
pub mod types;

pub use crate::db::Database;
pub use crate::package::SynchronizationPackage;
pub use crate::repo::Repository;
pub use crate::storage::{ProjectStorage, StorageHandle};
