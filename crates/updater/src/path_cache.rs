//! Interning of directory and file paths into stable ids.
//!
//! Ids live in the project storage, so they survive restarts. The cache in
//! front of it answers repeated lookups without touching the database.
//! Lookups take a read lock only; allocating a new id goes through a single
//! async writer lock so two passes discovering the same path end up with
//! the same id.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use qmlsync_store::StorageHandle;
use qmlsync_store::ids::{SourceContextId, SourceId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;

/// Pseudo file name that gives a directory its own source id.
pub const DIRECTORY_SOURCE_NAME: &str = ".";

#[derive(Default)]
struct Tables {
    context_ids: HashMap<String, SourceContextId>,
    context_paths: HashMap<SourceContextId, String>,
    source_ids: HashMap<(SourceContextId, String), SourceId>,
    sources: HashMap<SourceId, (SourceContextId, String)>,
}

pub struct PathCache {
    storage: StorageHandle,
    tables: RwLock<Tables>,
    writer: Mutex<()>,
}

impl PathCache {
    pub fn new(storage: StorageHandle) -> Self {
        Self { storage, tables: RwLock::new(Tables::default()), writer: Mutex::new(()) }
    }

    /// Load every interned path from the storage.
    pub async fn populate(&self) -> Result<()> {
        let contexts = self.storage.fetch_all_source_contexts().await.or_raise(|| ErrorKind::PathCache)?;
        let sources = self.storage.fetch_all_sources().await.or_raise(|| ErrorKind::PathCache)?;
        let mut tables = self.write();
        for (id, path) in contexts {
            tables.context_ids.insert(path.clone(), id);
            tables.context_paths.insert(id, path);
        }
        for source in sources {
            tables.source_ids.insert((source.source_context_id, source.name.clone()), source.source_id);
            tables.sources.insert(source.source_id, (source.source_context_id, source.name));
        }
        tracing::debug!(contexts = tables.context_paths.len(), sources = tables.sources.len(), "Path cache populated");
        Ok(())
    }

    pub async fn source_context_id(&self, directory: &Path) -> Result<SourceContextId> {
        let directory = path_str(directory)?;
        if let Some(id) = self.read().context_ids.get(directory) {
            return Ok(*id);
        }
        let _guard = self.writer.lock().await;
        if let Some(id) = self.read().context_ids.get(directory) {
            return Ok(*id);
        }
        let id = self.storage.fetch_source_context_id(directory).await.or_raise(|| ErrorKind::PathCache)?;
        let mut tables = self.write();
        tables.context_ids.insert(directory.to_string(), id);
        tables.context_paths.insert(id, directory.to_string());
        Ok(id)
    }

    pub async fn source_id_in(&self, context: SourceContextId, name: &str) -> Result<SourceId> {
        let key = (context, name.to_string());
        if let Some(id) = self.read().source_ids.get(&key) {
            return Ok(*id);
        }
        let _guard = self.writer.lock().await;
        if let Some(id) = self.read().source_ids.get(&key) {
            return Ok(*id);
        }
        let id = self.storage.fetch_source_id(context, name).await.or_raise(|| ErrorKind::PathCache)?;
        let mut tables = self.write();
        tables.sources.insert(id, key.clone());
        tables.source_ids.insert(key, id);
        Ok(id)
    }

    /// Id of a file path, interning its directory along the way.
    pub async fn source_id(&self, path: &Path) -> Result<SourceId> {
        let (directory, name) =
            qmlsync_fs::split_path(path).ok_or_raise(|| ErrorKind::InvalidPath(path.display().to_string()))?;
        let context = self.source_context_id(directory).await?;
        self.source_id_in(context, name).await
    }

    /// Context id of a directory and the source id standing for the
    /// directory itself.
    pub async fn directory_source_id(&self, directory: &Path) -> Result<(SourceContextId, SourceId)> {
        let context = self.source_context_id(directory).await?;
        let source_id = self.source_id_in(context, DIRECTORY_SOURCE_NAME).await?;
        Ok((context, source_id))
    }

    /// Already-interned id of a path. Never allocates.
    pub fn lookup(&self, path: &Path) -> Option<SourceId> {
        let (directory, name) = qmlsync_fs::split_path(path)?;
        let tables = self.read();
        let context = tables.context_ids.get(directory.to_str()?)?;
        tables.source_ids.get(&(*context, name.to_string())).copied()
    }

    /// Already-interned id of a directory's own source.
    pub fn lookup_directory(&self, directory: &Path) -> Option<SourceId> {
        let tables = self.read();
        let context = tables.context_ids.get(directory.to_str()?)?;
        tables.source_ids.get(&(*context, DIRECTORY_SOURCE_NAME.to_string())).copied()
    }

    pub fn lookup_in(&self, context: SourceContextId, name: &str) -> Option<SourceId> {
        self.read().source_ids.get(&(context, name.to_string())).copied()
    }

    pub fn source_context_of(&self, source_id: SourceId) -> Option<SourceContextId> {
        self.read().sources.get(&source_id).map(|(context, _)| *context)
    }

    pub fn source_name(&self, source_id: SourceId) -> Option<String> {
        self.read().sources.get(&source_id).map(|(_, name)| name.clone())
    }

    pub fn source_context_path(&self, context: SourceContextId) -> Option<PathBuf> {
        self.read().context_paths.get(&context).map(PathBuf::from)
    }

    /// Path of a source. The directory pseudo source maps to the directory.
    pub fn source_path(&self, source_id: SourceId) -> Option<PathBuf> {
        let tables = self.read();
        let (context, name) = tables.sources.get(&source_id)?;
        let directory = PathBuf::from(tables.context_paths.get(context)?);
        match name.as_str() {
            DIRECTORY_SOURCE_NAME => Some(directory),
            name => Some(directory.join(name)),
        }
    }

    /// Source id of the directory containing `source_id`, if interned.
    pub fn directory_of(&self, source_id: SourceId) -> Option<SourceId> {
        let context = self.source_context_of(source_id)?;
        self.lookup_in(context, DIRECTORY_SOURCE_NAME)
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str().ok_or_raise(|| ErrorKind::InvalidPath(path.display().to_string()))
}
