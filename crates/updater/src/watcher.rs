//! Watch-set types and the two watcher-facing traits.
//!
//! The updater tells a [`PathWatcher`] what to watch after every pass. The
//! watcher reports changes back through a [`PathWatcherNotifier`].

use crate::error::Result;
use async_trait::async_trait;
use qmlsync_store::ids::{ProjectPartId, SourceId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceType {
    Directory,
    QmlDir,
    Qml,
    QmlTypes,
}

/// One scope's watched ids of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectChunkId {
    pub project_part_id: ProjectPartId,
    pub source_type: SourceType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPaths {
    pub id: ProjectChunkId,
    /// Sorted, without duplicates.
    pub source_ids: Vec<SourceId>,
}

pub type WatcherHandle = Arc<dyn PathWatcher + Send + Sync>;
pub type NotifierHandle = Arc<dyn PathWatcherNotifier + Send + Sync>;

#[async_trait]
pub trait PathWatcher {
    /// Replace everything watched for `project_part_id` with `id_paths`.
    async fn update_id_paths(&self, project_part_id: ProjectPartId, id_paths: Vec<IdPaths>) -> Result<()>;
}

#[async_trait]
pub trait PathWatcherNotifier {
    async fn paths_with_ids_changed(&self, id_paths: Vec<IdPaths>);

    async fn paths_changed(&self, source_ids: Vec<SourceId>);
}

/// Keeps the latest watch set of each scope without watching anything.
///
/// Used for one-shot updates, where nobody listens for changes afterwards.
#[derive(Debug, Default)]
pub struct InMemoryPathWatcher {
    scopes: Mutex<HashMap<ProjectPartId, Vec<IdPaths>>>,
}

impl InMemoryPathWatcher {
    pub fn id_paths(&self, project_part_id: ProjectPartId) -> Vec<IdPaths> {
        self.lock().get(&project_part_id).cloned().unwrap_or_default()
    }

    pub fn watched(&self, project_part_id: ProjectPartId, source_type: SourceType) -> Vec<SourceId> {
        self.lock()
            .get(&project_part_id)
            .and_then(|chunks| chunks.iter().find(|chunk| chunk.id.source_type == source_type))
            .map(|chunk| chunk.source_ids.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ProjectPartId, Vec<IdPaths>>> {
        self.scopes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PathWatcher for InMemoryPathWatcher {
    async fn update_id_paths(&self, project_part_id: ProjectPartId, id_paths: Vec<IdPaths>) -> Result<()> {
        self.lock().insert(project_part_id, id_paths);
        Ok(())
    }
}
