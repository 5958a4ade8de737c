//! [`PathWatcher`] backed by the platform's file notification API.
//!
//! Every watched id is mapped to a directory: directories watch themselves,
//! files watch their parent. Directories are watched non-recursively and
//! shared between project parts. Events are mapped back to source ids and
//! forwarded to the notifier.

use crate::error::{ErrorKind, Result};
use crate::path_cache::PathCache;
use crate::watcher::{IdPaths, NotifierHandle, PathWatcher, SourceType};
use async_trait::async_trait;
use exn::ResultExt;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use qmlsync_store::ids::{ProjectPartId, SourceId};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

#[derive(Default)]
struct Watched {
    by_part: HashMap<ProjectPartId, HashSet<PathBuf>>,
    directories: HashSet<PathBuf>,
}

pub struct NotifyPathWatcher {
    paths: Arc<PathCache>,
    watcher: Mutex<notify::RecommendedWatcher>,
    watched: Mutex<Watched>,
}

impl NotifyPathWatcher {
    /// Must be called from within a Tokio runtime; events are processed on
    /// a spawned task until the watcher is dropped.
    pub fn new(paths: Arc<PathCache>, notifier: NotifierHandle) -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let watcher = notify::recommended_watcher(move |res| {
            if let Err(err) = tx.send(res) {
                tracing::error!(%err, "Failed to forward file event");
            }
        })
        .or_raise(|| ErrorKind::Watcher)?;

        let event_paths = paths.clone();
        tokio::spawn(async move {
            while let Some(result) = rx.recv().await {
                match result {
                    Ok(event) => {
                        let source_ids = changed_source_ids(&event_paths, &event);
                        if !source_ids.is_empty() {
                            tracing::trace!(?event.kind, changed = source_ids.len(), "File event");
                            notifier.paths_changed(source_ids).await;
                        }
                    },
                    Err(err) => tracing::warn!(%err, "File watcher error"),
                }
            }
            tracing::debug!("File event channel closed");
        });

        Ok(Self {
            paths,
            watcher: Mutex::new(watcher),
            watched: Mutex::new(Watched::default()),
        })
    }

    /// Directories currently registered with the platform watcher.
    pub fn watched_directories(&self) -> Vec<PathBuf> {
        let mut directories: Vec<PathBuf> = lock(&self.watched).directories.iter().cloned().collect();
        directories.sort();
        directories
    }

    fn directory_for(&self, source_type: SourceType, source_id: SourceId) -> Option<PathBuf> {
        let path = self.paths.source_path(source_id)?;
        match source_type {
            SourceType::Directory => Some(path),
            SourceType::QmlDir | SourceType::Qml | SourceType::QmlTypes => path.parent().map(Path::to_path_buf),
        }
    }
}

#[async_trait]
impl PathWatcher for NotifyPathWatcher {
    async fn update_id_paths(&self, project_part_id: ProjectPartId, id_paths: Vec<IdPaths>) -> Result<()> {
        let directories: HashSet<PathBuf> = id_paths
            .iter()
            .flat_map(|chunk| chunk.source_ids.iter().map(move |id| (chunk.id.source_type, *id)))
            .filter_map(|(source_type, source_id)| self.directory_for(source_type, source_id))
            .collect();

        let mut watched = lock(&self.watched);
        watched.by_part.insert(project_part_id, directories);
        let wanted: HashSet<PathBuf> = watched.by_part.values().flatten().cloned().collect();

        let mut watcher = lock(&self.watcher);
        for stale in watched.directories.difference(&wanted) {
            if let Err(err) = watcher.unwatch(stale) {
                tracing::debug!(path = %stale.display(), %err, "Could not unwatch directory");
            }
        }
        let mut active = HashSet::with_capacity(wanted.len());
        for directory in wanted {
            if !watched.directories.contains(&directory)
                && let Err(err) = watcher.watch(&directory, RecursiveMode::NonRecursive)
            {
                tracing::warn!(path = %directory.display(), %err, "Could not watch directory");
                continue;
            }
            active.insert(directory);
        }
        tracing::debug!(project_part = %project_part_id, directories = active.len(), "Watch set updated");
        watched.directories = active;
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Whether a file name can matter to the project storage.
fn is_relevant(file_name: &str) -> bool {
    file_name == "qmldir" || file_name.ends_with(".qml") || file_name.ends_with(".qmltypes")
}

/// Source ids touched by an event. Files that were never interned report
/// their directory instead.
fn changed_source_ids(paths: &PathCache, event: &Event) -> Vec<SourceId> {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)) {
        return Vec::new();
    }
    let mut source_ids = Vec::with_capacity(event.paths.len());
    for path in &event.paths {
        let Ok(path) = qmlsync_fs::normalize_path(path) else {
            continue;
        };
        if let Some(directory) = paths.lookup_directory(&path) {
            source_ids.push(directory);
            continue;
        }
        if !qmlsync_fs::file_name(&path).is_some_and(is_relevant) {
            continue;
        }
        let source_id = paths
            .lookup(&path)
            .or_else(|| path.parent().and_then(|parent| paths.lookup_directory(parent)));
        source_ids.extend(source_id);
    }
    source_ids.sort();
    source_ids.dedup();
    source_ids
}
