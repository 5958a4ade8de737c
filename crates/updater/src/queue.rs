//! Decouples watcher callbacks from update passes.
//!
//! The watcher pushes notifications into an unbounded queue; a single loop
//! waits for a short quiet period, merges everything that arrived in the
//! meantime and runs one scoped pass per batch.

use crate::ProjectStorageUpdater;
use crate::watcher::{IdPaths, PathWatcherNotifier};
use async_trait::async_trait;
use qmlsync_store::ids::SourceId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    PathsChanged(Vec<SourceId>),
    PathsWithIdsChanged(Vec<IdPaths>),
}

/// The sending half, handed to a watcher as its notifier.
#[derive(Debug, Clone)]
pub struct QueueNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

/// The receiving half, consumed by [`run_notification_loop`].
#[derive(Debug)]
pub struct NotificationQueue {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl QueueNotifier {
    pub fn new() -> (Self, NotificationQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, NotificationQueue { rx })
    }

    fn send(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            tracing::debug!("Notification loop has stopped; dropping change");
        }
    }
}

#[async_trait]
impl PathWatcherNotifier for QueueNotifier {
    async fn paths_with_ids_changed(&self, id_paths: Vec<IdPaths>) {
        self.send(Notification::PathsWithIdsChanged(id_paths));
    }

    async fn paths_changed(&self, source_ids: Vec<SourceId>) {
        self.send(Notification::PathsChanged(source_ids));
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Batch {
    source_ids: Vec<SourceId>,
    id_paths: Vec<IdPaths>,
}

impl Batch {
    fn add(&mut self, notification: Notification) {
        match notification {
            Notification::PathsChanged(source_ids) => self.source_ids.extend(source_ids),
            Notification::PathsWithIdsChanged(id_paths) => self.id_paths.extend(id_paths),
        }
    }

    fn finish(mut self) -> Self {
        self.source_ids.sort();
        self.source_ids.dedup();
        self
    }
}

/// Run scoped passes for queued notifications until every [`QueueNotifier`]
/// is dropped. Failed passes are logged; the next notification retries.
pub async fn run_notification_loop(
    updater: Arc<ProjectStorageUpdater>,
    mut queue: NotificationQueue,
    coalesce: Duration,
) {
    while let Some(first) = queue.rx.recv().await {
        if !coalesce.is_zero() {
            tokio::time::sleep(coalesce).await;
        }
        let mut batch = Batch::default();
        batch.add(first);
        while let Ok(next) = queue.rx.try_recv() {
            batch.add(next);
        }
        let batch = batch.finish();

        if !batch.id_paths.is_empty() {
            match updater.paths_with_ids_changed(&batch.id_paths).await {
                Ok(report) => tracing::info!(documents = report.documents_parsed, "Applied watched changes"),
                Err(err) => tracing::error!(error = ?err, "Failed to apply watched changes"),
            }
        }
        if !batch.source_ids.is_empty() {
            match updater.paths_changed(&batch.source_ids).await {
                Ok(report) => tracing::info!(
                    changed = batch.source_ids.len(),
                    documents = report.documents_parsed,
                    removed = report.removed_sources,
                    "Applied file changes"
                ),
                Err(err) => tracing::error!(error = ?err, "Failed to apply file changes"),
            }
        }
    }
    tracing::debug!("Notification queue closed");
}
