//! Incremental synchronization of QML sources into the project storage.
//!
//! [`ProjectStorageUpdater::update`] walks a project part's directories and
//! explicit qmltypes files, re-parses only what changed on disk and commits
//! the result in one transaction. A [`PathWatcher`] is then told what to
//! watch; its notifications feed back into scoped passes through
//! [`ProjectStorageUpdater::paths_changed`].

mod convert;
pub mod error;
mod file_status;
mod ids_data;
mod notify_watcher;
mod parser;
mod path_cache;
mod queue;
mod state;
mod updater;
mod watcher;

pub use crate::file_status::FileStatusCache;
pub use crate::ids_data::SourceIdsData;
pub use crate::notify_watcher::NotifyPathWatcher;
pub use crate::parser::{DocumentParser, QmlDocumentParser, QmlTypesParser, TypesParser};
pub use crate::path_cache::{DIRECTORY_SOURCE_NAME, PathCache};
pub use crate::queue::{Notification, NotificationQueue, QueueNotifier, run_notification_loop};
pub use crate::state::{FileState, classify};
pub use crate::updater::{Diagnostic, DiagnosticKind, ProjectStorageUpdater, UpdateReport};
pub use crate::watcher::{
    IdPaths, InMemoryPathWatcher, NotifierHandle, PathWatcher, PathWatcherNotifier, ProjectChunkId, SourceType,
    WatcherHandle,
};
