//! Updater error types.
//!
//! Only whole-pass failures surface here. Per-file problems (unreadable or
//! unparsable files) never abort a pass; they end up as
//! [`Diagnostic`](crate::Diagnostic)s in the pass report.

use derive_more::{Display, Error};

/// An updater error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for updater operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Reading from or committing to the project storage failed. Nothing of
    /// the pass was written and the watch set was left alone.
    #[display("project storage error")]
    Storage,
    #[display("path interner error")]
    PathCache,
    #[display("invalid path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    #[display("invalid project part: {_0}")]
    InvalidScope(#[error(not(source))] i64),
    #[display("path watcher error")]
    Watcher,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::PathCache | Self::Watcher)
    }
}
