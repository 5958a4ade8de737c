//! Project storage error types.
//!
//! Errors are built with `exn` so every `or_raise` adds a frame with its
//! location. Callers match on [`ErrorKind`] to decide what to do next.

use derive_more::{Display, Error};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    #[display("module not found: {_0}")]
    ModuleNotFound(#[error(not(source))] i64),
    /// Serialization/deserialization error for the named field.
    #[display("invalid project storage data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Only plain database errors qualify: a busy or locked database clears
    /// up once the other writer commits.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database)
    }
}
