//! Configuration error types.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Only `.toml`, `.yaml`/`.yml` and `.json` files are understood.
    #[display("unsupported configuration format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// A source could not be read or a value has the wrong shape.
    #[display("invalid configuration")]
    Extract,
    #[display("{field} must be an absolute path: {}", path.display())]
    RelativePath { field: &'static str, path: PathBuf },
    #[display("invalid value for {_0}")]
    InvalidValue(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed. Configuration errors never
    /// go away without someone editing the configuration.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
