//! Parser Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A parse error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for parse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Every parser in this crate is a pure function of its input, so none of
/// these are worth retrying: the file has to change first.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input is not well formed.
    #[display("line {line}: {message}")]
    Syntax {
        /// 1-based line number where the problem was detected.
        line: usize,
        /// What was expected or found.
        message: String,
    },
    /// A version literal could not be parsed.
    #[display("invalid version: {_0}")]
    InvalidVersion(#[error(not(source))] String),
    /// A required binding or declaration is missing.
    #[display("missing required field: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    /// A QML document without a root object declaration.
    #[display("document has no root object")]
    MissingRootObject,
}

impl ErrorKind {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax { line, message: message.into() }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
