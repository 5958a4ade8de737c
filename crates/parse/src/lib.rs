//! Parsers for the three file kinds a QML module directory contains.
//!
//! All parsers are pure functions of the file content: no I/O, no shared
//! state, safe to call from any thread.

mod consts;
pub mod error;
mod lexer;
pub mod models;
mod object;
mod qml;
mod qmldir;
mod qmltypes;

use tracing::instrument;

use crate::error::Result;
use crate::models::{QmlDir, QmlDocument, QmlTypes};

/// Parse a `qmldir` module descriptor.
#[instrument(level = "debug", skip(text), fields(size = text.len()))]
pub fn parse_qmldir(text: &str) -> Result<QmlDir> {
    qmldir::parse(text)
}

/// Parse a `*.qmltypes` type-information file.
#[instrument(level = "debug", skip(text), fields(size = text.len()))]
pub fn parse_qmltypes(text: &str) -> Result<QmlTypes> {
    qmltypes::parse(text)
}

/// Parse a `*.qml` component document.
#[instrument(level = "debug", skip(text), fields(size = text.len()))]
pub fn parse_qml(text: &str) -> Result<QmlDocument> {
    qml::parse(text)
}
