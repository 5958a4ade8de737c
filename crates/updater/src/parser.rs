//! Seams for the document and type-info parsers.
//!
//! Both are pure functions of the file text. The updater only talks to them
//! through these traits, which keeps parse counts observable in tests.

use qmlsync_parse::error::Result;
use qmlsync_parse::models::{QmlDocument, QmlTypes};

pub trait DocumentParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<QmlDocument>;
}

pub trait TypesParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<QmlTypes>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QmlDocumentParser;

impl DocumentParser for QmlDocumentParser {
    fn parse(&self, text: &str) -> Result<QmlDocument> {
        qmlsync_parse::parse_qml(text)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QmlTypesParser;

impl TypesParser for QmlTypesParser {
    fn parse(&self, text: &str) -> Result<QmlTypes> {
        qmlsync_parse::parse_qmltypes(text)
    }
}
