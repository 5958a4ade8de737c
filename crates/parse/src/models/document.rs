use super::{Enumeration, Function, Property, Version};

/// What an `import` statement in a QML document refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    /// `import QtQuick.Controls 2.15`
    Module(String),
    /// `import "../components"`, relative to the document's directory
    Directory(String),
    /// `import "logic.js" as Logic`
    Script(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub kind: ImportKind,
    pub version: Version,
    pub alias: Option<String>,
}

/// The declarations of a QML document that matter to the type database.
///
/// Only the root object is inspected; bindings and child objects carry no
/// type information for the component itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QmlDocument {
    pub imports: Vec<Import>,
    /// Type name of the root object, possibly qualified (`Controls.Button`)
    pub prototype: String,
    /// Set by `pragma Singleton`
    pub is_singleton: bool,
    pub default_property: Option<String>,
    pub properties: Vec<Property>,
    pub functions: Vec<Function>,
    pub signals: Vec<Function>,
    pub enumerations: Vec<Enumeration>,
}
