use derive_more::Display;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DiagnosticKind {
    /// The path could not be read or inspected; it counts as missing for
    /// this pass.
    #[display("unreadable")]
    Io,
    /// The file could not be parsed; its previous records are kept.
    #[display("parse error")]
    Parse,
    /// A later qmldir or qmltypes declaration exported a name and version
    /// that an earlier one already claimed.
    #[display("shadowed export")]
    Shadowed,
    #[display("invalid path")]
    InvalidPath,
}

/// A per-file problem that did not stop the pass.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{}: {kind}: {message}", path.display())]
pub struct Diagnostic {
    pub path: PathBuf,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Outcome of one or more update passes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub diagnostics: Vec<Diagnostic>,
    pub documents_parsed: usize,
    pub type_infos_parsed: usize,
    /// Sources forgotten by the storage.
    pub removed_sources: usize,
}

impl UpdateReport {
    pub fn merge(&mut self, other: UpdateReport) {
        self.diagnostics.extend(other.diagnostics);
        self.documents_parsed += other.documents_parsed;
        self.type_infos_parsed += other.type_infos_parsed;
        self.removed_sources += other.removed_sources;
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}
