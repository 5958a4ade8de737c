//! Records exchanged with the project storage.

use crate::ids::{ModuleId, ProjectPartId, SourceContextId, SourceId, TypeId};

/// Where a module comes from, which also keeps same-named modules apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleKind {
    /// Declared by a `module` line in a qmldir.
    QmlLibrary = 1,
    /// Exported by a qmltypes file.
    CppLibrary = 2,
    /// The implicit module of a directory, named after its path.
    PathLibrary = 3,
}
impl ModuleKind {
    pub(crate) fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            1 => Some(Self::QmlLibrary),
            2 => Some(Self::CppLibrary),
            3 => Some(Self::PathLibrary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Module {
    pub name: String,
    pub kind: ModuleKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub source_id: SourceId,
    pub source_context_id: SourceContextId,
    pub name: String,
}

/// Import or export version. Stored as `-1` for each missing part.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: Option<u32>,
    pub minor: Option<u32>,
}
impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.major, self.minor) {
            (Some(major), Some(minor)) => write!(f, "{major}.{minor}"),
            (Some(major), None) => write!(f, "{major}"),
            _ => Ok(()),
        }
    }
}
impl Version {
    pub const NONE: Self = Self { major: None, minor: None };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major: Some(major), minor: Some(minor) }
    }

    pub(crate) fn to_columns(self) -> (i64, i64) {
        (self.major.map_or(-1, i64::from), self.minor.map_or(-1, i64::from))
    }

    pub(crate) fn from_columns(major: i64, minor: i64) -> Option<Self> {
        let part = |value: i64| match value {
            -1 => Some(None),
            value => u32::try_from(value).ok().map(Some),
        };
        Some(Self { major: part(major)?, minor: part(minor)? })
    }
}

/// Fingerprint of a file as last seen by an update pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStatus {
    pub source_id: SourceId,
    pub size: i64,
    /// Milliseconds since the Unix epoch.
    pub last_modified: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileType {
    QmlDocument = 1,
    QmlTypes = 2,
}
impl FileType {
    pub(crate) fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            1 => Some(Self::QmlDocument),
            2 => Some(Self::QmlTypes),
            _ => None,
        }
    }
}

/// Membership of a file in a directory (or qmltypes) project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectData {
    pub project_source_id: SourceId,
    pub source_id: SourceId,
    pub module_id: Option<ModuleId>,
    pub file_type: FileType,
    pub project_part_id: ProjectPartId,
}

/// How much of a stored type a synchronization replaces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ChangeLevel {
    #[default]
    Full,
    /// Replace the declaration but keep the exports already stored.
    ExcludeExportedTypes,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AccessSemantics {
    #[default]
    Reference,
    Value,
    Sequence,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTraits {
    pub access: AccessSemantics,
    pub is_singleton: bool,
    pub is_creatable: bool,
}
impl Default for TypeTraits {
    fn default() -> Self {
        Self { access: AccessSemantics::Reference, is_singleton: false, is_creatable: true }
    }
}
impl TypeTraits {
    const SINGLETON: i64 = 1 << 2;
    const CREATABLE: i64 = 1 << 3;

    pub(crate) fn to_bits(self) -> i64 {
        let access = match self.access {
            AccessSemantics::Reference => 0,
            AccessSemantics::Value => 1,
            AccessSemantics::Sequence => 2,
            AccessSemantics::None => 3,
        };
        let mut bits = access;
        if self.is_singleton {
            bits |= Self::SINGLETON;
        }
        if self.is_creatable {
            bits |= Self::CREATABLE;
        }
        bits
    }

    pub(crate) fn from_bits(bits: i64) -> Self {
        let access = match bits & 0b11 {
            0 => AccessSemantics::Reference,
            1 => AccessSemantics::Value,
            2 => AccessSemantics::Sequence,
            _ => AccessSemantics::None,
        };
        Self {
            access,
            is_singleton: bits & Self::SINGLETON != 0,
            is_creatable: bits & Self::CREATABLE != 0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PropertyTraits {
    pub is_readonly: bool,
    pub is_list: bool,
    pub is_pointer: bool,
    pub is_required: bool,
    pub is_default: bool,
}
impl PropertyTraits {
    pub(crate) fn to_bits(self) -> u32 {
        [self.is_readonly, self.is_list, self.is_pointer, self.is_required, self.is_default]
            .iter()
            .enumerate()
            .fold(0, |bits, (i, set)| if *set { bits | (1 << i) } else { bits })
    }

    pub(crate) fn from_bits(bits: u32) -> Self {
        let set = |i: u32| bits & (1 << i) != 0;
        Self {
            is_readonly: set(0),
            is_list: set(1),
            is_pointer: set(2),
            is_required: set(3),
            is_default: set(4),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDeclaration {
    pub name: String,
    pub type_name: String,
    pub traits: PropertyTraits,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDeclaration {
    pub name: String,
    pub type_name: String,
}

/// A method or a signal. Signals never carry a return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub return_type: Option<String>,
    pub parameters: Vec<ParameterDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumeratorDeclaration {
    pub name: String,
    pub value: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationDeclaration {
    pub name: String,
    pub enumerators: Vec<EnumeratorDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportedType {
    pub module_id: ModuleId,
    pub name: String,
    pub version: Version,
}

/// A type declared by a source, either a QML document or one component of a
/// qmltypes file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub source_id: SourceId,
    pub name: String,
    pub prototype: Option<String>,
    pub extension: Option<String>,
    pub default_property: Option<String>,
    pub traits: TypeTraits,
    pub properties: Vec<PropertyDeclaration>,
    pub functions: Vec<FunctionDeclaration>,
    pub signals: Vec<FunctionDeclaration>,
    pub enumerations: Vec<EnumerationDeclaration>,
    pub exported_types: Vec<ExportedType>,
    pub change_level: ChangeLevel,
}
impl Type {
    pub fn new(source_id: SourceId, name: impl Into<String>) -> Self {
        Self {
            source_id,
            name: name.into(),
            prototype: None,
            extension: None,
            default_property: None,
            traits: TypeTraits::default(),
            properties: Vec::new(),
            functions: Vec::new(),
            signals: Vec::new(),
            enumerations: Vec::new(),
            exported_types: Vec::new(),
            change_level: ChangeLevel::Full,
        }
    }
}

/// A document `import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub source_id: SourceId,
    pub module_id: ModuleId,
    pub version: Version,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependencyKind {
    /// qmldir `import`: the imported module is visible to users of this one.
    Import = 1,
    /// qmldir `depends` or qmltypes `dependencies`.
    Depends = 2,
}
impl DependencyKind {
    pub(crate) fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            1 => Some(Self::Import),
            2 => Some(Self::Depends),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDependency {
    pub source_id: SourceId,
    pub module_id: ModuleId,
    pub version: Version,
    pub kind: DependencyKind,
}

/// A type as stored, with the id the storage assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRecord {
    pub type_id: TypeId,
    pub source_id: SourceId,
    pub name: String,
    pub prototype: Option<String>,
    pub extension: Option<String>,
    pub default_property: Option<String>,
    pub traits: TypeTraits,
    pub properties: Vec<PropertyDeclaration>,
    pub functions: Vec<FunctionDeclaration>,
    pub signals: Vec<FunctionDeclaration>,
    pub enumerations: Vec<EnumerationDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedTypeRecord {
    pub module_id: ModuleId,
    pub name: String,
    pub version: Version,
    pub type_id: TypeId,
}

/// Sorted dump of everything `synchronize` writes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub file_statuses: Vec<FileStatus>,
    pub project_datas: Vec<ProjectData>,
    pub types: Vec<TypeRecord>,
    pub exported_types: Vec<ExportedTypeRecord>,
    pub imports: Vec<Import>,
    pub module_dependencies: Vec<ModuleDependency>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Version::NONE, (-1, -1))]
    #[case(Version { major: Some(2), minor: None }, (2, -1))]
    #[case(Version::new(6, 5), (6, 5))]
    fn test_version_columns(#[case] version: Version, #[case] columns: (i64, i64)) {
        assert_eq!(version.to_columns(), columns);
        assert_eq!(Version::from_columns(columns.0, columns.1), Some(version));
    }

    #[rstest]
    #[case(Version::NONE, "")]
    #[case(Version { major: Some(2), minor: None }, "2")]
    #[case(Version::new(6, 5), "6.5")]
    fn test_version_display(#[case] version: Version, #[case] expected: &str) {
        assert_eq!(version.to_string(), expected);
    }

    #[test]
    fn test_version_rejects_garbage() {
        assert_eq!(Version::from_columns(-7, 0), None);
    }

    #[test]
    fn test_type_traits_bits() {
        let traits = TypeTraits { access: AccessSemantics::Value, is_singleton: true, is_creatable: false };
        assert_eq!(traits.to_bits(), 0b0101);
        assert_eq!(TypeTraits::from_bits(traits.to_bits()), traits);
        assert_eq!(TypeTraits::from_bits(TypeTraits::default().to_bits()), TypeTraits::default());
    }

    #[test]
    fn test_property_traits_bits() {
        let traits = PropertyTraits { is_readonly: true, is_required: true, ..Default::default() };
        assert_eq!(traits.to_bits(), 0b01001);
        assert_eq!(PropertyTraits::from_bits(0b01001), traits);
    }
}
