use super::{Enumeration, Function, ModuleImport, Property, Version};

/// A parsed `*.qmltypes` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QmlTypes {
    pub dependencies: Vec<ModuleImport>,
    pub components: Vec<TypeInfo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessSemantics {
    #[default]
    Reference,
    Value,
    Sequence,
    None,
}

/// `"Module/Name major.minor"` from a component's `exports` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub module: String,
    pub name: String,
    pub version: Version,
}

/// One `Component { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// C++ name of the type
    pub name: String,
    pub prototype: Option<String>,
    pub extension: Option<String>,
    pub attached_type: Option<String>,
    pub default_property: Option<String>,
    pub access_semantics: AccessSemantics,
    pub is_singleton: bool,
    pub is_creatable: bool,
    pub exports: Vec<Export>,
    pub properties: Vec<Property>,
    pub methods: Vec<Function>,
    pub signals: Vec<Function>,
    pub enumerations: Vec<Enumeration>,
}
impl TypeInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prototype: None,
            extension: None,
            attached_type: None,
            default_property: None,
            access_semantics: AccessSemantics::default(),
            is_singleton: false,
            is_creatable: true,
            exports: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            signals: Vec::new(),
            enumerations: Vec::new(),
        }
    }
}
