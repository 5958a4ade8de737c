//! Member declarations shared by QML documents and qmltypes components.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    /// Element type for lists, e.g. `Item` for `list<Item>`
    pub type_name: String,
    pub is_readonly: bool,
    pub is_list: bool,
    pub is_pointer: bool,
    pub is_required: bool,
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    /// Empty when the declaration is untyped
    pub type_name: String,
}

/// A method, JavaScript function or signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub return_type: Option<String>,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumerator {
    pub name: String,
    pub value: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    pub name: String,
    pub enumerators: Vec<Enumerator>,
}
