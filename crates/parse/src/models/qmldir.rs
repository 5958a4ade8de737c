use super::Version;

/// A parsed `qmldir` module descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QmlDir {
    /// Module identifier from the `module` line
    pub module: Option<String>,
    /// Component declarations in declaration order
    pub components: Vec<Component>,
    pub scripts: Vec<Script>,
    pub plugins: Vec<Plugin>,
    pub class_name: Option<String>,
    /// `typeinfo` file names, relative to the qmldir's directory
    pub type_infos: Vec<String>,
    /// `import` lines: modules re-exported to importers of this module
    pub imports: Vec<ModuleImport>,
    /// `depends` lines
    pub dependencies: Vec<ModuleImport>,
    pub designer_supported: bool,
    pub is_static: bool,
    pub is_system: bool,
    pub prefer: Option<String>,
    pub link_target: Option<String>,
}

/// One `[singleton] Type version File.qml` or `internal Type File.qml` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub type_name: String,
    pub file_name: String,
    pub version: Version,
    pub singleton: bool,
    /// Internal components are usable inside the module but never exported.
    pub internal: bool,
}

/// A JavaScript resource: `Name version File.js`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub name: String,
    pub file_name: String,
    pub version: Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    pub name: String,
    pub path: Option<String>,
    pub optional: bool,
}

/// A module reference from `import`/`depends` lines or qmltypes dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImport {
    pub module: String,
    pub version: Version,
    /// `import Foo auto`: use the importing module's own version
    pub auto: bool,
    pub optional: bool,
}
impl ModuleImport {
    pub fn new(module: impl Into<String>, version: Version) -> Self {
        Self {
            module: module.into(),
            version,
            auto: false,
            optional: false,
        }
    }
}
