mod declarations;
mod document;
mod qmldir;
mod qmltypes;
mod version;

pub use self::declarations::{Enumeration, Enumerator, Function, Parameter, Property};
pub use self::document::{Import, ImportKind, QmlDocument};
pub use self::qmldir::{Component, ModuleImport, Plugin, QmlDir, Script};
pub use self::qmltypes::{AccessSemantics, Export, QmlTypes, TypeInfo};
pub use self::version::Version;
