//! Parsed models to storage records.

use qmlsync_parse::models as parsed;
use qmlsync_store::ids::SourceId;
use qmlsync_store::types::{
    AccessSemantics, EnumerationDeclaration, EnumeratorDeclaration, ExportedType, FunctionDeclaration,
    ParameterDeclaration, PropertyDeclaration, PropertyTraits, Type, TypeTraits, Version,
};

pub(crate) fn version(version: parsed::Version) -> Version {
    Version { major: version.major, minor: version.minor }
}

fn property(property: &parsed::Property) -> PropertyDeclaration {
    PropertyDeclaration {
        name: property.name.clone(),
        type_name: property.type_name.clone(),
        traits: PropertyTraits {
            is_readonly: property.is_readonly,
            is_list: property.is_list,
            is_pointer: property.is_pointer,
            is_required: property.is_required,
            is_default: property.is_default,
        },
    }
}

fn function(function: &parsed::Function) -> FunctionDeclaration {
    FunctionDeclaration {
        name: function.name.clone(),
        return_type: function.return_type.clone(),
        parameters: function
            .parameters
            .iter()
            .map(|p| ParameterDeclaration { name: p.name.clone(), type_name: p.type_name.clone() })
            .collect(),
    }
}

fn enumeration(enumeration: &parsed::Enumeration) -> EnumerationDeclaration {
    EnumerationDeclaration {
        name: enumeration.name.clone(),
        enumerators: enumeration
            .enumerators
            .iter()
            .map(|e| EnumeratorDeclaration { name: e.name.clone(), value: e.value })
            .collect(),
    }
}

fn access(access: parsed::AccessSemantics) -> AccessSemantics {
    match access {
        parsed::AccessSemantics::Reference => AccessSemantics::Reference,
        parsed::AccessSemantics::Value => AccessSemantics::Value,
        parsed::AccessSemantics::Sequence => AccessSemantics::Sequence,
        parsed::AccessSemantics::None => AccessSemantics::None,
    }
}

/// The type a component document declares. Documents are always reference
/// types; `singleton` comes from the qmldir declaration, which counts as
/// much as `pragma Singleton`.
pub(crate) fn document_type(
    source_id: SourceId,
    type_name: &str,
    document: &parsed::QmlDocument,
    singleton: bool,
    exported_types: Vec<ExportedType>,
) -> Type {
    let mut ty = Type::new(source_id, type_name);
    ty.prototype = Some(document.prototype.clone());
    ty.default_property = document.default_property.clone();
    ty.traits = TypeTraits {
        access: AccessSemantics::Reference,
        is_singleton: singleton || document.is_singleton,
        is_creatable: true,
    };
    ty.properties = document.properties.iter().map(property).collect();
    ty.functions = document.functions.iter().map(function).collect();
    ty.signals = document.signals.iter().map(function).collect();
    ty.enumerations = document.enumerations.iter().map(enumeration).collect();
    ty.exported_types = exported_types;
    ty
}

/// One component of a qmltypes file, with its exports already resolved to
/// module ids.
pub(crate) fn type_info_type(source_id: SourceId, info: &parsed::TypeInfo, exported_types: Vec<ExportedType>) -> Type {
    let mut ty = Type::new(source_id, info.name.as_str());
    ty.prototype = info.prototype.clone();
    ty.extension = info.extension.clone();
    ty.default_property = info.default_property.clone();
    ty.traits = TypeTraits {
        access: access(info.access_semantics),
        is_singleton: info.is_singleton,
        is_creatable: info.is_creatable,
    };
    ty.properties = info.properties.iter().map(property).collect();
    ty.functions = info.methods.iter().map(function).collect();
    ty.signals = info.signals.iter().map(function).collect();
    ty.enumerations = info.enumerations.iter().map(enumeration).collect();
    ty.exported_types = exported_types;
    ty
}
