//! `*.qmltypes` parser.
//!
//! Reads the object tree produced by the type registrar (a `Module` root with
//! `Component` children) into [`QmlTypes`]. Unknown bindings and child
//! objects are ignored so newer files still parse.

use crate::consts::EXPORT_REGEX;
use crate::error::{ErrorKind, Result};
use crate::models::{
    AccessSemantics, Enumeration, Enumerator, Export, Function, ModuleImport, Parameter, Property, QmlTypes, TypeInfo,
    Version,
};
use crate::object::{Object, Value, parse_document};
use exn::{OptionExt, ResultExt};

pub fn parse(text: &str) -> Result<QmlTypes> {
    let root = parse_document(text)?;
    if root.type_name != "Module" {
        exn::bail!(ErrorKind::syntax(root.line, format!("expected `Module` root object, found `{}`", root.type_name)));
    }
    let dependencies = match root.binding("dependencies") {
        Some(binding) => strings(&binding.value, binding.line)?
            .into_iter()
            .map(|dependency| module_dependency(&dependency, binding.line))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    let components = root.children_of_type("Component").map(type_info).collect::<Result<Vec<_>>>()?;
    Ok(QmlTypes { dependencies, components })
}

fn strings(value: &Value, line: usize) -> Result<Vec<String>> {
    match value {
        Value::Array(values) => values
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_raise(|| ErrorKind::syntax(line, "expected string list")))
            .collect(),
        _ => exn::bail!(ErrorKind::syntax(line, "expected string list")),
    }
}

/// `"QtQuick 2.0"` or `"QtQuick"`.
fn module_dependency(dependency: &str, line: usize) -> Result<ModuleImport> {
    let mut words = dependency.split_whitespace();
    let module = words.next().ok_or_raise(|| ErrorKind::syntax(line, "empty dependency"))?;
    let version = match words.next() {
        Some(version) => Version::parse(version).or_raise(|| ErrorKind::syntax(line, "invalid dependency version"))?,
        None => Version::NONE,
    };
    Ok(ModuleImport::new(module, version))
}

fn export(export: &str, line: usize) -> Result<Export> {
    let captures = EXPORT_REGEX
        .captures(export)
        .ok_or_raise(|| ErrorKind::syntax(line, format!("invalid export `{export}`")))?;
    let number = |index: usize| captures.get(index).and_then(|m| m.as_str().parse::<u32>().ok());
    Ok(Export {
        module: captures[1].to_string(),
        name: captures[2].to_string(),
        version: Version { major: number(3), minor: number(4) },
    })
}

fn type_info(component: &Object) -> Result<TypeInfo> {
    let name = component.string("name").ok_or_raise(|| ErrorKind::MissingField("name"))?;
    let mut info = TypeInfo::new(name);
    info.prototype = component.string("prototype");
    info.extension = component.string("extension");
    info.attached_type = component.string("attachedType");
    info.default_property = component.string("defaultProperty");
    info.is_singleton = component.bool("isSingleton").unwrap_or(false);
    info.is_creatable = component.bool("isCreatable").unwrap_or(true);
    info.access_semantics = match component.string("accessSemantics").as_deref() {
        Some("value") => AccessSemantics::Value,
        Some("sequence") => AccessSemantics::Sequence,
        Some("none") => AccessSemantics::None,
        _ => AccessSemantics::Reference,
    };
    if let Some(binding) = component.binding("exports") {
        info.exports = strings(&binding.value, binding.line)?
            .iter()
            .map(|e| export(e, binding.line))
            .collect::<Result<_>>()?;
    }
    for child in &component.children {
        match child.type_name.as_str() {
            "Property" => info.properties.push(property(child)?),
            "Method" => info.methods.push(function(child)?),
            "Signal" => info.signals.push(function(child)?),
            "Enum" => info.enumerations.push(enumeration(child)?),
            _ => {},
        }
    }
    Ok(info)
}

fn property(object: &Object) -> Result<Property> {
    Ok(Property {
        name: object.string("name").ok_or_raise(|| ErrorKind::MissingField("Property.name"))?,
        type_name: object.string("type").unwrap_or_default(),
        is_readonly: object.bool("isReadonly").unwrap_or(false),
        is_list: object.bool("isList").unwrap_or(false),
        is_pointer: object.bool("isPointer").unwrap_or(false),
        is_required: object.bool("isRequired").unwrap_or(false),
        is_default: false,
    })
}

fn function(object: &Object) -> Result<Function> {
    Ok(Function {
        name: object.string("name").ok_or_raise(|| ErrorKind::MissingField("Method.name"))?,
        return_type: object.string("type"),
        parameters: object
            .children_of_type("Parameter")
            .map(|parameter| Parameter {
                name: parameter.string("name").unwrap_or_default(),
                type_name: parameter.string("type").unwrap_or_default(),
            })
            .collect(),
    })
}

fn enumeration(object: &Object) -> Result<Enumeration> {
    let name = object.string("name").ok_or_raise(|| ErrorKind::MissingField("Enum.name"))?;
    let enumerators = match object.binding("values") {
        Some(binding) => match &binding.value {
            Value::Map(entries) => entries
                .iter()
                .map(|(name, value)| Enumerator { name: name.clone(), value: value.as_i64() })
                .collect(),
            value => strings(value, binding.line)?
                .into_iter()
                .map(|name| Enumerator { name, value: None })
                .collect(),
        },
        None => Vec::new(),
    };
    Ok(Enumeration { name, enumerators })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QMLTYPES: &str = r#"
import QtQuick.tooling 1.2

// This file describes the plugin-supplied types contained in the library.
Module {
    dependencies: ["QtQuick 2.0", "QtQml"]
    Component {
        file: "qquickitem.h"
        name: "QQuickItem"
        accessSemantics: "reference"
        prototype: "QObject"
        defaultProperty: "data"
        exports: ["QtQuick/Item 2.0", "QtQuick/Item 2.1", "QtQuick/Item 6.0"]
        exportMetaObjectRevisions: [512, 513, 1536]
        Enum {
            name: "TransformOrigin"
            values: ["TopLeft", "Top"]
        }
        Enum {
            name: "Flags"
            values: { "ItemClipsChildrenToShape": 1, "ItemAcceptsInputMethod": 2 }
        }
        Property { name: "parent"; type: "QQuickItem"; isPointer: true }
        Property { name: "children"; type: "QQuickItem"; isList: true; isReadonly: true }
        Signal {
            name: "childrenRectChanged"
            Parameter { type: "QRectF" }
        }
        Method {
            name: "mapToItem"
            type: "QPointF"
            Parameter { name: "item"; type: "QQuickItem"; isPointer: true }
            Parameter { name: "point"; type: "QPointF" }
        }
    }
    Component {
        name: "QQuickPalette"
        accessSemantics: "value"
        isCreatable: false
        isSingleton: true
    }
}
"#;

    #[test]
    fn test_parse() {
        let types = parse(QMLTYPES).unwrap();
        assert_eq!(
            types.dependencies,
            vec![ModuleImport::new("QtQuick", Version::new(2, 0)), ModuleImport::new("QtQml", Version::NONE)]
        );
        assert_eq!(types.components.len(), 2);

        let item = &types.components[0];
        assert_eq!(item.name, "QQuickItem");
        assert_eq!(item.prototype.as_deref(), Some("QObject"));
        assert_eq!(item.default_property.as_deref(), Some("data"));
        assert!(item.is_creatable);
        assert_eq!(item.exports.len(), 3);
        assert_eq!(
            item.exports[1],
            Export {
                module: "QtQuick".into(),
                name: "Item".into(),
                version: Version::new(2, 1),
            }
        );
        assert_eq!(item.enumerations[0].enumerators.len(), 2);
        assert_eq!(item.enumerations[0].enumerators[0].value, None);
        assert_eq!(item.enumerations[1].enumerators[1].value, Some(2));
        assert_eq!(item.properties.len(), 2);
        assert!(item.properties[0].is_pointer);
        assert!(item.properties[1].is_list && item.properties[1].is_readonly);
        assert_eq!(item.signals[0].parameters[0].type_name, "QRectF");
        assert_eq!(item.methods[0].return_type.as_deref(), Some("QPointF"));
        assert_eq!(item.methods[0].parameters[1].name, "point");

        let palette = &types.components[1];
        assert_eq!(palette.access_semantics, AccessSemantics::Value);
        assert!(palette.is_singleton);
        assert!(!palette.is_creatable);
        assert!(palette.exports.is_empty());
    }

    #[test]
    fn test_wrong_root() {
        let err = parse("Component { name: \"A\" }").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_missing_name() {
        let err = parse("Module { Component { prototype: \"QObject\" } }").unwrap_err();
        assert_eq!(*err, ErrorKind::MissingField("name"));
    }

    #[test]
    fn test_invalid_export() {
        let err = parse("Module {\n Component {\n name: \"A\"\n exports: [\"NoModule 1.0\"]\n }\n}").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Syntax { line: 4, .. }));
    }
}
