use crate::types::{
    EnumerationDeclaration, EnumeratorDeclaration, FunctionDeclaration, ParameterDeclaration, PropertyDeclaration,
    PropertyTraits,
};

#[derive(facet::Facet)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct PropertyProxy {
    #[facet(rename = "n")]
    name: String,
    #[facet(rename = "t")]
    type_name: String,
    #[facet(rename = "f")]
    traits: u32,
}
impl From<&PropertyDeclaration> for PropertyProxy {
    fn from(property: &PropertyDeclaration) -> Self {
        Self {
            name: property.name.clone(),
            type_name: property.type_name.clone(),
            traits: property.traits.to_bits(),
        }
    }
}
impl From<PropertyProxy> for PropertyDeclaration {
    fn from(property: PropertyProxy) -> Self {
        Self {
            name: property.name,
            type_name: property.type_name,
            traits: PropertyTraits::from_bits(property.traits),
        }
    }
}

#[derive(facet::Facet)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct ParameterProxy {
    #[facet(rename = "n")]
    name: String,
    #[facet(rename = "t")]
    type_name: String,
}

#[derive(facet::Facet)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct FunctionProxy {
    #[facet(rename = "n")]
    name: String,
    #[facet(rename = "r", default, transparent, skip_serializing_if = Option::is_none)]
    return_type: Option<String>,
    #[facet(rename = "p")]
    parameters: Vec<ParameterProxy>,
}
impl From<&FunctionDeclaration> for FunctionProxy {
    fn from(function: &FunctionDeclaration) -> Self {
        Self {
            name: function.name.clone(),
            return_type: function.return_type.clone(),
            parameters: function
                .parameters
                .iter()
                .map(|p| ParameterProxy { name: p.name.clone(), type_name: p.type_name.clone() })
                .collect(),
        }
    }
}
impl From<FunctionProxy> for FunctionDeclaration {
    fn from(function: FunctionProxy) -> Self {
        Self {
            name: function.name,
            return_type: function.return_type,
            parameters: function
                .parameters
                .into_iter()
                .map(|p| ParameterDeclaration { name: p.name, type_name: p.type_name })
                .collect(),
        }
    }
}

#[derive(facet::Facet)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct EnumeratorProxy {
    #[facet(rename = "n")]
    name: String,
    #[facet(rename = "v", default, transparent, skip_serializing_if = Option::is_none)]
    value: Option<i64>,
}

#[derive(facet::Facet)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct EnumerationProxy {
    #[facet(rename = "n")]
    name: String,
    #[facet(rename = "e")]
    enumerators: Vec<EnumeratorProxy>,
}
impl From<&EnumerationDeclaration> for EnumerationProxy {
    fn from(enumeration: &EnumerationDeclaration) -> Self {
        Self {
            name: enumeration.name.clone(),
            enumerators: enumeration
                .enumerators
                .iter()
                .map(|e| EnumeratorProxy { name: e.name.clone(), value: e.value })
                .collect(),
        }
    }
}
impl From<EnumerationProxy> for EnumerationDeclaration {
    fn from(enumeration: EnumerationProxy) -> Self {
        Self {
            name: enumeration.name,
            enumerators: enumeration
                .enumerators
                .into_iter()
                .map(|e| EnumeratorDeclaration { name: e.name, value: e.value })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_json::{from_str as from_json, to_string as to_json};
    use rstest::rstest;

    fn property(name: &str, type_name: &str, traits: u32) -> PropertyProxy {
        PropertyProxy { name: name.to_string(), type_name: type_name.to_string(), traits }
    }

    fn parameter(name: &str, type_name: &str) -> ParameterProxy {
        ParameterProxy { name: name.to_string(), type_name: type_name.to_string() }
    }

    #[rstest]
    #[case(property("count", "int", 0), r#"{"n":"count","t":"int","f":0}"#)]
    #[case(property("model", "QVariant", 9), r#"{"n":"model","t":"QVariant","f":9}"#)]
    fn test_property_serialize(#[case] input: PropertyProxy, #[case] expected: impl AsRef<str>) {
        let json = to_json(&input).unwrap();
        assert_eq!(json.as_str(), expected.as_ref());
    }

    #[rstest]
    #[case(
        FunctionProxy { name: "clicked".to_string(), return_type: None, parameters: vec![] },
        r#"{"n":"clicked","p":[]}"#
    )]
    #[case(
        FunctionProxy {
            name: "indexAt".to_string(),
            return_type: Some("int".to_string()),
            parameters: vec![parameter("x", "double"), parameter("y", "double")],
        },
        r#"{"n":"indexAt","r":"int","p":[{"n":"x","t":"double"},{"n":"y","t":"double"}]}"#
    )]
    fn test_function_serialize(#[case] input: FunctionProxy, #[case] expected: impl AsRef<str>) {
        let json = to_json(&input).unwrap();
        assert_eq!(json.as_str(), expected.as_ref());
    }

    #[rstest]
    #[case(
        r#"{"n":"clicked","p":[]}"#,
        FunctionProxy { name: "clicked".to_string(), return_type: None, parameters: vec![] }
    )]
    #[case(
        r#"{"n":"toggle","r":"bool","p":[{"n":"on","t":"bool"}]}"#,
        FunctionProxy {
            name: "toggle".to_string(),
            return_type: Some("bool".to_string()),
            parameters: vec![parameter("on", "bool")],
        }
    )]
    fn test_function_deserialize(#[case] input: impl AsRef<str>, #[case] expected: FunctionProxy) {
        let proxy: FunctionProxy = from_json(input.as_ref()).unwrap();
        assert_eq!(proxy, expected);
    }

    #[rstest]
    #[case(
        r#"{"n":"Mode","e":[{"n":"Idle"},{"n":"Busy","v":2}]}"#,
        EnumerationProxy {
            name: "Mode".to_string(),
            enumerators: vec![
                EnumeratorProxy { name: "Idle".to_string(), value: None },
                EnumeratorProxy { name: "Busy".to_string(), value: Some(2) },
            ],
        }
    )]
    fn test_enumeration_deserialize(#[case] input: impl AsRef<str>, #[case] expected: EnumerationProxy) {
        let proxy: EnumerationProxy = from_json(input.as_ref()).unwrap();
        assert_eq!(proxy, expected);
    }

    #[test]
    fn test_property_traits_survive() {
        let declaration = PropertyDeclaration {
            name: "contentItem".to_string(),
            type_name: "QQuickItem".to_string(),
            traits: PropertyTraits { is_pointer: true, is_default: true, ..Default::default() },
        };
        let proxy = PropertyProxy::from(&declaration);
        assert_eq!(PropertyDeclaration::from(proxy), declaration);
    }
}
