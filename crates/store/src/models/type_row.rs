use crate::error::{Error, ErrorKind};
use crate::ids::{ModuleId, SourceId, TypeId};
use crate::models::facet::{EnumerationProxy, FunctionProxy, PropertyProxy};
use crate::types::{ExportedTypeRecord, Type, TypeRecord, TypeTraits, Version};
use exn::{OptionExt, ResultExt};
use facet_json::{from_str as from_json, to_string as to_json};

#[derive(sqlx::FromRow)]
pub(crate) struct TypeRow {
    pub(crate) type_id: i64,
    pub(crate) source_id: i64,
    pub(crate) name: String,
    #[sqlx(default)]
    pub(crate) prototype: Option<String>,
    #[sqlx(default)]
    pub(crate) extension: Option<String>,
    #[sqlx(default)]
    pub(crate) default_property: Option<String>,
    pub(crate) traits: i64,
    pub(crate) properties: String,
    pub(crate) functions: String,
    pub(crate) signals: String,
    pub(crate) enumerations: String,
}
impl TryFrom<&Type> for TypeRow {
    type Error = Error;
    fn try_from(ty: &Type) -> Result<Self, Self::Error> {
        let properties = ty.properties.iter().map(PropertyProxy::from).collect::<Vec<_>>();
        let functions = ty.functions.iter().map(FunctionProxy::from).collect::<Vec<_>>();
        let signals = ty.signals.iter().map(FunctionProxy::from).collect::<Vec<_>>();
        let enumerations = ty.enumerations.iter().map(EnumerationProxy::from).collect::<Vec<_>>();
        Ok(Self {
            // Assigned by the database on insert.
            type_id: 0,
            source_id: ty.source_id.raw(),
            name: ty.name.clone(),
            prototype: ty.prototype.clone(),
            extension: ty.extension.clone(),
            default_property: ty.default_property.clone(),
            traits: ty.traits.to_bits(),
            properties: to_json(&properties).or_raise(|| ErrorKind::InvalidData("properties"))?,
            functions: to_json(&functions).or_raise(|| ErrorKind::InvalidData("functions"))?,
            signals: to_json(&signals).or_raise(|| ErrorKind::InvalidData("signals"))?,
            enumerations: to_json(&enumerations).or_raise(|| ErrorKind::InvalidData("enumerations"))?,
        })
    }
}
impl TryFrom<TypeRow> for TypeRecord {
    type Error = Error;
    fn try_from(row: TypeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            type_id: TypeId::new(row.type_id),
            source_id: SourceId::new(row.source_id),
            name: row.name,
            prototype: row.prototype,
            extension: row.extension,
            default_property: row.default_property,
            traits: TypeTraits::from_bits(row.traits),
            properties: from_json::<Vec<PropertyProxy>>(&row.properties)
                .or_raise(|| ErrorKind::InvalidData("properties"))?
                .into_iter()
                .map(Into::into)
                .collect(),
            functions: from_json::<Vec<FunctionProxy>>(&row.functions)
                .or_raise(|| ErrorKind::InvalidData("functions"))?
                .into_iter()
                .map(Into::into)
                .collect(),
            signals: from_json::<Vec<FunctionProxy>>(&row.signals)
                .or_raise(|| ErrorKind::InvalidData("signals"))?
                .into_iter()
                .map(Into::into)
                .collect(),
            enumerations: from_json::<Vec<EnumerationProxy>>(&row.enumerations)
                .or_raise(|| ErrorKind::InvalidData("enumerations"))?
                .into_iter()
                .map(Into::into)
                .collect(),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ExportedTypeRow {
    pub(crate) module_id: i64,
    pub(crate) name: String,
    pub(crate) major_version: i64,
    pub(crate) minor_version: i64,
    pub(crate) type_id: i64,
}
impl TryFrom<ExportedTypeRow> for ExportedTypeRecord {
    type Error = Error;
    fn try_from(row: ExportedTypeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            module_id: ModuleId::new(row.module_id),
            name: row.name,
            version: Version::from_columns(row.major_version, row.minor_version)
                .ok_or_raise(|| ErrorKind::InvalidData("export version"))?,
            type_id: TypeId::new(row.type_id),
        })
    }
}
