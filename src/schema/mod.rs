pub mod dataframe;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{InferenceError, SchemaError};
use crate::types::DataType;

pub use dataframe::{infer_fields_from_dataframe, Column, DataFrame};

const DIM_PARAM: &str = "dim";

/// Structural description of one field, as exchanged with the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub dtype: DataType,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_id: Option<bool>,
}

/// Structural description of a collection schema, as exchanged with the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDescription {
    #[serde(default)]
    pub auto_id: bool,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<FieldDescription>,
}

/// Type parameters a field may carry. Only vector fields accept any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeParams {
    pub dim: Option<i64>,
}

impl TypeParams {
    pub fn with_dim(dim: i64) -> Self {
        Self { dim: Some(dim) }
    }

    /// Parses a parameter map, rejecting keys that are not recognised.
    pub fn from_map(field: &str, dtype: DataType, map: &Map<String, Value>) -> Result<Self, SchemaError> {
        let mut params = TypeParams::default();
        for (key, value) in map {
            match key.as_str() {
                DIM_PARAM => params.dim = Some(parse_dim(field, dtype, value)?),
                _ => {
                    return Err(SchemaError::UnknownTypeParam {
                        field: field.to_string(),
                        key: key.clone(),
                    })
                }
            }
        }
        Ok(params)
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(dim) = self.dim {
            map.insert(DIM_PARAM.to_string(), Value::from(dim));
        }
        map
    }

    fn validate(&self, field: &str, dtype: DataType) -> Result<(), SchemaError> {
        let invalid_dim = |reason: &str| SchemaError::InvalidDimension {
            field: field.to_string(),
            dtype,
            reason: reason.to_string(),
        };

        if !dtype.is_vector() {
            return match self.dim {
                Some(_) => Err(SchemaError::TypeParamNotSupported {
                    field: field.to_string(),
                    key: DIM_PARAM.to_string(),
                    dtype,
                }),
                None => Ok(()),
            };
        }

        match self.dim {
            None => Err(invalid_dim("vector fields require 'dim'")),
            Some(dim) if dim <= 0 => Err(invalid_dim("must be positive")),
            Some(dim) if dtype == DataType::BinaryVector && dim % 8 != 0 => {
                Err(invalid_dim("must be a multiple of 8"))
            }
            Some(_) => Ok(()),
        }
    }
}

// The server reports params as strings, locally built descriptions use numbers.
fn parse_dim(field: &str, dtype: DataType, value: &Value) -> Result<i64, SchemaError> {
    let dim = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    dim.ok_or_else(|| SchemaError::InvalidDimension {
        field: field.to_string(),
        dtype,
        reason: format!("not an integer: {value}"),
    })
}

/// One named column of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    name: String,
    dtype: DataType,
    description: String,
    is_primary: bool,
    auto_id: Option<bool>,
    type_params: TypeParams,
}

impl FieldSchema {
    pub fn builder(name: impl Into<String>, dtype: DataType) -> FieldSchemaBuilder {
        FieldSchemaBuilder {
            name: name.into(),
            dtype,
            description: String::new(),
            is_primary: false,
            auto_id: None,
            type_params: TypeParams::default(),
        }
    }

    pub fn to_builder(&self) -> FieldSchemaBuilder {
        FieldSchemaBuilder {
            name: self.name.clone(),
            dtype: self.dtype,
            description: self.description.clone(),
            is_primary: self.is_primary,
            auto_id: self.auto_id,
            type_params: self.type_params.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn auto_id(&self) -> Option<bool> {
        self.auto_id
    }

    pub fn type_params(&self) -> &TypeParams {
        &self.type_params
    }

    pub fn dim(&self) -> Option<i64> {
        self.type_params.dim
    }

    pub fn get_type_param(&self, key: &str) -> Option<Value> {
        self.type_params.to_map().remove(key)
    }

    pub fn from_description(raw: &FieldDescription) -> Result<Self, SchemaError> {
        let type_params = TypeParams::from_map(&raw.name, raw.dtype, &raw.params)?;
        let mut builder = FieldSchema::builder(raw.name.clone(), raw.dtype)
            .description(raw.description.clone())
            .primary(raw.is_primary)
            .type_params(type_params);
        if let Some(auto_id) = raw.auto_id {
            builder = builder.auto_id(auto_id);
        }
        builder.build()
    }

    pub fn to_description(&self) -> FieldDescription {
        FieldDescription {
            name: self.name.clone(),
            description: self.description.clone(),
            dtype: self.dtype,
            params: self.type_params.to_map(),
            is_primary: self.is_primary,
            auto_id: self.auto_id,
        }
    }

    pub fn construct_from_dict(raw: &Value) -> Result<Self, SchemaError> {
        let raw = FieldDescription::deserialize(raw)?;
        Self::from_description(&raw)
    }

    pub fn to_dict(&self) -> Result<Value, SchemaError> {
        Ok(serde_json::to_value(self.to_description())?)
    }
}

#[derive(Debug, Clone)]
pub struct FieldSchemaBuilder {
    name: String,
    dtype: DataType,
    description: String,
    is_primary: bool,
    auto_id: Option<bool>,
    type_params: TypeParams,
}

impl FieldSchemaBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    pub fn auto_id(mut self, auto_id: bool) -> Self {
        self.auto_id = Some(auto_id);
        self
    }

    pub fn dim(mut self, dim: i64) -> Self {
        self.type_params.dim = Some(dim);
        self
    }

    pub fn type_params(mut self, type_params: TypeParams) -> Self {
        self.type_params = type_params;
        self
    }

    pub fn build(self) -> Result<FieldSchema, SchemaError> {
        if matches!(self.dtype, DataType::Unknown | DataType::None) {
            return Err(SchemaError::UnsupportedDataType(self.dtype));
        }
        if self.auto_id == Some(true) && !self.is_primary {
            return Err(SchemaError::AutoIdWithoutPrimary(self.name));
        }
        self.type_params.validate(&self.name, self.dtype)?;

        Ok(FieldSchema {
            name: self.name,
            dtype: self.dtype,
            description: self.description,
            is_primary: self.is_primary,
            auto_id: self.auto_id,
            type_params: self.type_params,
        })
    }
}

/// Ordered fields of a collection. Field order fixes column positions for inserts.
#[derive(Debug, Clone)]
pub struct CollectionSchema {
    fields: Vec<FieldSchema>,
    description: String,
    primary: usize,
    auto_id: bool,
}

impl CollectionSchema {
    pub fn new(fields: Vec<FieldSchema>, description: impl Into<String>) -> Result<Self, SchemaError> {
        Self::with_auto_id(fields, description, None)
    }

    /// Builds a schema, checking the schema-level `auto_id` against the primary field's.
    pub fn with_auto_id(
        mut fields: Vec<FieldSchema>,
        description: impl Into<String>,
        auto_id: Option<bool>,
    ) -> Result<Self, SchemaError> {
        let primaries: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_primary)
            .map(|(i, _)| i)
            .collect();

        let primary = match primaries.as_slice() {
            [] => return Err(SchemaError::NoPrimaryField),
            [index] => *index,
            _ => {
                return Err(SchemaError::MultiplePrimaryFields(
                    primaries.iter().map(|&i| fields[i].name.clone()).collect(),
                ))
            }
        };

        let field = &mut fields[primary];
        if field.dtype != DataType::Int64 {
            return Err(SchemaError::PrimaryFieldType {
                field: field.name.clone(),
                dtype: field.dtype,
            });
        }

        let auto_id = match (auto_id, field.auto_id) {
            (Some(schema), Some(declared)) if schema != declared => {
                return Err(SchemaError::AutoIdMismatch {
                    field: field.name.clone(),
                    schema,
                    declared,
                })
            }
            (Some(schema), None) => {
                field.auto_id = Some(schema);
                schema
            }
            (_, declared) => declared.unwrap_or(false),
        };

        Ok(Self {
            fields,
            description: description.into(),
            primary,
            auto_id,
        })
    }

    /// Infers fields from tabular data and designates `primary_field` as the primary key.
    pub fn from_dataframe(
        data: &DataFrame,
        primary_field: &str,
        auto_id: Option<bool>,
    ) -> Result<Self, InferenceError> {
        let mut fields = infer_fields_from_dataframe(data)?;
        let field = fields
            .iter_mut()
            .find(|f| f.name == primary_field)
            .ok_or_else(|| SchemaError::PrimaryFieldNotFound {
                field: primary_field.to_string(),
            })?;
        *field = field.to_builder().primary(true).build()?;

        Ok(Self::with_auto_id(fields, "", auto_id)?)
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn primary_field(&self) -> &FieldSchema {
        &self.fields[self.primary]
    }

    pub fn auto_id(&self) -> bool {
        self.auto_id
    }

    /// Fields the caller supplies values for on insert.
    pub fn insertable_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        let skip_primary = self.auto_id;
        self.fields
            .iter()
            .filter(move |f| !(skip_primary && f.is_primary))
    }

    /// Derived flags are recomputed, the description's own `auto_id` is not trusted.
    pub fn from_description(raw: &CollectionDescription) -> Result<Self, SchemaError> {
        let fields = raw
            .fields
            .iter()
            .map(FieldSchema::from_description)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(fields, raw.description.clone())
    }

    pub fn to_description(&self) -> CollectionDescription {
        CollectionDescription {
            auto_id: self.auto_id,
            description: self.description.clone(),
            fields: self.fields.iter().map(FieldSchema::to_description).collect(),
        }
    }

    pub fn construct_from_dict(raw: &Value) -> Result<Self, SchemaError> {
        let raw = CollectionDescription::deserialize(raw)?;
        Self::from_description(&raw)
    }

    pub fn to_dict(&self) -> Result<Value, SchemaError> {
        Ok(serde_json::to_value(self.to_description())?)
    }

    /// Checks this schema against one reported by the server. Fields are matched by
    /// `(name, type, is_primary)`, not by position.
    pub fn is_compatible_with(&self, remote: &CollectionDescription) -> bool {
        if self.fields.len() != remote.fields.len() {
            tracing::debug!(
                local = self.fields.len(),
                remote = remote.fields.len(),
                "field count differs from remote schema"
            );
            return false;
        }

        self.fields.iter().all(|local| {
            let found = remote.fields.iter().any(|r| {
                r.name == local.name && r.dtype == local.dtype && r.is_primary == local.is_primary
            });
            if !found {
                tracing::debug!(field = %local.name, "field not present in remote schema");
            }
            found
        })
    }
}

impl PartialEq for CollectionSchema {
    fn eq(&self, other: &Self) -> bool {
        self.to_description() == other.to_description()
    }
}

impl fmt::Display for CollectionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.to_description()).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn id_field() -> FieldSchemaBuilder {
        FieldSchema::builder("id", DataType::Int64).primary(true)
    }

    fn float_field() -> FieldSchema {
        FieldSchema::builder("score", DataType::Float).build().unwrap()
    }

    fn vector_field() -> FieldSchema {
        FieldSchema::builder("embedding", DataType::FloatVector)
            .dim(128)
            .description("embeddings")
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_auto_id_and_primary() {
        let schema = CollectionSchema::new(vec![id_field().build().unwrap(), float_field()], "").unwrap();
        assert!(!schema.auto_id());
        assert_eq!(schema.primary_field().name(), "id");
    }

    #[test]
    fn test_rejects_two_primaries() {
        let other = FieldSchema::builder("other", DataType::Int64).primary(true).build().unwrap();
        let err = CollectionSchema::new(vec![id_field().build().unwrap(), other], "").unwrap_err();
        assert!(matches!(err, SchemaError::MultiplePrimaryFields(names) if names == ["id", "other"]));
    }

    #[test]
    fn test_rejects_no_primary() {
        let err = CollectionSchema::new(vec![float_field()], "").unwrap_err();
        assert!(matches!(err, SchemaError::NoPrimaryField));

        let err = CollectionSchema::new(vec![], "").unwrap_err();
        assert!(matches!(err, SchemaError::NoPrimaryField));
    }

    #[test]
    fn test_rejects_string_primary() {
        let pk = FieldSchema::builder("pk", DataType::String).primary(true).build().unwrap();
        let err = CollectionSchema::new(vec![pk], "").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::PrimaryFieldType { dtype: DataType::String, .. }
        ));
    }

    #[test]
    fn test_auto_id_requires_primary() {
        let err = FieldSchema::builder("x", DataType::Int64).auto_id(true).build().unwrap_err();
        assert!(matches!(err, SchemaError::AutoIdWithoutPrimary(name) if name == "x"));

        // auto_id = false on a non-primary field is harmless
        FieldSchema::builder("x", DataType::Int64).auto_id(false).build().unwrap();
    }

    #[test]
    fn test_auto_id_override() {
        let schema =
            CollectionSchema::with_auto_id(vec![id_field().build().unwrap()], "", Some(true)).unwrap();
        assert!(schema.auto_id());
        assert_eq!(schema.primary_field().auto_id(), Some(true));

        let schema =
            CollectionSchema::with_auto_id(vec![id_field().auto_id(true).build().unwrap()], "", None)
                .unwrap();
        assert!(schema.auto_id());

        let err = CollectionSchema::with_auto_id(
            vec![id_field().auto_id(false).build().unwrap()],
            "",
            Some(true),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::AutoIdMismatch { schema: true, declared: false, .. }
        ));
    }

    #[test]
    fn test_rejects_unknown_dtype() {
        let err = FieldSchema::builder("x", DataType::Unknown).build().unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedDataType(DataType::Unknown)));
    }

    #[test]
    fn test_type_params() {
        let field = vector_field();
        assert_eq!(field.get_type_param("dim"), Some(json!(128)));
        assert_eq!(field.get_type_param("nlist"), None);

        let err = FieldSchema::builder("v", DataType::FloatVector).build().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDimension { .. }));

        let err = FieldSchema::builder("v", DataType::BinaryVector).dim(12).build().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDimension { .. }));

        let err = FieldSchema::builder("n", DataType::Int32).dim(8).build().unwrap_err();
        assert!(matches!(err, SchemaError::TypeParamNotSupported { .. }));
    }

    #[test]
    fn test_unknown_type_param_rejected() {
        let raw = json!({
            "name": "v",
            "type": 101,
            "params": {"dim": 8, "metric": "L2"},
        });
        let err = FieldSchema::construct_from_dict(&raw).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTypeParam { key, .. } if key == "metric"));
    }

    #[test]
    fn test_unknown_type_code_rejected() {
        let raw = json!({"name": "v", "type": 42});
        let err = FieldSchema::construct_from_dict(&raw).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed(_)));
    }

    #[test]
    fn test_to_dict_shape() {
        let schema = CollectionSchema::new(
            vec![id_field().build().unwrap(), vector_field()],
            "test collection",
        )
        .unwrap();

        assert_eq!(
            schema.to_dict().unwrap(),
            json!({
                "auto_id": false,
                "description": "test collection",
                "fields": [
                    {"name": "id", "description": "", "type": 5, "is_primary": true},
                    {"name": "embedding", "description": "embeddings", "type": 101, "params": {"dim": 128}},
                ]
            })
        );
    }

    #[test]
    fn test_dict_round_trip() {
        let schema = CollectionSchema::with_auto_id(
            vec![id_field().build().unwrap(), float_field(), vector_field()],
            "round trip",
            Some(true),
        )
        .unwrap();

        let restored = CollectionSchema::construct_from_dict(&schema.to_dict().unwrap()).unwrap();
        assert_eq!(restored.to_dict().unwrap(), schema.to_dict().unwrap());
        assert_eq!(restored, schema);
        assert!(restored.auto_id());
    }

    #[test]
    fn test_field_to_dict() {
        let field = FieldSchema::builder("bits", DataType::BinaryVector)
            .dim(16)
            .build()
            .unwrap();
        assert_eq!(
            field.to_dict().unwrap(),
            json!({"name": "bits", "description": "", "type": 100, "params": {"dim": 16}})
        );
    }

    #[test]
    fn test_dim_from_server_string() {
        let raw = json!({"name": "v", "type": 100, "params": {"dim": "64"}});
        let field = FieldSchema::construct_from_dict(&raw).unwrap();
        assert_eq!(field.dim(), Some(64));
    }

    #[test]
    fn test_compatible_with_remote() {
        let remote: CollectionDescription = serde_json::from_value(json!({
            "fields": [{"name": "id", "type": 5, "is_primary": true}]
        }))
        .unwrap();

        let local = CollectionSchema::new(vec![id_field().build().unwrap()], "").unwrap();
        assert!(local.is_compatible_with(&remote));

        // the primary key must be INT64, so change a non-primary remote field instead
        let remote_two: CollectionDescription = serde_json::from_value(json!({
            "fields": [
                {"name": "score", "type": 10},
                {"name": "id", "type": 5, "is_primary": true},
            ]
        }))
        .unwrap();
        let local = CollectionSchema::new(vec![id_field().build().unwrap(), float_field()], "").unwrap();
        assert!(local.is_compatible_with(&remote_two));

        let wrong_type = FieldSchema::builder("score", DataType::Double).build().unwrap();
        let local = CollectionSchema::new(vec![id_field().build().unwrap(), wrong_type], "").unwrap();
        assert!(!local.is_compatible_with(&remote_two));

        let local = CollectionSchema::new(vec![id_field().build().unwrap()], "").unwrap();
        assert!(!local.is_compatible_with(&remote_two));
    }

    #[test]
    fn test_from_dataframe_designates_primary() {
        use crate::types::{ElementType, Sample, Scalar};

        let data = DataFrame::new(vec![
            Column::new("id", ElementType::Int64, vec![Scalar::Int64(1).into()]),
            Column::new("v", ElementType::Object, vec![Sample::float_vector(&[0.0, 1.0])]),
        ]);

        let schema = CollectionSchema::from_dataframe(&data, "id", Some(true)).unwrap();
        assert_eq!(schema.primary_field().name(), "id");
        assert!(schema.auto_id());
        assert_eq!(schema.field("v").and_then(FieldSchema::dim), Some(2));

        let err = CollectionSchema::from_dataframe(&data, "missing", None).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::Schema(SchemaError::PrimaryFieldNotFound { .. })
        ));

        let err = CollectionSchema::from_dataframe(&data, "v", None).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::Schema(SchemaError::PrimaryFieldType { .. })
        ));
    }

    #[test]
    fn test_incompatible_when_primary_type_differs() {
        let local = CollectionSchema::new(vec![id_field().build().unwrap()], "").unwrap();

        let remote: CollectionDescription = serde_json::from_value(json!({
            "fields": [{"name": "id", "type": 10, "is_primary": true}]
        }))
        .unwrap();
        assert!(!local.is_compatible_with(&remote));

        let remote: CollectionDescription = serde_json::from_value(json!({
            "fields": [{"name": "id", "type": 5}]
        }))
        .unwrap();
        assert!(!local.is_compatible_with(&remote));
    }
}
