use thiserror::Error;

use crate::types::DataType;

/// Local, deterministic failures raised while building a field or collection schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Unsupported data type: {0:?}")]
    UnsupportedDataType(DataType),

    #[error("Unknown data type code: {0}")]
    UnknownTypeCode(i32),

    #[error("Unknown type parameter '{key}' for field '{field}'")]
    UnknownTypeParam { field: String, key: String },

    #[error("Type parameter '{key}' is not supported by {dtype:?} field '{field}'")]
    TypeParamNotSupported {
        field: String,
        key: String,
        dtype: DataType,
    },

    #[error("Invalid dimension for {dtype:?} field '{field}': {reason}")]
    InvalidDimension {
        field: String,
        dtype: DataType,
        reason: String,
    },

    #[error("Field '{0}' sets auto_id but is not the primary field")]
    AutoIdWithoutPrimary(String),

    #[error("Schema must have exactly one primary field, found none")]
    NoPrimaryField,

    #[error("Schema must have exactly one primary field, found {}: {}", .0.len(), .0.join(", "))]
    MultiplePrimaryFields(Vec<String>),

    #[error("Primary field '{field}' must be of type INT64, got {dtype:?}")]
    PrimaryFieldType { field: String, dtype: DataType },

    #[error("Primary field '{field}' not found in schema")]
    PrimaryFieldNotFound { field: String },

    #[error("auto_id mismatch: schema declares {schema}, primary field '{field}' declares {declared}")]
    AutoIdMismatch {
        field: String,
        schema: bool,
        declared: bool,
    },

    #[error("Malformed schema description: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failures raised while inferring field types from sample data.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Cannot infer schema from empty data")]
    EmptyData,

    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Cannot infer schema, unable to determine type of column(s): {}", .0.join(", "))]
    UnresolvedColumns(Vec<String>),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors surfaced by the collection, partition and index proxies.
#[derive(Debug, Error)]
pub enum OrmError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("The collection '{0}' already exists, but its schema differs from the one passed in")]
    IncompatibleSchema(String),

    #[error("Collection '{0}' does not exist and no schema or data was provided")]
    MissingSchema(String),

    #[error("A primary field name is required to build a schema from data for collection '{0}'")]
    MissingPrimaryField(String),

    #[error("Insert data has {actual} columns, collection '{collection}' expects {expected}")]
    DataColumnMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("Insert column '{column}' is in the position of field '{field}' of collection '{collection}'")]
    ColumnNameMismatch {
        collection: String,
        column: String,
        field: String,
    },

    #[error("Insert column '{column}' holds {actual:?} values, field of collection '{collection}' is {expected:?}")]
    ColumnTypeMismatch {
        collection: String,
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("Index '{index}' not found on collection '{collection}'")]
    IndexNotFound { collection: String, index: String },

    #[error("Field '{field}' not found on collection '{collection}'")]
    FieldNotFound { collection: String, field: String },

    #[error("Connection alias '{0}' is not registered")]
    ConnectionNotFound(String),

    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

pub type OrmResult<T> = std::result::Result<T, OrmError>;
