//! Object model for a remote Milvus vector database: typed schemas, schema
//! inference from tabular data, and collection / partition / index handles that
//! forward each operation to a server connection.

pub mod connection;
pub mod error;
pub mod orm;
pub mod schema;
pub mod types;

pub use connection::{Connection, ConnectionConfig, Connections, IndexParams, DEFAULT_ALIAS};
pub use error::{InferenceError, OrmError, OrmResult, SchemaError};
pub use orm::{Collection, CollectionOptions, Index, Partition};
pub use schema::{CollectionSchema, Column, DataFrame, FieldSchema, TypeParams};
pub use types::{DataType, ElementType, Sample, Scalar};
