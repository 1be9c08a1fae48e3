pub mod milvus;
pub mod registry;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::CollectionDescription;
use crate::types::{DataType, Sample};

pub use milvus::MilvusConnection;
pub use registry::{ConnectionConfig, Connections, DEFAULT_ALIAS};

/// Remote operations the object model relies on. Failures are returned unchanged
/// to the caller, implementations neither retry nor suppress them.
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    async fn has_collection(&self, name: &str) -> Result<bool>;
    async fn describe_collection(&self, name: &str) -> Result<CollectionDescription>;
    async fn create_collection(&self, name: &str, schema: &CollectionDescription) -> Result<()>;
    async fn drop_collection(&self, name: &str) -> Result<()>;
    async fn get_collection_stats(&self, name: &str) -> Result<CollectionStats>;
    async fn load_collection(&self, name: &str) -> Result<()>;
    async fn release_collection(&self, name: &str) -> Result<()>;

    async fn insert(&self, collection: &str, request: &InsertRequest) -> Result<InsertResult>;
    async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<SearchHit>>;

    async fn list_partitions(&self, collection: &str) -> Result<Vec<String>>;
    async fn has_partition(&self, collection: &str, partition: &str) -> Result<bool>;
    async fn create_partition(&self, collection: &str, partition: &str) -> Result<()>;
    async fn drop_partition(&self, collection: &str, partition: &str) -> Result<()>;
    async fn get_partition_stats(&self, collection: &str, partition: &str) -> Result<CollectionStats>;
    async fn load_partitions(&self, collection: &str, partitions: &[String]) -> Result<()>;
    async fn release_partitions(&self, collection: &str, partitions: &[String]) -> Result<()>;

    async fn create_index(&self, collection: &str, index: &IndexDescription) -> Result<()>;
    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexDescription>>;
    async fn drop_index(&self, collection: &str, index_name: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub row_count: i64,
}

/// Values for one field, in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldData {
    pub name: String,
    pub dtype: DataType,
    pub values: Vec<Sample>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertRequest {
    pub partition_name: Option<String>,
    pub columns: Vec<FieldData>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertResult {
    pub insert_count: i64,
    pub ids: Vec<Value>,
}

/// Index algorithm, metric and algorithm-specific parameters, e.g.
/// `IVF_FLAT` / `L2` / `{"nlist": 1024}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexParams {
    pub index_type: String,
    pub metric_type: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl IndexParams {
    pub fn new(index_type: impl Into<String>, metric_type: impl Into<String>) -> Self {
        Self {
            index_type: index_type.into(),
            metric_type: metric_type.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDescription {
    pub index_name: String,
    pub field_name: String,
    pub params: IndexParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub anns_field: String,
    /// Field whose value is reported as the hit id.
    pub primary_field: String,
    pub vectors: Vec<Sample>,
    pub limit: usize,
    pub params: Map<String, Value>,
    pub expr: Option<String>,
    pub partition_names: Vec<String>,
    pub output_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: Value,
    pub distance: f32,
    pub fields: Map<String, Value>,
}
