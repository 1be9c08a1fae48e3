use serde_json::{Map, Value};

use super::Collection;
use crate::connection::{InsertResult, SearchHit};
use crate::error::OrmResult;
use crate::schema::DataFrame;
use crate::types::Sample;

/// A named shard of a collection.
#[derive(Clone)]
pub struct Partition {
    collection: Collection,
    name: String,
}

impl Partition {
    pub(crate) fn new(collection: Collection, name: String) -> Self {
        Self { collection, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    pub async fn num_entities(&self) -> OrmResult<i64> {
        let stats = self
            .collection
            .connection()
            .get_partition_stats(self.collection.name(), &self.name)
            .await?;
        Ok(stats.row_count)
    }

    pub async fn is_empty(&self) -> OrmResult<bool> {
        Ok(self.num_entities().await? == 0)
    }

    pub async fn drop(self) -> OrmResult<()> {
        self.collection.drop_partition(&self.name).await
    }

    pub async fn load(&self) -> OrmResult<()> {
        self.collection
            .connection()
            .load_partitions(self.collection.name(), std::slice::from_ref(&self.name))
            .await?;
        Ok(())
    }

    pub async fn release(&self) -> OrmResult<()> {
        self.collection
            .connection()
            .release_partitions(self.collection.name(), std::slice::from_ref(&self.name))
            .await?;
        Ok(())
    }

    pub async fn insert(&self, data: &DataFrame) -> OrmResult<InsertResult> {
        self.collection.insert(data, Some(&self.name)).await
    }

    /// Search restricted to this partition.
    pub async fn search(
        &self,
        vectors: Vec<Sample>,
        anns_field: &str,
        params: Map<String, Value>,
        limit: usize,
        expr: Option<&str>,
        output_fields: &[&str],
    ) -> OrmResult<Vec<SearchHit>> {
        self.collection
            .search_partitions(
                vectors,
                anns_field,
                params,
                limit,
                expr,
                output_fields,
                vec![self.name.clone()],
            )
            .await
    }
}
