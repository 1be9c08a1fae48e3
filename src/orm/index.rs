use std::sync::Arc;

use crate::connection::{Connection, IndexDescription, IndexParams};
use crate::error::OrmResult;

/// A similarity-search index built over one field of a collection.
#[derive(Clone)]
pub struct Index {
    collection_name: String,
    conn: Arc<dyn Connection>,
    description: IndexDescription,
}

impl Index {
    pub(crate) fn new(collection_name: String, conn: Arc<dyn Connection>, description: IndexDescription) -> Self {
        Self {
            collection_name,
            conn,
            description,
        }
    }

    pub fn name(&self) -> &str {
        &self.description.index_name
    }

    pub fn params(&self) -> &IndexParams {
        &self.description.params
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn field_name(&self) -> &str {
        &self.description.field_name
    }

    pub async fn drop(&self) -> OrmResult<()> {
        tracing::info!("Dropping index '{}' on '{}'", self.name(), self.collection_name);
        self.conn
            .drop_index(&self.collection_name, &self.description.index_name)
            .await?;
        Ok(())
    }
}
