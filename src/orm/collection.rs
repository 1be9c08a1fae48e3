use std::sync::Arc;

use serde_json::{Map, Value};

use super::{Index, Partition};
use crate::connection::{
    Connection, FieldData, IndexDescription, IndexParams, InsertRequest, InsertResult, SearchHit,
    SearchRequest,
};
use crate::error::{OrmError, OrmResult};
use crate::schema::{CollectionSchema, Column, DataFrame};
use crate::types::{infer_dtype, is_integer_datatype, map_element_type_to_datatype, DataType, Sample};

/// How to open a collection that may or may not exist on the server yet.
#[derive(Debug, Clone, Default)]
pub struct CollectionOptions {
    /// Expected schema; reconciled against the server when the collection exists.
    pub schema: Option<CollectionSchema>,
    /// Rows to insert once the collection is available.
    pub data: Option<DataFrame>,
    /// Primary column when the schema is inferred from `data`.
    pub primary_field: Option<String>,
    pub auto_id: Option<bool>,
}

impl CollectionOptions {
    pub fn with_schema(schema: CollectionSchema) -> Self {
        Self {
            schema: Some(schema),
            ..Default::default()
        }
    }
}

/// Local handle for a remote collection.
#[derive(Clone)]
pub struct Collection {
    name: String,
    schema: CollectionSchema,
    conn: Arc<dyn Connection>,
}

impl Collection {
    /// Opens `name`, creating it when it does not exist.
    ///
    /// An existing collection keeps its server schema; a schema passed in
    /// `options` must then match it field for field. A new collection is created
    /// from the given schema, or from one inferred from `options.data`.
    pub async fn open(conn: Arc<dyn Connection>, name: &str, options: CollectionOptions) -> OrmResult<Self> {
        let CollectionOptions {
            schema,
            data,
            primary_field,
            auto_id,
        } = options;

        let exists = conn.has_collection(name).await?;
        let (schema, data) = if exists {
            let remote = conn.describe_collection(name).await?;
            let schema = match schema {
                None => CollectionSchema::from_description(&remote)?,
                Some(schema) => {
                    if !schema.is_compatible_with(&remote) {
                        return Err(OrmError::IncompatibleSchema(name.to_string()));
                    }
                    tracing::info!("Collection '{}' already exists with a matching schema", name);
                    schema
                }
            };
            (schema, data)
        } else {
            match (schema, data) {
                (Some(schema), data) => (schema, data),
                (None, Some(data)) => {
                    let primary_field = primary_field
                        .ok_or_else(|| OrmError::MissingPrimaryField(name.to_string()))?;
                    let schema = CollectionSchema::from_dataframe(&data, &primary_field, auto_id)?;
                    // Generated ids replace the primary column of the initial rows.
                    let data = if schema.auto_id() {
                        tracing::debug!("Dropping column '{}' from initial rows of '{}'", primary_field, name);
                        data.without_column(&primary_field)
                    } else {
                        data
                    };
                    (schema, Some(data))
                }
                (None, None) => return Err(OrmError::MissingSchema(name.to_string())),
            }
        };

        // Initial rows are checked before anything is created remotely.
        let columns = data
            .as_ref()
            .map(|data| field_columns(name, &schema, data))
            .transpose()?;

        if !exists {
            tracing::info!("Creating collection '{}': {}", name, schema);
            conn.create_collection(name, &schema.to_description()).await?;
        }

        let collection = Self {
            name: name.to_string(),
            schema,
            conn,
        };

        if let Some(columns) = columns {
            collection.insert_columns(columns, None).await?;
        }

        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    pub fn description(&self) -> &str {
        self.schema.description()
    }

    pub(crate) fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    pub async fn num_entities(&self) -> OrmResult<i64> {
        let stats = self.conn.get_collection_stats(&self.name).await?;
        Ok(stats.row_count)
    }

    pub async fn is_empty(&self) -> OrmResult<bool> {
        Ok(self.num_entities().await? == 0)
    }

    /// Drops the collection after dropping its indexes.
    pub async fn drop(self) -> OrmResult<()> {
        let indexes = self.indexes().await?;
        futures::future::try_join_all(indexes.iter().map(|index| index.drop())).await?;

        tracing::info!("Dropping collection '{}'", self.name);
        self.conn.drop_collection(&self.name).await?;
        Ok(())
    }

    pub async fn load(&self) -> OrmResult<()> {
        self.conn.load_collection(&self.name).await?;
        Ok(())
    }

    pub async fn release(&self) -> OrmResult<()> {
        self.conn.release_collection(&self.name).await?;
        Ok(())
    }

    /// Inserts column-oriented data. Columns map to schema fields by position and must
    /// carry the field's name; the primary column is left out when ids are generated
    /// by the server.
    pub async fn insert(&self, data: &DataFrame, partition: Option<&str>) -> OrmResult<InsertResult> {
        let columns = field_columns(&self.name, &self.schema, data)?;
        self.insert_columns(columns, partition).await
    }

    async fn insert_columns(&self, columns: Vec<FieldData>, partition: Option<&str>) -> OrmResult<InsertResult> {
        tracing::debug!(
            "Inserting {} rows into '{}' (partition: {:?})",
            columns.first().map(|c| c.values.len()).unwrap_or(0),
            self.name,
            partition
        );
        let request = InsertRequest {
            partition_name: partition.map(str::to_string),
            columns,
        };
        Ok(self.conn.insert(&self.name, &request).await?)
    }

    /// Vector similarity search over `anns_field`, optionally filtered by `expr`. Hits
    /// carry the values of `output_fields`.
    pub async fn search(
        &self,
        vectors: Vec<Sample>,
        anns_field: &str,
        params: Map<String, Value>,
        limit: usize,
        expr: Option<&str>,
        output_fields: &[&str],
    ) -> OrmResult<Vec<SearchHit>> {
        self.search_partitions(vectors, anns_field, params, limit, expr, output_fields, Vec::new())
            .await
    }

    pub(crate) async fn search_partitions(
        &self,
        vectors: Vec<Sample>,
        anns_field: &str,
        params: Map<String, Value>,
        limit: usize,
        expr: Option<&str>,
        output_fields: &[&str],
        partition_names: Vec<String>,
    ) -> OrmResult<Vec<SearchHit>> {
        let field = self
            .schema
            .field(anns_field)
            .filter(|f| f.dtype().is_vector())
            .ok_or_else(|| OrmError::FieldNotFound {
                collection: self.name.clone(),
                field: anns_field.to_string(),
            })?;

        if let Some(missing) = output_fields.iter().find(|f| self.schema.field(f).is_none()) {
            return Err(OrmError::FieldNotFound {
                collection: self.name.clone(),
                field: missing.to_string(),
            });
        }

        let request = SearchRequest {
            anns_field: field.name().to_string(),
            primary_field: self.schema.primary_field().name().to_string(),
            vectors,
            limit,
            params,
            expr: expr.map(str::to_string),
            partition_names,
            output_fields: output_fields.iter().map(|f| f.to_string()).collect(),
        };
        Ok(self.conn.search(&self.name, &request).await?)
    }

    pub async fn partitions(&self) -> OrmResult<Vec<Partition>> {
        let names = self.conn.list_partitions(&self.name).await?;
        Ok(names
            .into_iter()
            .map(|name| Partition::new(self.clone(), name))
            .collect())
    }

    /// Returns the named partition, creating it when absent.
    pub async fn partition(&self, name: &str) -> OrmResult<Partition> {
        if !self.conn.has_partition(&self.name, name).await? {
            tracing::info!("Creating partition '{}' in '{}'", name, self.name);
            self.conn.create_partition(&self.name, name).await?;
        }
        Ok(Partition::new(self.clone(), name.to_string()))
    }

    pub async fn has_partition(&self, name: &str) -> OrmResult<bool> {
        Ok(self.conn.has_partition(&self.name, name).await?)
    }

    pub async fn drop_partition(&self, name: &str) -> OrmResult<()> {
        self.conn.drop_partition(&self.name, name).await?;
        Ok(())
    }

    pub async fn indexes(&self) -> OrmResult<Vec<Index>> {
        let indexes = self.conn.list_indexes(&self.name).await?;
        Ok(indexes
            .into_iter()
            .map(|description| Index::new(self.name.clone(), self.conn.clone(), description))
            .collect())
    }

    /// Looks up an index by its exact name.
    pub async fn index(&self, index_name: &str) -> OrmResult<Index> {
        self.indexes()
            .await?
            .into_iter()
            .find(|index| index.name() == index_name)
            .ok_or_else(|| OrmError::IndexNotFound {
                collection: self.name.clone(),
                index: index_name.to_string(),
            })
    }

    pub async fn create_index(
        &self,
        field_name: &str,
        params: IndexParams,
        index_name: &str,
    ) -> OrmResult<Index> {
        if self.schema.field(field_name).is_none() {
            return Err(OrmError::FieldNotFound {
                collection: self.name.clone(),
                field: field_name.to_string(),
            });
        }

        let description = IndexDescription {
            index_name: index_name.to_string(),
            field_name: field_name.to_string(),
            params,
        };
        tracing::info!(
            "Creating {} index '{}' on '{}.{}'",
            description.params.index_type,
            index_name,
            self.name,
            field_name
        );
        self.conn.create_index(&self.name, &description).await?;
        Ok(Index::new(self.name.clone(), self.conn.clone(), description))
    }

    pub async fn has_index(&self, index_name: &str) -> OrmResult<bool> {
        match self.index(index_name).await {
            Ok(_) => Ok(true),
            Err(OrmError::IndexNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn drop_index(&self, index_name: &str) -> OrmResult<()> {
        self.index(index_name).await?.drop().await
    }
}

/// Pairs each column with the insertable field at its position.
fn field_columns(collection: &str, schema: &CollectionSchema, data: &DataFrame) -> OrmResult<Vec<FieldData>> {
    data.check_rectangular()?;

    let fields: Vec<_> = schema.insertable_fields().collect();
    if fields.len() != data.num_columns() {
        return Err(OrmError::DataColumnMismatch {
            collection: collection.to_string(),
            expected: fields.len(),
            actual: data.num_columns(),
        });
    }

    fields
        .iter()
        .zip(&data.columns)
        .map(|(field, column)| {
            if column.name != field.name() {
                return Err(OrmError::ColumnNameMismatch {
                    collection: collection.to_string(),
                    column: column.name.clone(),
                    field: field.name().to_string(),
                });
            }
            if let Some(actual) = column_dtype(column) {
                if !accepts(field.dtype(), actual) {
                    return Err(OrmError::ColumnTypeMismatch {
                        collection: collection.to_string(),
                        column: column.name.clone(),
                        expected: field.dtype(),
                        actual,
                    });
                }
            }
            Ok(FieldData {
                name: field.name().to_string(),
                dtype: field.dtype(),
                values: column.values.clone(),
            })
        })
        .collect()
}

/// Declared type of a column, or the type of its first value when undeclared.
/// `None` for an undeclared column without rows.
fn column_dtype(column: &Column) -> Option<DataType> {
    match map_element_type_to_datatype(column.element_type) {
        DataType::Unknown => column.values.first().map(infer_dtype),
        dtype => Some(dtype),
    }
}

fn accepts(field: DataType, column: DataType) -> bool {
    let is_real = |dtype| matches!(dtype, DataType::Float | DataType::Double);
    field == column
        || (is_integer_datatype(field) && is_integer_datatype(column))
        || (is_real(field) && is_real(column))
}
