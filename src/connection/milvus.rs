use super::{
    CollectionStats, Connection, FieldData, IndexDescription, IndexParams, InsertRequest, InsertResult,
    SearchHit, SearchRequest,
};
use crate::schema::{CollectionDescription, FieldDescription};
use crate::types::DataType;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Milvus client (using the v2 REST API)
pub struct MilvusConnection {
    client: Client,
    address: String,
}

/// Envelope wrapping every REST response; `code` is 0 on success.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct HasData {
    has: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsData {
    row_count: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertData {
    insert_count: i64,
    #[serde(default)]
    insert_ids: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestCollection {
    #[serde(default)]
    description: String,
    #[serde(default)]
    auto_id: bool,
    fields: Vec<RestField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestField {
    name: String,
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    primary_key: bool,
    #[serde(default)]
    auto_id: bool,
    #[serde(default)]
    params: Vec<RestParam>,
}

#[derive(Debug, Deserialize)]
struct RestParam {
    key: String,
    value: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCollectionRequest<'a> {
    collection_name: &'a str,
    schema: RestSchema<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RestSchema<'a> {
    auto_id: bool,
    description: &'a str,
    fields: Vec<RestFieldSpec<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RestFieldSpec<'a> {
    field_name: &'a str,
    data_type: &'static str,
    description: &'a str,
    is_primary: bool,
    #[serde(skip_serializing_if = "Map::is_empty")]
    element_type_params: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestIndex {
    field_name: String,
    index_name: String,
    #[serde(default)]
    index_type: String,
    #[serde(default)]
    metric_type: String,
    #[serde(default)]
    params: Map<String, Value>,
}

impl MilvusConnection {
    pub fn new(address: &str) -> Self {
        Self {
            client: Client::new(),
            address: address.trim_end_matches('/').to_string(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/vectordb/{}", self.address, path)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<Option<T>> {
        tracing::debug!("Milvus request: {}", path);

        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Milvus API error ({}): {}", status, body);
        }

        let api_response: ApiResponse<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", path))?;

        if api_response.code != 0 {
            anyhow::bail!("Milvus API error ({}): {}", api_response.code, api_response.message);
        }

        Ok(api_response.data)
    }

    async fn post_unit(&self, path: &str, body: &Value) -> Result<()> {
        self.post::<Value>(path, body).await?;
        Ok(())
    }
}

fn to_field_description(field: RestField) -> Result<FieldDescription> {
    let dtype = DataType::from_rest_name(&field.data_type)
        .with_context(|| format!("Unsupported field type '{}' for field '{}'", field.data_type, field.name))?;

    // Only vector dimensions are modelled locally; server-side extras are dropped.
    let params = field
        .params
        .into_iter()
        .filter(|p| p.key == "dim")
        .map(|p| (p.key, p.value))
        .collect();

    Ok(FieldDescription {
        name: field.name,
        description: field.description,
        dtype,
        params,
        is_primary: field.primary_key,
        auto_id: field.primary_key.then_some(field.auto_id),
    })
}

fn to_rows(columns: &[FieldData]) -> Result<Vec<Value>> {
    let num_rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
    if let Some(ragged) = columns.iter().find(|c| c.values.len() != num_rows) {
        anyhow::bail!(
            "Column '{}' has {} rows, expected {}",
            ragged.name,
            ragged.values.len(),
            num_rows
        );
    }

    let rows = (0..num_rows)
        .map(|row| {
            let entity: Map<String, Value> = columns
                .iter()
                .map(|c| (c.name.clone(), c.values[row].to_json()))
                .collect();
            Value::Object(entity)
        })
        .collect();
    Ok(rows)
}

fn to_search_hit(mut entity: Map<String, Value>, primary_field: &str) -> SearchHit {
    let distance = entity
        .remove("distance")
        .and_then(|d| d.as_f64())
        .unwrap_or_default() as f32;
    let id = entity.remove(primary_field).unwrap_or(Value::Null);
    SearchHit {
        id,
        distance,
        fields: entity,
    }
}

#[async_trait::async_trait]
impl Connection for MilvusConnection {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        let data: Option<HasData> = self
            .post("collections/has", &json!({ "collectionName": name }))
            .await?;
        Ok(data.unwrap_or_default().has)
    }

    async fn describe_collection(&self, name: &str) -> Result<CollectionDescription> {
        let data: RestCollection = self
            .post("collections/describe", &json!({ "collectionName": name }))
            .await?
            .with_context(|| format!("Empty describe response for collection '{}'", name))?;

        let fields = data
            .fields
            .into_iter()
            .map(to_field_description)
            .collect::<Result<Vec<_>>>()?;

        Ok(CollectionDescription {
            auto_id: data.auto_id,
            description: data.description,
            fields,
        })
    }

    async fn create_collection(&self, name: &str, schema: &CollectionDescription) -> Result<()> {
        let request = CreateCollectionRequest {
            collection_name: name,
            schema: RestSchema {
                auto_id: schema.auto_id,
                description: &schema.description,
                fields: schema
                    .fields
                    .iter()
                    .map(|f| RestFieldSpec {
                        field_name: &f.name,
                        data_type: f.dtype.rest_name(),
                        description: &f.description,
                        is_primary: f.is_primary,
                        element_type_params: f.params.clone(),
                    })
                    .collect(),
            },
        };

        let body = serde_json::to_value(&request).context("Failed to encode create collection request")?;
        self.post_unit("collections/create", &body).await
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.post_unit("collections/drop", &json!({ "collectionName": name }))
            .await
    }

    async fn get_collection_stats(&self, name: &str) -> Result<CollectionStats> {
        let data: Option<StatsData> = self
            .post("collections/get_stats", &json!({ "collectionName": name }))
            .await?;
        Ok(CollectionStats {
            row_count: data.unwrap_or_default().row_count,
        })
    }

    async fn load_collection(&self, name: &str) -> Result<()> {
        self.post_unit("collections/load", &json!({ "collectionName": name }))
            .await
    }

    async fn release_collection(&self, name: &str) -> Result<()> {
        self.post_unit("collections/release", &json!({ "collectionName": name }))
            .await
    }

    async fn insert(&self, collection: &str, request: &InsertRequest) -> Result<InsertResult> {
        let mut body = json!({
            "collectionName": collection,
            "data": to_rows(&request.columns)?,
        });
        if let Some(partition) = &request.partition_name {
            body["partitionName"] = json!(partition);
        }

        let data: Option<InsertData> = self.post("entities/insert", &body).await?;
        let data = data.unwrap_or_default();
        Ok(InsertResult {
            insert_count: data.insert_count,
            ids: data.insert_ids,
        })
    }

    async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let vectors: Vec<Value> = request.vectors.iter().map(|v| v.to_json()).collect();
        let mut body = json!({
            "collectionName": collection,
            "data": vectors,
            "annsField": request.anns_field,
            "limit": request.limit,
            "outputFields": request.output_fields,
            "searchParams": request.params,
        });
        if let Some(expr) = &request.expr {
            body["filter"] = json!(expr);
        }
        if !request.partition_names.is_empty() {
            body["partitionNames"] = json!(request.partition_names);
        }

        let data: Option<Vec<Map<String, Value>>> = self.post("entities/search", &body).await?;
        Ok(data
            .unwrap_or_default()
            .into_iter()
            .map(|entity| to_search_hit(entity, &request.primary_field))
            .collect())
    }

    async fn list_partitions(&self, collection: &str) -> Result<Vec<String>> {
        let data: Option<Vec<String>> = self
            .post("partitions/list", &json!({ "collectionName": collection }))
            .await?;
        Ok(data.unwrap_or_default())
    }

    async fn has_partition(&self, collection: &str, partition: &str) -> Result<bool> {
        let data: Option<HasData> = self
            .post(
                "partitions/has",
                &json!({ "collectionName": collection, "partitionName": partition }),
            )
            .await?;
        Ok(data.unwrap_or_default().has)
    }

    async fn create_partition(&self, collection: &str, partition: &str) -> Result<()> {
        self.post_unit(
            "partitions/create",
            &json!({ "collectionName": collection, "partitionName": partition }),
        )
        .await
    }

    async fn drop_partition(&self, collection: &str, partition: &str) -> Result<()> {
        self.post_unit(
            "partitions/drop",
            &json!({ "collectionName": collection, "partitionName": partition }),
        )
        .await
    }

    async fn get_partition_stats(&self, collection: &str, partition: &str) -> Result<CollectionStats> {
        let data: Option<StatsData> = self
            .post(
                "partitions/get_stats",
                &json!({ "collectionName": collection, "partitionName": partition }),
            )
            .await?;
        Ok(CollectionStats {
            row_count: data.unwrap_or_default().row_count,
        })
    }

    async fn load_partitions(&self, collection: &str, partitions: &[String]) -> Result<()> {
        self.post_unit(
            "partitions/load",
            &json!({ "collectionName": collection, "partitionNames": partitions }),
        )
        .await
    }

    async fn release_partitions(&self, collection: &str, partitions: &[String]) -> Result<()> {
        self.post_unit(
            "partitions/release",
            &json!({ "collectionName": collection, "partitionNames": partitions }),
        )
        .await
    }

    async fn create_index(&self, collection: &str, index: &IndexDescription) -> Result<()> {
        let request = json!({
            "collectionName": collection,
            "indexParams": [{
                "fieldName": index.field_name,
                "indexName": index.index_name,
                "indexType": index.params.index_type,
                "metricType": index.params.metric_type,
                "params": index.params.params,
            }],
        });
        self.post_unit("indexes/create", &request).await
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexDescription>> {
        let names: Vec<String> = self
            .post("indexes/list", &json!({ "collectionName": collection }))
            .await?
            .unwrap_or_default();

        let described = futures::future::try_join_all(names.iter().map(|name| async move {
            let request = json!({ "collectionName": collection, "indexName": name });
            self.post::<Vec<RestIndex>>("indexes/describe", &request).await
        }))
        .await?;

        Ok(described
            .into_iter()
            .flat_map(Option::unwrap_or_default)
            .map(|index| IndexDescription {
                index_name: index.index_name,
                field_name: index.field_name,
                params: IndexParams {
                    index_type: index.index_type,
                    metric_type: index.metric_type,
                    params: index.params,
                },
            })
            .collect())
    }

    async fn drop_index(&self, collection: &str, index_name: &str) -> Result<()> {
        self.post_unit(
            "indexes/drop",
            &json!({ "collectionName": collection, "indexName": index_name }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Sample, Scalar};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_describe_field_translation() {
        let field: RestField = serde_json::from_value(json!({
            "name": "embedding",
            "type": "FloatVector",
            "params": [{"key": "dim", "value": "8"}, {"key": "mmap.enabled", "value": "false"}],
        }))
        .unwrap();

        let description = to_field_description(field).unwrap();
        assert_eq!(description.dtype, DataType::FloatVector);
        assert_eq!(description.params.get("dim"), Some(&json!("8")));
        assert_eq!(description.params.len(), 1);
        assert_eq!(description.auto_id, None);
    }

    #[test]
    fn test_primary_field_carries_auto_id() {
        let field: RestField = serde_json::from_value(json!({
            "name": "id",
            "type": "Int64",
            "primaryKey": true,
            "autoId": true,
        }))
        .unwrap();

        let description = to_field_description(field).unwrap();
        assert!(description.is_primary);
        assert_eq!(description.auto_id, Some(true));
    }

    #[test]
    fn test_unknown_rest_type() {
        let field: RestField =
            serde_json::from_value(json!({"name": "j", "type": "JSON"})).unwrap();
        assert!(to_field_description(field).is_err());
    }

    #[test]
    fn test_rows_from_columns() {
        let columns = vec![
            FieldData {
                name: "id".into(),
                dtype: DataType::Int64,
                values: vec![Scalar::Int64(1).into(), Scalar::Int64(2).into()],
            },
            FieldData {
                name: "v".into(),
                dtype: DataType::FloatVector,
                values: vec![Sample::float_vector(&[0.5]), Sample::float_vector(&[1.0])],
            },
        ];

        assert_eq!(
            to_rows(&columns).unwrap(),
            vec![json!({"id": 1, "v": [0.5]}), json!({"id": 2, "v": [1.0]})]
        );
    }

    fn ragged_request() -> InsertRequest {
        InsertRequest {
            partition_name: None,
            columns: vec![
                FieldData {
                    name: "id".into(),
                    dtype: DataType::Int64,
                    values: vec![Scalar::Int64(1).into(), Scalar::Int64(2).into()],
                },
                FieldData {
                    name: "v".into(),
                    dtype: DataType::FloatVector,
                    values: vec![Sample::float_vector(&[0.5])],
                },
            ],
        }
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = to_rows(&ragged_request().columns).unwrap_err();
        assert_eq!(err.to_string(), "Column 'v' has 1 rows, expected 2");
    }

    #[test_log::test(tokio::test)]
    async fn test_ragged_insert_fails_before_request() {
        // nothing listens on port 1, the request must not be attempted
        let conn = MilvusConnection::new("http://127.0.0.1:1");
        let err = conn.insert("c", &ragged_request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Column 'v' has 1 rows, expected 2");
    }

    #[test]
    fn test_search_hit_extraction() {
        let entity = json!({"id": 7, "distance": 0.25, "title": "a"});
        let hit = to_search_hit(entity.as_object().unwrap().clone(), "id");
        assert_eq!(hit.id, json!(7));
        assert_eq!(hit.distance, 0.25);
        assert_eq!(hit.fields.get("title"), Some(&json!("a")));
        assert!(!hit.fields.contains_key("distance"));
    }

    #[test]
    fn test_url() {
        let conn = MilvusConnection::new("http://localhost:19530/");
        assert_eq!(
            conn.url("collections/has"),
            "http://localhost:19530/v2/vectordb/collections/has"
        );
    }
}
