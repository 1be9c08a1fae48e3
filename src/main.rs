use anyhow::Result;
use milvus_orm::{
    Collection, CollectionOptions, CollectionSchema, Column, ConnectionConfig, Connections, DataFrame,
    DataType, ElementType, FieldSchema, IndexParams, Sample, Scalar, DEFAULT_ALIAS,
};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DIM: usize = 8;
const NUM_ROWS: usize = 100;
const TOP_K: usize = 5;
const VECTOR_FIELD: &str = "float_vector";

/// Load .env files from multiple locations with priority order:
/// 1. Current working directory
/// 2. XDG config directory ~/.config/milvus-orm/.env
///
/// Environment variables set directly in the shell always take highest priority.
fn load_env_files() {
    let cwd_env = std::env::current_dir().map(|p| p.join(".env")).ok();
    if let Some(path) = cwd_env {
        if path.exists() && dotenv::from_path(&path).is_ok() {
            tracing::debug!("Loaded .env from: {}", path.display());
            return;
        }
    }

    if let Some(config_dir) = get_xdg_config_dir() {
        let xdg_env = config_dir.join("milvus-orm").join(".env");
        if xdg_env.exists() && dotenv::from_path(&xdg_env).is_ok() {
            tracing::debug!("Loaded .env from: {}", xdg_env.display());
            return;
        }
    }

    tracing::debug!("No .env file found, using environment variables only");
}

/// Get XDG config directory, fallback to ~/.config
fn get_xdg_config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

fn default_schema() -> Result<CollectionSchema> {
    let fields = vec![
        FieldSchema::builder("id", DataType::Int64).primary(true).build()?,
        FieldSchema::builder("float", DataType::Float).build()?,
        FieldSchema::builder(VECTOR_FIELD, DataType::FloatVector)
            .dim(DIM as i64)
            .build()?,
    ];
    Ok(CollectionSchema::new(fields, "hello milvus")?)
}

// Deterministic stand-in for random embeddings, unit length per row.
fn gen_vector(row: usize) -> Vec<f32> {
    let raw: Vec<f32> = (0..DIM).map(|i| ((row * DIM + i) as f32).sin()).collect();
    let norm = raw.iter().map(|v| v * v).sum::<f32>().sqrt().max(f32::EPSILON);
    raw.into_iter().map(|v| v / norm).collect()
}

fn gen_data() -> DataFrame {
    DataFrame::new(vec![
        Column::new(
            "id",
            ElementType::Int64,
            (0..NUM_ROWS).map(|i| Scalar::Int64(i as i64).into()).collect(),
        ),
        Column::new(
            "float",
            ElementType::Float32,
            (0..NUM_ROWS).map(|i| Scalar::Float(i as f32).into()).collect(),
        ),
        Column::new(
            VECTOR_FIELD,
            ElementType::Object,
            (0..NUM_ROWS).map(|i| Sample::float_vector(&gen_vector(i))).collect(),
        ),
    ])
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_files();

    let env_filter = EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    let mut connections = Connections::new();
    let conn = connections.create_connection(DEFAULT_ALIAS, Some(ConnectionConfig::from_env()));

    let name = format!("collection_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let collection = Collection::open(conn, &name, CollectionOptions::with_schema(default_schema()?)).await?;

    let data = gen_data();
    let inserted = collection.insert(&data, None).await?;
    tracing::info!("Inserted {} entities into '{}'", inserted.insert_count, collection.name());

    let index = IndexParams::new("IVF_FLAT", "L2").with_param("nlist", 128);
    collection.create_index(VECTOR_FIELD, index, "float_vector_index").await?;
    collection.load().await?;

    let queries: Vec<Sample> = (NUM_ROWS - 3..NUM_ROWS)
        .map(|i| Sample::float_vector(&gen_vector(i)))
        .collect();
    let params = json!({ "metricType": "L2", "params": { "nprobe": 10 } });
    let hits = collection
        .search(
            queries,
            VECTOR_FIELD,
            params.as_object().cloned().unwrap_or_default(),
            TOP_K,
            None,
            &["float"],
        )
        .await?;

    for hit in &hits {
        println!(
            "id: {}, distance: {}, float: {}",
            hit.id,
            hit.distance,
            hit.fields.get("float").cloned().unwrap_or_default()
        );
    }

    collection.release().await?;
    collection.drop().await?;

    Ok(())
}
