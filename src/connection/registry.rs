use super::{Connection, MilvusConnection};
use crate::error::{OrmError, OrmResult};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_ALIAS: &str = "default";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 19530;

/// Server address for one connection alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ConnectionConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Read configuration from the environment.
    ///
    /// `MILVUS_ADDRESS` (a full URL) wins over `MILVUS_HOST` / `MILVUS_PORT`.
    pub fn from_env() -> Self {
        if let Ok(address) = std::env::var("MILVUS_ADDRESS") {
            match Url::parse(&address) {
                Ok(url) => {
                    return Self {
                        host: url.host_str().unwrap_or(DEFAULT_HOST).to_string(),
                        port: url.port().unwrap_or(DEFAULT_PORT),
                    }
                }
                Err(e) => tracing::warn!("Ignoring invalid MILVUS_ADDRESS '{}': {}", address, e),
            }
        }

        let host = std::env::var("MILVUS_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = std::env::var("MILVUS_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self { host, port }
    }
}

/// Registry of named connections.
#[derive(Default)]
pub struct Connections {
    configs: HashMap<String, ConnectionConfig>,
    connections: HashMap<String, Arc<dyn Connection>>,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register addresses for aliases without connecting.
    pub fn configure<I, S>(&mut self, configs: I)
    where
        I: IntoIterator<Item = (S, ConnectionConfig)>,
        S: Into<String>,
    {
        for (alias, config) in configs {
            self.configs.insert(alias.into(), config);
        }
    }

    /// Register an already-built connection under `alias`.
    pub fn add_connection(&mut self, alias: &str, connection: Arc<dyn Connection>) {
        self.connections.insert(alias.to_string(), connection);
    }

    /// Connect `alias` using `config`, the configured address, or the default one, in that order.
    pub fn create_connection(
        &mut self,
        alias: &str,
        config: Option<ConnectionConfig>,
    ) -> Arc<dyn Connection> {
        let config = config
            .or_else(|| self.configs.get(alias).cloned())
            .unwrap_or_default();

        tracing::info!("Creating connection '{}' to {}", alias, config.address());

        let connection: Arc<dyn Connection> = Arc::new(MilvusConnection::new(&config.address()));
        self.configs.insert(alias.to_string(), config);
        self.connections.insert(alias.to_string(), connection.clone());
        connection
    }

    pub fn get_connection(&self, alias: &str) -> Option<Arc<dyn Connection>> {
        self.connections.get(alias).cloned()
    }

    /// Like [`Connections::get_connection`], but a missing alias is an error.
    pub fn connection(&self, alias: &str) -> OrmResult<Arc<dyn Connection>> {
        self.get_connection(alias)
            .ok_or_else(|| OrmError::ConnectionNotFound(alias.to_string()))
    }

    /// Drop the live connection for `alias`; its configured address is kept.
    pub fn remove_connection(&mut self, alias: &str) -> OrmResult<()> {
        self.connections
            .remove(alias)
            .map(|_| ())
            .ok_or_else(|| OrmError::ConnectionNotFound(alias.to_string()))
    }

    pub fn get_connection_addr(&self, alias: &str) -> Option<&ConnectionConfig> {
        self.configs.get(alias)
    }

    /// All known aliases and whether each has a live connection, sorted by alias.
    pub fn list_connections(&self) -> Vec<(String, bool)> {
        let mut aliases: Vec<(String, bool)> = self
            .configs
            .keys()
            .chain(self.connections.keys())
            .map(|alias| (alias.clone(), self.connections.contains_key(alias)))
            .collect();
        aliases.sort();
        aliases.dedup();
        aliases
    }
}
