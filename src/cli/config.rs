//! Configuration file
//!
//! Every field is optional; a missing file section means the default. Flags
//! on the command line are applied on top by the commands.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::server::ServerConfig;
use crate::store::{BackendKind, IdGenerator, Namespaces, StoreConfig};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Embedded engine (default: "redb")
    #[serde(default = "default_datastore")]
    pub datastore: BackendKind,

    /// Request server listen address (default: "127.0.0.1:29876")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Connections served at once (default: 1024)
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Flush to disk on every commit (default: true)
    #[serde(default = "default_sync_writes")]
    pub sync_writes: bool,

    /// Op-log namespace prefix (default: "log:")
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,

    /// Materialized-data namespace prefix (default: "data:")
    #[serde(default = "default_data_prefix")]
    pub data_prefix: String,

    /// Separator between key, id, kind and payload (default: ':')
    #[serde(default = "default_separator")]
    pub separator: char,
}

fn default_datastore() -> BackendKind {
    BackendKind::Redb
}
fn default_listen_addr() -> String {
    ServerConfig::default().listen_addr
}
fn default_max_connections() -> usize {
    ServerConfig::default().max_connections
}
fn default_sync_writes() -> bool {
    true
}
fn default_log_prefix() -> String {
    Namespaces::default().log_prefix
}
fn default_data_prefix() -> String {
    Namespaces::default().data_prefix
}
fn default_separator() -> char {
    Namespaces::default().separator
}

impl Default for Config {
    fn default() -> Self {
        Self {
            datastore: default_datastore(),
            listen_addr: default_listen_addr(),
            max_connections: default_max_connections(),
            sync_writes: default_sync_writes(),
            log_prefix: default_log_prefix(),
            data_prefix: default_data_prefix(),
            separator: default_separator(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// The file at `path` if given, otherwise the defaults
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> CliResult<()> {
        self.namespaces()
            .validate()
            .map_err(|e| CliError::config_error(e.message()))?;

        if self.listen_addr.trim().is_empty() {
            return Err(CliError::config_error("listen_addr must not be empty"));
        }
        if self.max_connections == 0 {
            return Err(CliError::config_error("max_connections must be > 0"));
        }

        Ok(())
    }

    pub fn namespaces(&self) -> Namespaces {
        Namespaces {
            log_prefix: self.log_prefix.clone(),
            data_prefix: self.data_prefix.clone(),
            separator: self.separator,
        }
    }

    /// What the backend is opened with
    pub fn store_config(&self, ids: Arc<dyn IdGenerator>) -> StoreConfig {
        StoreConfig::default()
            .with_namespaces(self.namespaces())
            .with_sync_writes(self.sync_writes)
            .with_ids(ids)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.listen_addr.clone(),
            max_connections: self.max_connections,
        }
    }
}
