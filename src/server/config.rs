//! Request server configuration

use serde::{Deserialize, Serialize};

/// Request server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (default: "127.0.0.1:29876")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Connections served at once; extra clients are refused (default: 1024)
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_listen_addr() -> String {
    "127.0.0.1:29876".to_string()
}

fn default_max_connections() -> usize {
    1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_connections: default_max_connections(),
        }
    }
}

impl ServerConfig {
    pub fn with_listen_addr(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            ..Default::default()
        }
    }
}
