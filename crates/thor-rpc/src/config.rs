//! Provider and server configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::server::ServerConfig;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Encoding the configuration failed
    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Node REST endpoint
    #[serde(default = "default_node_url")]
    pub node_url: String,
    /// Node WebSocket endpoint; derived from `node_url` when unset
    #[serde(default)]
    pub ws_url: Option<String>,
    /// Chain id override; otherwise derived from the genesis block
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Per-request timeout of the node client
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Lifetime in blocks of transactions built by `eth_sendTransaction`
    #[serde(default = "default_tx_expiration")]
    pub tx_expiration: u32,
    /// Gas price coefficient of built transactions
    #[serde(default)]
    pub gas_price_coef: u8,
    /// Page size of `eth_getLogs` queries
    #[serde(default = "default_logs_limit")]
    pub logs_limit: u64,
    /// Best-block polling interval of `evm_mine`
    #[serde(default = "default_mine_poll_interval_ms")]
    pub mine_poll_interval_ms: u64,
    /// Give up on `evm_mine` after this long
    #[serde(default = "default_mine_timeout_secs")]
    pub mine_timeout_secs: u64,
    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_node_url() -> String {
    "http://localhost:8669".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_tx_expiration() -> u32 {
    32
}

fn default_logs_limit() -> u64 {
    1000
}

fn default_mine_poll_interval_ms() -> u64 {
    1000
}

fn default_mine_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            node_url: default_node_url(),
            ws_url: None,
            chain_id: None,
            request_timeout_secs: default_request_timeout_secs(),
            tx_expiration: default_tx_expiration(),
            gas_price_coef: 0,
            logs_limit: default_logs_limit(),
            mine_poll_interval_ms: default_mine_poll_interval_ms(),
            mine_timeout_secs: default_mine_timeout_secs(),
            log_level: default_log_level(),
        }
    }
}

impl ProviderConfig {
    /// Config for a node at `node_url`, defaults elsewhere
    pub fn new(node_url: impl Into<String>) -> Self {
        Self {
            node_url: node_url.into(),
            ..Default::default()
        }
    }

    /// WebSocket base URL for subscriptions
    pub fn ws_base_url(&self) -> &str {
        self.ws_url.as_deref().unwrap_or(&self.node_url)
    }

    /// Node client timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `evm_mine` polling interval
    pub fn mine_poll_interval(&self) -> Duration {
        Duration::from_millis(self.mine_poll_interval_ms)
    }

    /// `evm_mine` deadline
    pub fn mine_timeout(&self) -> Duration {
        Duration::from_secs(self.mine_timeout_secs)
    }
}

/// Configuration file: a `[provider]` and a `[server]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Write as TOML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
