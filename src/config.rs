//! Configuration module for the payment tracker
//!
//! Handles configuration loading from TOML files with environment
//! variable overrides for the deployment-specific values.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    pub rpc: RpcSettings,

    /// Local storage configuration
    pub storage: StorageSettings,

    /// Indexing engine configuration
    pub tracker: TrackerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSettings {
    /// JSON-RPC endpoint URL
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Path to the embedded database directory
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// Base58 address of the tracked wallet
    pub receiver: String,

    /// Base poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Consecutive poll failures before the backoff self-resets
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Geometric backoff factor applied per failure
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u64,

    /// Signatures requested per feed page
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    /// Defensive cap on backfill pagination
    #[serde(default = "default_max_backfill_pages")]
    pub max_backfill_pages: usize,
}

// Default value functions
fn default_rpc_timeout() -> u64 { 30 }
fn default_db_path() -> String { "solpay.db".to_string() }
fn default_poll_interval() -> u64 { 3_000 }
fn default_max_retries() -> u32 { 5 }
fn default_backoff_factor() -> u64 { 2 }
fn default_page_limit() -> usize { 1_000 }
fn default_max_backfill_pages() -> usize { 10_000 }

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration with `.env` loaded first
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_file(path)
    }

    /// Environment overrides, named as the original deployment expects
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SOLANA_RPC_URL") {
            self.rpc.url = url;
        }
        if let Ok(receiver) = std::env::var("SOL_PAY_RECEIVER_PUB_KEY") {
            self.tracker.receiver = receiver;
        }
        if let Ok(path) = std::env::var("SOLPAY_DB_PATH") {
            self.storage.path = path;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            rpc: RpcSettings {
                url: "https://api.mainnet-beta.solana.com".to_string(),
                timeout_secs: default_rpc_timeout(),
            },
            storage: StorageSettings {
                path: default_db_path(),
            },
            tracker: TrackerSettings {
                receiver: String::new(),
                poll_interval_ms: default_poll_interval(),
                max_retries: default_max_retries(),
                backoff_factor: default_backoff_factor(),
                page_limit: default_page_limit(),
                max_backfill_pages: default_max_backfill_pages(),
            },
        };
        config.apply_env_overrides();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_wiring() {
        let config = Config::default();
        assert_eq!(config.tracker.poll_interval_ms, 3_000);
        assert_eq!(config.tracker.max_retries, 5);
        assert_eq!(config.tracker.backoff_factor, 2);
        assert_eq!(config.tracker.page_limit, 1_000);
    }

    #[test]
    fn parses_minimal_toml() {
        let config: Config = toml::from_str(
            r#"
            [rpc]
            url = "http://localhost:8899"

            [storage]

            [tracker]
            receiver = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
            poll_interval_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.rpc.url, "http://localhost:8899");
        assert_eq!(config.tracker.poll_interval_ms, 500);
        // unspecified fields fall back to defaults
        assert_eq!(config.tracker.max_retries, 5);
        assert_eq!(config.storage.path, "solpay.db");
    }
}
