use crate::types::FinalityLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8899";

/// Configuration for the ledger endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcEndpointConfig {
    /// The RPC endpoint URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum concurrent requests to this endpoint
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Rate limit for status polls (requests per second)
    #[serde(default = "default_status_rate_limit")]
    pub status_rate_limit_rps: u32,

    /// Commitment used for anchor fetches and simulation
    #[serde(default = "default_commitment")]
    pub commitment: FinalityLevel,

    /// Let the node skip its own pre-flight simulation on send
    #[serde(default)]
    pub skip_preflight: bool,

    /// Times the node itself may rebroadcast a sent transaction
    #[serde(default)]
    pub max_node_retries: Option<usize>,

    /// Include ledger history in status lookups (slower, finds older signatures)
    #[serde(default)]
    pub search_history: bool,
}

fn default_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_concurrency() -> u32 {
    16
}

fn default_status_rate_limit() -> u32 {
    20
}

fn default_commitment() -> FinalityLevel {
    FinalityLevel::Confirmed
}

impl Default for RpcEndpointConfig {
    fn default() -> Self {
        Self::from_url(DEFAULT_RPC_URL)
    }
}

impl RpcEndpointConfig {
    /// Endpoint config with default settings for `url`
    pub fn from_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            timeout_ms: default_timeout_ms(),
            max_concurrency: default_max_concurrency(),
            status_rate_limit_rps: default_status_rate_limit(),
            commitment: default_commitment(),
            skip_preflight: false,
            max_node_retries: None,
            search_history: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "Invalid URL format: {}",
                self.url
            )));
        }

        if self.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(format!(
                "Invalid timeout_ms for {}: must be > 0",
                self.url
            )));
        }

        if self.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(format!(
                "Invalid max_concurrency for {}: must be > 0",
                self.url
            )));
        }

        if self.status_rate_limit_rps == 0 {
            return Err(ConfigError::ValidationError(format!(
                "Invalid status_rate_limit_rps for {}: must be > 0",
                self.url
            )));
        }

        Ok(())
    }
}

/// Configuration-related errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Missing configuration value: {0}")]
    Missing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RpcEndpointConfig::default();
        assert_eq!(config.url, DEFAULT_RPC_URL);
        assert_eq!(config.commitment, FinalityLevel::Confirmed);
        assert!(!config.skip_preflight);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RpcEndpointConfig =
            toml::from_str(r#"url = "https://api.devnet.solana.com""#).unwrap();
        assert_eq!(config.url, "https://api.devnet.solana.com");
        assert_eq!(config.max_concurrency, 16);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validation() {
        let mut config = RpcEndpointConfig::from_url("not-a-url");
        assert!(config.validate().is_err());

        config.url = "https://api.devnet.solana.com".to_string();
        config.max_concurrency = 0;
        assert!(config.validate().is_err());

        config.max_concurrency = 4;
        config.timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
