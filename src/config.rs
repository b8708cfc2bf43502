//! Configuration module for the Dubuu client
//!
//! Loads configuration from a TOML file, applies environment overrides
//! (the `ANCHOR_PROVIDER_URL` / `ANCHOR_WALLET` provider convention) and
//! validates the result.

use crate::confirmation::TrackerConfig;
use crate::rpc_manager::{ConfigError, RpcEndpointConfig};
use crate::submission::SubmissionConfig;
use crate::types::FinalityLevel;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::path::Path;
use std::str::FromStr;

pub const ENV_PROVIDER_URL: &str = "ANCHOR_PROVIDER_URL";
pub const ENV_WALLET: &str = "ANCHOR_WALLET";
pub const ENV_PROGRAM_ID: &str = "DUBUU_PROGRAM_ID";
pub const ENV_COMMITMENT: &str = "DUBUU_COMMITMENT";

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Ledger endpoint
    #[serde(default)]
    pub rpc: RpcEndpointConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    /// Target program
    #[serde(default)]
    pub program: ProgramConfig,

    #[serde(default)]
    pub submission: SubmissionConfig,

    #[serde(default)]
    pub confirmation: TrackerConfig,

    /// Monitoring and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// Base58 program id; required before invoking anything
    #[serde(default)]
    pub program_id: Option<String>,

    /// Workspace name of the program, used in logs
    #[serde(default = "default_program_name")]
    pub name: String,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            program_id: None,
            name: default_program_name(),
        }
    }
}

impl ProgramConfig {
    /// Parsed program id
    pub fn program_id(&self) -> Result<Pubkey, ConfigError> {
        let raw = self
            .program_id
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("program.program_id".to_string()))?;
        Pubkey::from_str(raw).map_err(|e| {
            ConfigError::ValidationError(format!("Invalid program_id '{}': {}", raw, e))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable Prometheus metrics
    #[serde(default)]
    pub enable_metrics: bool,

    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: false,
            metrics_port: default_metrics_port(),
        }
    }
}

// Default value functions
fn default_keypair_path() -> String {
    "~/.config/solana/id.json".to_string()
}
fn default_program_name() -> String {
    "dubuu".to_string()
}
fn default_metrics_port() -> u16 {
    9090
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load `path` if it exists (defaults otherwise), apply `.env` and
    /// process environment overrides, then validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };

        dotenvy::dotenv().ok();
        config.apply_overrides_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(ENV_PROVIDER_URL) {
            self.rpc.url = url;
        }
        if let Some(path) = lookup(ENV_WALLET) {
            self.wallet.keypair_path = path;
        }
        if let Some(program_id) = lookup(ENV_PROGRAM_ID) {
            self.program.program_id = Some(program_id);
        }
        if let Some(commitment) = lookup(ENV_COMMITMENT) {
            let level = FinalityLevel::from_str(&commitment).map_err(|e| {
                ConfigError::ValidationError(format!("{}: {}", ENV_COMMITMENT, e))
            })?;
            self.rpc.commitment = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rpc.validate()?;

        if self.wallet.keypair_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "wallet.keypair_path must not be empty".to_string(),
            ));
        }

        if self.program.program_id.is_some() {
            self.program.program_id()?;
        }

        self.submission
            .anchor_retry
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("submission.anchor_retry: {}", e)))?;

        if self.confirmation.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "confirmation.timeout_ms must be > 0".to_string(),
            ));
        }
        self.confirmation
            .poll
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("confirmation.poll: {}", e)))?;

        if self.monitoring.enable_metrics && self.monitoring.metrics_port == 0 {
            return Err(ConfigError::ValidationError(
                "monitoring.metrics_port must be > 0 when metrics are enabled".to_string(),
            ));
        }

        Ok(())
    }
}
