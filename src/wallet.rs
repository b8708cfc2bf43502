//! Wallet management module
//!
//! Loads the signing authority from a Solana CLI keypair file.

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroize;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Failed to read keypair file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse keypair file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return Path::new(&home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// Holds the keypair used to sign transactions
#[derive(Clone)]
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl std::fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletManager")
            .field("pubkey", &self.pubkey())
            .finish()
    }
}

impl WalletManager {
    /// Load a keypair file: a JSON array of 64 bytes (Solana CLI format)
    /// or the raw 64 bytes.
    pub fn from_file(path: &str) -> Result<Self, WalletError> {
        let path = expand_home(path);
        let mut file_bytes = std::fs::read(&path).map_err(|source| WalletError::Io {
            path: path.clone(),
            source,
        })?;

        let result = if file_bytes.len() == 64 {
            Self::from_bytes(&file_bytes)
        } else {
            match serde_json::from_slice::<Vec<u8>>(&file_bytes) {
                Ok(mut json) => {
                    let result = Self::from_bytes(&json);
                    json.zeroize();
                    result
                }
                Err(e) => Err(WalletError::Parse {
                    path: path.clone(),
                    reason: e.to_string(),
                }),
            }
        };

        file_bytes.zeroize();
        result
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if bytes.len() != 64 {
            return Err(WalletError::InvalidKeypair(format!(
                "expected 64 bytes, got {}",
                bytes.len()
            )));
        }
        if bytes.iter().all(|&b| b == 0) {
            return Err(WalletError::InvalidKeypair(
                "all-zero key rejected".to_string(),
            ));
        }
        let keypair =
            Keypair::try_from(bytes).map_err(|e| WalletError::InvalidKeypair(e.to_string()))?;
        Ok(Self::from_keypair(keypair))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn keypair_arc(&self) -> Arc<Keypair> {
        Arc::clone(&self.keypair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_json_keypair() {
        let keypair = Keypair::new();
        let mut file = NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let wallet = WalletManager::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_load_raw_keypair() {
        let keypair = Keypair::new();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&keypair.to_bytes()).unwrap();

        let wallet = WalletManager::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_rejects_zero_key() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 64]).unwrap();
        let err = WalletManager::from_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, WalletError::InvalidKeypair(_)));
    }

    #[test]
    fn test_rejects_short_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[1, 2, 3]").unwrap();
        let err = WalletManager::from_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, WalletError::InvalidKeypair(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = WalletManager::from_file("/nonexistent/id.json").unwrap_err();
        assert!(matches!(err, WalletError::Io { .. }));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/id.json"), PathBuf::from("/abs/id.json"));
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(
                expand_home("~/.config/solana/id.json"),
                Path::new(&home).join(".config/solana/id.json")
            );
        }
    }
}
