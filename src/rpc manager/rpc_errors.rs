use crate::types::{has_error_name, FailureKind, FailureReason};
use serde::{Deserialize, Serialize};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_rpc_client_api::request::{RpcError, RpcResponseErrorData};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the ledger transport
#[derive(Debug, Clone, Error)]
pub enum RpcManagerError {
    /// Transport-level errors (network, connection)
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    #[error("Timeout after {timeout_ms}ms (endpoint: {endpoint})")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// RPC response errors not covered by a more specific variant
    #[error("RPC response error: {message} (endpoint: {endpoint}, code: {code:?})")]
    RpcResponse {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },

    #[error("Rate limit exceeded (endpoint: {endpoint})")]
    RateLimitExceeded { endpoint: String },

    #[error("Blockhash not found (endpoint: {endpoint})")]
    BlockhashNotFound { endpoint: String },

    #[error("Transaction expired (endpoint: {endpoint})")]
    TransactionExpired { endpoint: String },

    #[error("Account not found: {account} (endpoint: {endpoint})")]
    AccountNotFound { account: String, endpoint: String },

    #[error("Insufficient funds (endpoint: {endpoint})")]
    InsufficientFunds { endpoint: String },

    #[error("Transaction already processed (endpoint: {endpoint})")]
    AlreadyProcessed { endpoint: String },

    /// The node simulated the transaction before accepting it and it failed
    #[error("Preflight simulation failed: {reason} (endpoint: {endpoint})")]
    PreflightFailure {
        endpoint: String,
        reason: FailureReason,
        logs: Vec<String>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcManagerError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcManagerError::Transport { .. } => true,
            RpcManagerError::Timeout { .. } => true,
            RpcManagerError::RateLimitExceeded { .. } => true,
            // Retryable only after fetching a new anchor
            RpcManagerError::BlockhashNotFound { .. } => true,

            RpcManagerError::TransactionExpired { .. } => false,
            RpcManagerError::AccountNotFound { .. } => false,
            RpcManagerError::InsufficientFunds { .. } => false,
            RpcManagerError::AlreadyProcessed { .. } => false,
            RpcManagerError::PreflightFailure { .. } => false,
            RpcManagerError::Configuration(_) => false,
            RpcManagerError::Internal(_) => false,

            // Retry on server errors (5xx)
            RpcManagerError::RpcResponse { code, .. } => {
                matches!(code, Some(c) if (500..600).contains(c))
            }
        }
    }

    /// The endpoint could not be reached or did not answer in time
    pub fn is_unavailable(&self) -> bool {
        match self {
            RpcManagerError::Transport { .. }
            | RpcManagerError::Timeout { .. }
            | RpcManagerError::RateLimitExceeded { .. } => true,
            RpcManagerError::RpcResponse { code, .. } => {
                matches!(code, Some(c) if (500..600).contains(c))
            }
            _ => false,
        }
    }

    /// Get the endpoint associated with this error, if any
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            RpcManagerError::Transport { endpoint, .. } => Some(endpoint),
            RpcManagerError::Timeout { endpoint, .. } => Some(endpoint),
            RpcManagerError::RpcResponse { endpoint, .. } => Some(endpoint),
            RpcManagerError::RateLimitExceeded { endpoint } => Some(endpoint),
            RpcManagerError::BlockhashNotFound { endpoint } => Some(endpoint),
            RpcManagerError::TransactionExpired { endpoint } => Some(endpoint),
            RpcManagerError::AccountNotFound { endpoint, .. } => Some(endpoint),
            RpcManagerError::InsufficientFunds { endpoint } => Some(endpoint),
            RpcManagerError::AlreadyProcessed { endpoint } => Some(endpoint),
            RpcManagerError::PreflightFailure { endpoint, .. } => Some(endpoint),
            RpcManagerError::Configuration(_) | RpcManagerError::Internal(_) => None,
        }
    }

    /// Map a ledger-reported transaction failure onto the matching variant
    pub fn from_failure(reason: FailureReason, logs: Vec<String>, endpoint: &str) -> Self {
        let endpoint = endpoint.to_string();
        match reason.kind() {
            FailureKind::StaleAnchor => RpcManagerError::BlockhashNotFound { endpoint },
            FailureKind::InsufficientFee => RpcManagerError::InsufficientFunds { endpoint },
            FailureKind::FeePayerNotFound => RpcManagerError::AccountNotFound {
                account: "fee payer".to_string(),
                endpoint,
            },
            FailureKind::AlreadyProcessed => RpcManagerError::AlreadyProcessed { endpoint },
            FailureKind::Program | FailureKind::Other => RpcManagerError::PreflightFailure {
                endpoint,
                reason,
                logs,
            },
        }
    }

    /// Create from ClientError with context
    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        match err.kind() {
            ClientErrorKind::RpcError(RpcError::RpcResponseError {
                data: RpcResponseErrorData::SendTransactionPreflightFailure(sim),
                message,
                ..
            }) => {
                let raw = sim
                    .err
                    .as_ref()
                    .map(|e| format!("{:?}", e))
                    .unwrap_or_else(|| message.clone());
                let logs = sim.logs.clone().unwrap_or_default();
                return Self::from_failure(FailureReason::parse(&raw), logs, endpoint);
            }
            ClientErrorKind::TransactionError(tx_err) => {
                let reason = FailureReason::parse(&format!("{:?}", tx_err));
                return Self::from_failure(reason, Vec::new(), endpoint);
            }
            ClientErrorKind::Io(io_err) => {
                return RpcManagerError::Transport {
                    endpoint: endpoint.to_string(),
                    message: io_err.to_string(),
                };
            }
            _ => {}
        }

        Self::classify_message(&err.to_string(), endpoint)
    }

    /// Classify based on the rendered error message
    fn classify_message(message: &str, endpoint: &str) -> Self {
        let err_str = message.to_lowercase();
        let endpoint = endpoint.to_string();

        if err_str.contains("blockhash not found") {
            RpcManagerError::BlockhashNotFound { endpoint }
        } else if err_str.contains("transaction expired")
            || err_str.contains("block height exceeded")
        {
            RpcManagerError::TransactionExpired { endpoint }
        } else if err_str.contains("account not found")
            || has_error_name(message, "AccountNotFound")
        {
            RpcManagerError::AccountNotFound {
                account: "unknown".to_string(),
                endpoint,
            }
        } else if err_str.contains("insufficient funds")
            || err_str.contains("insufficient lamports")
        {
            RpcManagerError::InsufficientFunds { endpoint }
        } else if err_str.contains("already been processed") {
            RpcManagerError::AlreadyProcessed { endpoint }
        } else if err_str.contains("rate limit")
            || err_str.contains("too many requests")
            || err_str.contains("429")
        {
            RpcManagerError::RateLimitExceeded { endpoint }
        } else if err_str.contains("timeout") || err_str.contains("timed out") {
            RpcManagerError::Timeout {
                endpoint,
                timeout_ms: 0,
            }
        } else if err_str.contains("error sending request")
            || err_str.contains("connection refused")
            || err_str.contains("dns error")
        {
            RpcManagerError::Transport {
                endpoint,
                message: message.to_string(),
            }
        } else {
            let code = err_str
                .split("code:")
                .nth(1)
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.trim_end_matches(',').parse::<i64>().ok());

            RpcManagerError::RpcResponse {
                endpoint,
                message: message.to_string(),
                code,
            }
        }
    }
}

/// Exponential backoff with jitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_attempts: u32,

    pub base_delay_ms: u64,

    pub max_delay_ms: u64,

    /// Jitter factor (0.0 - 1.0)
    pub jitter_factor: f64,

    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
            jitter_factor: 0.1,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt`, or `None` once attempts run out
    pub fn calculate_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        Some(self.backoff_delay(attempt))
    }

    /// Delay for `attempt` with no attempt cap; only `max_delay_ms` bounds it
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = self.base_delay_ms as f64 * self.multiplier.powi(exponent);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64);

        // Add jitter to prevent thundering herd
        let jitter = (rand::random::<f64>() - 0.5) * 2.0 * self.jitter_factor;
        let jittered_delay = (delay_ms * (1.0 + jitter)).max(0.0) as u64;

        Duration::from_millis(jittered_delay)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_delay_ms == 0 {
            return Err("base_delay_ms must be greater than 0".to_string());
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(format!(
                "max_delay_ms ({}) must be >= base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            ));
        }
        if self.multiplier < 1.0 {
            return Err("multiplier must be >= 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err("jitter_factor must be within 0.0..=1.0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(RpcManagerError::Transport {
            endpoint: "test".to_string(),
            message: "connection failed".to_string(),
        }
        .is_retryable());

        assert!(RpcManagerError::Timeout {
            endpoint: "test".to_string(),
            timeout_ms: 5000,
        }
        .is_retryable());

        assert!(!RpcManagerError::Internal("test".to_string()).is_retryable());
        assert!(!RpcManagerError::TransactionExpired {
            endpoint: "test".to_string(),
        }
        .is_retryable());
        assert!(RpcManagerError::RpcResponse {
            endpoint: "test".to_string(),
            message: "bad gateway".to_string(),
            code: Some(502),
        }
        .is_unavailable());
    }

    #[test]
    fn test_error_endpoint() {
        let err = RpcManagerError::Timeout {
            endpoint: "https://test.com".to_string(),
            timeout_ms: 5000,
        };
        assert_eq!(err.endpoint(), Some("https://test.com"));
        assert_eq!(RpcManagerError::Internal("x".to_string()).endpoint(), None);
    }

    #[test]
    fn test_classify_message() {
        let err = RpcManagerError::classify_message(
            "RPC response error -32002: Transaction simulation failed: Blockhash not found",
            "e",
        );
        assert!(matches!(err, RpcManagerError::BlockhashNotFound { .. }));

        let err = RpcManagerError::classify_message("HTTP status client error (429 Too Many Requests)", "e");
        assert!(matches!(err, RpcManagerError::RateLimitExceeded { .. }));

        let err = RpcManagerError::classify_message("error sending request for url", "e");
        assert!(err.is_unavailable());

        let err = RpcManagerError::classify_message("something else entirely", "e");
        assert!(matches!(err, RpcManagerError::RpcResponse { .. }));

        let err = RpcManagerError::classify_message("TransactionError(AccountNotFound)", "e");
        assert!(matches!(err, RpcManagerError::AccountNotFound { .. }));

        let err = RpcManagerError::classify_message("TransactionError(ProgramAccountNotFound)", "e");
        assert!(matches!(err, RpcManagerError::RpcResponse { .. }));
    }

    #[test]
    fn test_from_client_error_io() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = RpcManagerError::from_client_error(ClientError::from(io), "http://localhost:8899");
        assert!(matches!(err, RpcManagerError::Transport { .. }));
        assert_eq!(err.endpoint(), Some("http://localhost:8899"));
    }

    #[test]
    fn test_from_failure() {
        let err = RpcManagerError::from_failure(FailureReason::new("BlockhashNotFound"), vec![], "e");
        assert!(matches!(err, RpcManagerError::BlockhashNotFound { .. }));

        let err = RpcManagerError::from_failure(FailureReason::new("ProgramAccountNotFound"), vec![], "e");
        assert!(matches!(err, RpcManagerError::PreflightFailure { .. }));

        let err = RpcManagerError::from_failure(
            FailureReason::custom(0, 6008),
            vec!["Program log: bid too low".to_string()],
            "e",
        );
        match err {
            RpcManagerError::PreflightFailure { reason, logs, .. } => {
                assert_eq!(reason.custom_code(), Some(6008));
                assert_eq!(logs.len(), 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_retry_policy_delay() {
        let policy = RetryPolicy::default();

        let delay1 = policy.calculate_delay(0);
        assert!(delay1.is_some());

        let delay2 = policy.calculate_delay(1);
        assert!(delay2.unwrap() >= delay1.unwrap());

        assert!(policy.calculate_delay(10).is_none());

        // Uncapped variant stays below max delay plus jitter
        let max = Duration::from_millis((policy.max_delay_ms as f64 * 1.1) as u64 + 1);
        assert!(policy.backoff_delay(50) <= max);
    }

    #[test]
    fn test_retry_policy_validate() {
        assert!(RetryPolicy::default().validate().is_ok());
        let bad = RetryPolicy {
            max_delay_ms: 10,
            base_delay_ms: 100,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
