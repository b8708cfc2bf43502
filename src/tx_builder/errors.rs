//! Error types for the Transaction Builder
//!
//! Builder errors describe problems with the caller's inputs (arguments,
//! accounts, signers) or with assembling the transaction message. None of
//! them involve the network, so most are not retryable.

use thiserror::Error;

/// Error type for instruction construction and envelope signing
#[derive(Error, Debug)]
pub enum TransactionBuilderError {
    /// The requested method is not part of the program interface
    #[error("Unknown method `{method}` for program {program}")]
    UnknownMethod { program: String, method: String },

    /// Arguments or account names do not match the method schema
    #[error("Schema mismatch for `{method}`: {detail}")]
    SchemaMismatch { method: String, detail: String },

    /// A required account reference was not supplied
    #[error("Missing required account `{account}` for `{method}`")]
    MissingAccount { method: String, account: String },

    /// Argument data could not be encoded
    #[error("Encoding failed for `{method}`: {reason}")]
    Encoding { method: String, reason: String },

    /// A required signing authority was not provided
    #[error("Missing signer {pubkey}")]
    MissingSigner { pubkey: String },

    /// Failed to sign the transaction
    ///
    /// The signer was present but could not produce a signature
    /// (hardware wallet disconnected, remote signer unavailable).
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Message compilation failed (too many accounts, invalid lookup tables)
    #[error("Message compile error: {0}")]
    MessageCompile(String),

    /// Invalid instruction order or structure
    #[error("Invalid instruction order: {0}")]
    InvalidInstructionOrder(String),

    /// Configuration or validation error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal invariant violation or unexpected state
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransactionBuilderError {
    /// Check if this error is potentially retryable
    ///
    /// Only signer failures may be transient; everything else needs the
    /// caller to fix its inputs.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Signing(_) => true,

            Self::UnknownMethod { .. }
            | Self::SchemaMismatch { .. }
            | Self::MissingAccount { .. }
            | Self::Encoding { .. }
            | Self::MissingSigner { .. }
            | Self::MessageCompile(_)
            | Self::InvalidInstructionOrder(_)
            | Self::Configuration(_)
            | Self::Internal(_) => false,
        }
    }

    /// Whether the caller can fix this by correcting its inputs
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownMethod { .. }
                | Self::SchemaMismatch { .. }
                | Self::MissingAccount { .. }
                | Self::Encoding { .. }
                | Self::MissingSigner { .. }
        )
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownMethod { .. } => "unknown_method",
            Self::SchemaMismatch { .. } => "schema",
            Self::MissingAccount { .. } => "account",
            Self::Encoding { .. } => "encoding",
            Self::MissingSigner { .. } => "signer",
            Self::Signing(_) => "signing",
            Self::MessageCompile(_) => "message",
            Self::InvalidInstructionOrder(_) => "validation",
            Self::Configuration(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

// Convenience constructors for common error scenarios
impl TransactionBuilderError {
    pub fn schema_mismatch(method: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            method: method.into(),
            detail: detail.into(),
        }
    }

    pub fn missing_account(method: impl Into<String>, account: impl Into<String>) -> Self {
        Self::MissingAccount {
            method: method.into(),
            account: account.into(),
        }
    }

    pub fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidInstructionOrder(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}
