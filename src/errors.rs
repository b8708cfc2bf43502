//! Caller-facing error type
//!
//! Every component keeps its own error enum. `ClientError` wraps them for
//! callers of the program facade and says what to do next.

use crate::confirmation::TrackError;
use crate::rpc_manager::{ConfigError, RpcManagerError};
use crate::submission::{RejectReason, SubmitError};
use crate::tx_builder::TransactionBuilderError;
use crate::wallet::WalletError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Build(#[from] TransactionBuilderError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Track(#[from] TrackError),

    #[error(transparent)]
    Rpc(#[from] RpcManagerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Coarse error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SchemaMismatch,
    MissingAccount,
    MissingSigner,
    NetworkUnavailable,
    RejectedByNode,
    SimulationFailed,
    Timeout,
    Failed,
    Configuration,
    Internal,
}

/// What the caller should do about an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    /// Correct arguments, accounts, signers or configuration
    FixInputs,
    /// Try again later; rebuild with a fresh anchor
    RetryLater,
    /// Rebuild with a fresh anchor and submit again
    Resubmit,
    /// Query the status by signature; do not resubmit
    RecheckStatus,
    /// Terminal
    None,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Build(e) => build_kind(e),
            ClientError::Submit(e) => match e {
                SubmitError::NetworkUnavailable(_) => ErrorKind::NetworkUnavailable,
                SubmitError::RejectedByNode(_) => ErrorKind::RejectedByNode,
                SubmitError::SimulationFailed { .. } => ErrorKind::SimulationFailed,
                SubmitError::Build(e) => build_kind(e),
            },
            ClientError::Track(TrackError::Timeout { .. }) => ErrorKind::Timeout,
            ClientError::Track(TrackError::Failed(_)) => ErrorKind::Failed,
            ClientError::Rpc(e) if e.is_unavailable() => ErrorKind::NetworkUnavailable,
            ClientError::Rpc(RpcManagerError::Configuration(_)) => ErrorKind::Configuration,
            ClientError::Rpc(_) => ErrorKind::Internal,
            ClientError::Config(_) | ClientError::Wallet(_) => ErrorKind::Configuration,
        }
    }

    pub fn remediation(&self) -> Remediation {
        match self {
            ClientError::Submit(SubmitError::RejectedByNode(reason)) => match reason {
                RejectReason::StaleAnchor => Remediation::Resubmit,
                // The same signature already landed; resubmitting would run the method twice
                RejectReason::AlreadyProcessed => Remediation::RecheckStatus,
                RejectReason::InsufficientFee | RejectReason::FeePayerNotFound => {
                    Remediation::FixInputs
                }
                RejectReason::Other(_) => Remediation::FixInputs,
            },
            _ => match self.kind() {
                ErrorKind::SchemaMismatch
                | ErrorKind::MissingAccount
                | ErrorKind::MissingSigner
                | ErrorKind::SimulationFailed
                | ErrorKind::Configuration => Remediation::FixInputs,
                ErrorKind::NetworkUnavailable => Remediation::RetryLater,
                ErrorKind::RejectedByNode => Remediation::Resubmit,
                ErrorKind::Timeout => Remediation::RecheckStatus,
                ErrorKind::Failed | ErrorKind::Internal => Remediation::None,
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.remediation(),
            Remediation::RetryLater | Remediation::Resubmit
        )
    }
}

fn build_kind(e: &TransactionBuilderError) -> ErrorKind {
    match e {
        TransactionBuilderError::UnknownMethod { .. }
        | TransactionBuilderError::SchemaMismatch { .. }
        | TransactionBuilderError::Encoding { .. } => ErrorKind::SchemaMismatch,
        TransactionBuilderError::MissingAccount { .. } => ErrorKind::MissingAccount,
        TransactionBuilderError::MissingSigner { .. } => ErrorKind::MissingSigner,
        TransactionBuilderError::Configuration(_) => ErrorKind::Configuration,
        _ => ErrorKind::Internal,
    }
}
