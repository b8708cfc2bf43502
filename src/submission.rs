//! Submission Client
//!
//! Attaches a fresh anchor to a set of instructions, signs, optionally runs
//! a pre-flight simulation and sends the transaction to the ledger exactly
//! once. The only automatic retry is `submit_with_fresh_anchor`, which
//! rebuilds (never re-sends) after a stale-anchor rejection.

use crate::metrics::{metrics, Timer};
use crate::observability::CorrelationId;
use crate::rpc_manager::{LedgerClient, RetryPolicy, RpcManagerError};
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::{
    plan_instructions, sanity_check_ix_order, FreshnessAnchor, MessageVersion, SignedEnvelope,
    TransactionBuilderError, UnsignedEnvelope,
};
use crate::types::{FailureKind, FailureReason, SimulationOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::{instruction::Instruction, signature::Signature, signer::Signer};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Simulate before sending and stop on simulated failure
    #[serde(default = "default_true")]
    pub preflight: bool,

    /// Rebuilds allowed after stale-anchor rejections
    #[serde(default = "default_max_anchor_refreshes")]
    pub max_anchor_refreshes: u32,

    /// Backoff between anchor refreshes
    #[serde(default)]
    pub anchor_retry: RetryPolicy,

    /// Compute unit limit (0 = let the runtime decide)
    #[serde(default)]
    pub compute_unit_limit: u32,

    /// Priority fee in micro-lamports per compute unit (0 = none)
    #[serde(default)]
    pub compute_unit_price: u64,

    #[serde(default)]
    pub message_version: MessageVersion,
}

fn default_true() -> bool {
    true
}

fn default_max_anchor_refreshes() -> u32 {
    3
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            preflight: default_true(),
            max_anchor_refreshes: default_max_anchor_refreshes(),
            anchor_retry: RetryPolicy::default(),
            compute_unit_limit: 0,
            compute_unit_price: 0,
            message_version: MessageVersion::default(),
        }
    }
}

/// Why the node refused a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The anchor is unknown to the node or past its last valid block height
    StaleAnchor,
    /// Fee payer balance does not cover the fee
    InsufficientFee,
    /// Fee payer account does not exist
    FeePayerNotFound,
    /// The node already holds this exact transaction
    AlreadyProcessed,
    /// Any other node-side validation failure
    Other(String),
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::StaleAnchor => "stale_anchor",
            RejectReason::InsufficientFee => "insufficient_fee",
            RejectReason::FeePayerNotFound => "fee_payer_not_found",
            RejectReason::AlreadyProcessed => "already_processed",
            RejectReason::Other(_) => "other",
        }
    }

    fn from_failure(reason: &FailureReason) -> Option<Self> {
        match reason.kind() {
            FailureKind::StaleAnchor => Some(RejectReason::StaleAnchor),
            FailureKind::InsufficientFee => Some(RejectReason::InsufficientFee),
            FailureKind::FeePayerNotFound => Some(RejectReason::FeePayerNotFound),
            FailureKind::AlreadyProcessed => Some(RejectReason::AlreadyProcessed),
            FailureKind::Program | FailureKind::Other => None,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::StaleAnchor => f.write_str("freshness anchor expired"),
            RejectReason::InsufficientFee => f.write_str("fee payer cannot cover the fee"),
            RejectReason::FeePayerNotFound => f.write_str("fee payer account not found"),
            RejectReason::AlreadyProcessed => f.write_str("transaction already processed"),
            RejectReason::Other(msg) => f.write_str(msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// The node could not be reached, timed out or rate limited us
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(RpcManagerError),

    #[error("Rejected by node: {0}")]
    RejectedByNode(RejectReason),

    /// Pre-flight simulation predicts an on-chain failure
    #[error("Simulation failed: {reason}")]
    SimulationFailed {
        reason: FailureReason,
        logs: Vec<String>,
    },

    #[error(transparent)]
    Build(#[from] TransactionBuilderError),
}

impl SubmitError {
    pub fn is_stale_anchor(&self) -> bool {
        matches!(self, SubmitError::RejectedByNode(RejectReason::StaleAnchor))
    }

    /// Worth retrying with a rebuilt envelope
    pub fn is_retryable(&self) -> bool {
        match self {
            SubmitError::NetworkUnavailable(_) => true,
            SubmitError::RejectedByNode(reason) => *reason == RejectReason::StaleAnchor,
            SubmitError::SimulationFailed { .. } => false,
            SubmitError::Build(e) => e.is_retryable(),
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            SubmitError::NetworkUnavailable(_) => "network",
            SubmitError::RejectedByNode(reason) => reason.as_str(),
            SubmitError::SimulationFailed { .. } => "simulation",
            SubmitError::Build(e) => e.category(),
        }
    }

    /// Classify a transport error raised while submitting
    pub fn from_rpc(err: RpcManagerError) -> Self {
        match err {
            RpcManagerError::BlockhashNotFound { .. } | RpcManagerError::TransactionExpired { .. } => {
                SubmitError::RejectedByNode(RejectReason::StaleAnchor)
            }
            RpcManagerError::InsufficientFunds { .. } => {
                SubmitError::RejectedByNode(RejectReason::InsufficientFee)
            }
            RpcManagerError::AccountNotFound { .. } => {
                SubmitError::RejectedByNode(RejectReason::FeePayerNotFound)
            }
            RpcManagerError::AlreadyProcessed { .. } => {
                SubmitError::RejectedByNode(RejectReason::AlreadyProcessed)
            }
            RpcManagerError::PreflightFailure { reason, logs, .. } => {
                SubmitError::SimulationFailed { reason, logs }
            }
            e if e.is_unavailable() => SubmitError::NetworkUnavailable(e),
            RpcManagerError::RpcResponse { message, .. } => {
                SubmitError::RejectedByNode(RejectReason::Other(message))
            }
            other => SubmitError::NetworkUnavailable(other),
        }
    }

    /// Classify a failed pre-flight simulation
    fn from_simulation(reason: FailureReason, logs: Vec<String>) -> Self {
        match RejectReason::from_failure(&reason) {
            Some(reject) => SubmitError::RejectedByNode(reject),
            None => SubmitError::SimulationFailed { reason, logs },
        }
    }
}

/// Proof that the node accepted a transaction into its pending pool.
///
/// Acceptance is not finality; hand the handle to a `ConfirmationTracker`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionHandle {
    signature: Signature,
    anchor: FreshnessAnchor,
    endpoint: String,
    submitted_at: DateTime<Utc>,
    correlation_id: CorrelationId,
}

impl SubmissionHandle {
    pub fn new(
        signature: Signature,
        anchor: FreshnessAnchor,
        endpoint: impl Into<String>,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            signature,
            anchor,
            endpoint: endpoint.into(),
            submitted_at: Utc::now(),
            correlation_id,
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn anchor(&self) -> &FreshnessAnchor {
        &self.anchor
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }
}

impl fmt::Display for SubmissionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature)
    }
}

/// Signs and sends transactions through a `LedgerClient`
#[derive(Clone)]
pub struct SubmissionClient {
    ledger: Arc<dyn LedgerClient>,
    config: SubmissionConfig,
}

impl fmt::Debug for SubmissionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionClient")
            .field("endpoint", &self.ledger.endpoint())
            .field("config", &self.config)
            .finish()
    }
}

impl SubmissionClient {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: SubmissionConfig) -> Self {
        Self { ledger, config }
    }

    pub fn ledger(&self) -> Arc<dyn LedgerClient> {
        Arc::clone(&self.ledger)
    }

    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    /// Lay out instructions and wrap them in an envelope for `anchor`.
    ///
    /// The first signer pays the fee.
    pub fn prepare(
        &self,
        instructions: Vec<Instruction>,
        signers: &[&dyn Signer],
        anchor: FreshnessAnchor,
    ) -> Result<UnsignedEnvelope, TransactionBuilderError> {
        let fee_payer = signers
            .first()
            .ok_or_else(|| {
                TransactionBuilderError::Configuration("At least one signer is required".to_string())
            })?
            .try_pubkey()
            .map_err(|e| TransactionBuilderError::Signing(e.to_string()))?;

        let planned = plan_instructions(
            self.config.compute_unit_limit,
            self.config.compute_unit_price,
            instructions,
        )?;
        sanity_check_ix_order(&planned)?;

        Ok(UnsignedEnvelope::new(
            planned,
            fee_payer,
            anchor,
            self.config.message_version,
        ))
    }

    /// Fetch a fresh anchor, sign and send once.
    pub async fn submit(
        &self,
        instructions: Vec<Instruction>,
        signers: &[&dyn Signer],
    ) -> Result<SubmissionHandle, SubmitError> {
        self.submit_traced(instructions, signers, &StructuredLogger::default())
            .await
    }

    async fn submit_traced(
        &self,
        instructions: Vec<Instruction>,
        signers: &[&dyn Signer],
        logger: &StructuredLogger,
    ) -> Result<SubmissionHandle, SubmitError> {
        let anchor = self.ledger.latest_anchor().await.map_err(|e| {
            metrics().network_errors.inc();
            SubmitError::from_rpc(e)
        })?;
        self.submit_with_anchor_traced(instructions, signers, anchor, logger)
            .await
    }

    /// Sign against a caller-supplied anchor and send once.
    pub async fn submit_with_anchor(
        &self,
        instructions: Vec<Instruction>,
        signers: &[&dyn Signer],
        anchor: FreshnessAnchor,
    ) -> Result<SubmissionHandle, SubmitError> {
        self.submit_with_anchor_traced(instructions, signers, anchor, &StructuredLogger::default())
            .await
    }

    async fn submit_with_anchor_traced(
        &self,
        instructions: Vec<Instruction>,
        signers: &[&dyn Signer],
        anchor: FreshnessAnchor,
        logger: &StructuredLogger,
    ) -> Result<SubmissionHandle, SubmitError> {
        let signed = self.prepare(instructions, signers, anchor)?.sign(signers)?;
        self.send(&signed, logger).await
    }

    /// Submit a caller-built envelope once.
    pub async fn submit_envelope(
        &self,
        envelope: &SignedEnvelope,
    ) -> Result<SubmissionHandle, SubmitError> {
        self.send(envelope, &StructuredLogger::default()).await
    }

    /// Submit, rebuilding with a newly fetched anchor after stale-anchor
    /// rejections (and only those), up to `max_anchor_refreshes` times.
    pub async fn submit_with_fresh_anchor(
        &self,
        instructions: Vec<Instruction>,
        signers: &[&dyn Signer],
    ) -> Result<SubmissionHandle, SubmitError> {
        self.submit_with_fresh_anchor_correlated(instructions, signers, CorrelationId::new())
            .await
    }

    /// `submit_with_fresh_anchor` logging under the caller's correlation
    /// id; the returned handle carries it on to the tracker.
    pub async fn submit_with_fresh_anchor_correlated(
        &self,
        instructions: Vec<Instruction>,
        signers: &[&dyn Signer],
        correlation_id: CorrelationId,
    ) -> Result<SubmissionHandle, SubmitError> {
        let logger = StructuredLogger::new(correlation_id);
        let mut attempt = 0u32;

        loop {
            logger.log_submit_attempt(instructions.len(), attempt);
            match self
                .submit_traced(instructions.clone(), signers, &logger)
                .await
            {
                Err(err) if err.is_stale_anchor() && attempt < self.config.max_anchor_refreshes => {
                    let delay = self.config.anchor_retry.backoff_delay(attempt);
                    logger.log_anchor_refresh(
                        attempt + 1,
                        u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    );
                    metrics().anchor_refreshes.inc();
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Build, sign and simulate without sending.
    pub async fn simulate_only(
        &self,
        instructions: Vec<Instruction>,
        signers: &[&dyn Signer],
    ) -> Result<SimulationOutcome, SubmitError> {
        let anchor = self
            .ledger
            .latest_anchor()
            .await
            .map_err(SubmitError::from_rpc)?;
        let signed = self.prepare(instructions, signers, anchor)?.sign(signers)?;
        self.ledger
            .simulate(&signed)
            .await
            .map_err(SubmitError::from_rpc)
    }

    #[instrument(skip_all, fields(signature = %envelope.signature(), context_id = %logger.context_id()))]
    async fn send(
        &self,
        envelope: &SignedEnvelope,
        logger: &StructuredLogger,
    ) -> Result<SubmissionHandle, SubmitError> {
        let timer = Timer::new();
        metrics().submissions_total.inc();

        let result = self.preflight_then_send(envelope, logger).await;
        let latency_ms = (timer.elapsed_secs() * 1000.0) as u64;

        match &result {
            Ok(handle) => {
                timer.observe_duration(&metrics().submit_latency);
                metrics().submissions_accepted.inc();
                logger.log_submit_success(&handle.to_string(), handle.endpoint(), latency_ms);
            }
            Err(err) => {
                match err {
                    SubmitError::RejectedByNode(reason) => metrics()
                        .submissions_rejected
                        .with_label_values(&[reason.as_str()])
                        .inc(),
                    SubmitError::SimulationFailed { .. } => metrics().simulation_failures.inc(),
                    SubmitError::NetworkUnavailable(_) => metrics().network_errors.inc(),
                    SubmitError::Build(_) => {}
                }
                logger.log_submit_failure(&err.to_string(), latency_ms);
            }
        }

        result
    }

    async fn preflight_then_send(
        &self,
        envelope: &SignedEnvelope,
        logger: &StructuredLogger,
    ) -> Result<SubmissionHandle, SubmitError> {
        if self.config.preflight {
            let outcome = self
                .ledger
                .simulate(envelope)
                .await
                .map_err(SubmitError::from_rpc)?;

            if let Some(reason) = outcome.err {
                logger.log_simulation_failure(&reason.to_string(), outcome.logs.len());
                return Err(SubmitError::from_simulation(reason, outcome.logs));
            }
            debug!(units_consumed = ?outcome.units_consumed, "Pre-flight simulation passed");
        }

        let signature = self
            .ledger
            .submit(envelope)
            .await
            .map_err(SubmitError::from_rpc)?;

        Ok(SubmissionHandle::new(
            signature,
            *envelope.anchor(),
            self.ledger.endpoint(),
            logger.context_id().clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rpc_classification() {
        let endpoint = "http://localhost:8899".to_string();

        assert!(SubmitError::from_rpc(RpcManagerError::BlockhashNotFound {
            endpoint: endpoint.clone()
        })
        .is_stale_anchor());

        assert!(matches!(
            SubmitError::from_rpc(RpcManagerError::Timeout {
                endpoint: endpoint.clone(),
                timeout_ms: 100
            }),
            SubmitError::NetworkUnavailable(_)
        ));

        assert!(matches!(
            SubmitError::from_rpc(RpcManagerError::InsufficientFunds {
                endpoint: endpoint.clone()
            }),
            SubmitError::RejectedByNode(RejectReason::InsufficientFee)
        ));

        assert!(matches!(
            SubmitError::from_rpc(RpcManagerError::RpcResponse {
                endpoint: endpoint.clone(),
                message: "invalid transaction".to_string(),
                code: Some(-32602),
            }),
            SubmitError::RejectedByNode(RejectReason::Other(_))
        ));

        assert!(matches!(
            SubmitError::from_rpc(RpcManagerError::PreflightFailure {
                endpoint,
                reason: FailureReason::custom(0, 6008),
                logs: vec![],
            }),
            SubmitError::SimulationFailed { .. }
        ));
    }

    #[test]
    fn test_from_simulation() {
        assert!(SubmitError::from_simulation(FailureReason::new("BlockhashNotFound"), vec![])
            .is_stale_anchor());
        assert!(matches!(
            SubmitError::from_simulation(FailureReason::custom(1, 6002), vec![]),
            SubmitError::SimulationFailed { .. }
        ));
    }

    #[test]
    fn test_retryability() {
        assert!(SubmitError::RejectedByNode(RejectReason::StaleAnchor).is_retryable());
        assert!(!SubmitError::RejectedByNode(RejectReason::InsufficientFee).is_retryable());
        assert!(!SubmitError::SimulationFailed {
            reason: FailureReason::new("x"),
            logs: vec![]
        }
        .is_retryable());
        assert_eq!(
            SubmitError::RejectedByNode(RejectReason::StaleAnchor).category(),
            "stale_anchor"
        );
    }

    #[test]
    fn test_config_defaults_from_empty_toml() {
        let config: SubmissionConfig = toml::from_str("").unwrap();
        assert_eq!(config, SubmissionConfig::default());
        assert!(config.preflight);
        assert_eq!(config.message_version, MessageVersion::V0);
    }
}
