//! Confirmation Tracker
//!
//! Polls the ledger for a submitted transaction's status until it reaches
//! the target finality, fails, or the local deadline passes. Polling backs
//! off exponentially with jitter. A timeout is a local decision only: the
//! transaction may still land, and a later `track_signature` call can
//! observe it.

use crate::metrics::metrics;
use crate::observability::CorrelationId;
use crate::rpc_manager::{LedgerClient, RetryPolicy};
use crate::structured_logging::StructuredLogger;
use crate::submission::SubmissionHandle;
use crate::types::{ConfirmationStatus, FailureReason, FinalityLevel};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use solana_sdk::signature::Signature;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Weakest finality level that counts as confirmed
    #[serde(default = "default_target")]
    pub target: FinalityLevel,

    /// Local give-up deadline, measured from the start of tracking
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff between status polls; `max_attempts` is ignored, the
    /// deadline bounds polling
    #[serde(default = "default_poll_policy")]
    pub poll: RetryPolicy,
}

fn default_target() -> FinalityLevel {
    FinalityLevel::Confirmed
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_poll_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: u32::MAX,
        base_delay_ms: 400,
        max_delay_ms: 4_000,
        jitter_factor: 0.1,
        multiplier: 1.5,
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            timeout_ms: default_timeout_ms(),
            poll: default_poll_policy(),
        }
    }
}

impl TrackerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn with_target(mut self, target: FinalityLevel) -> Self {
        self.target = target;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = saturating_millis(timeout);
        self
    }
}

/// Deadline used when the configured timeout overflows `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Holds a transaction's observed status and refuses to move it backwards.
///
/// `Pending` may become `Confirmed` or `Failed`. A `Confirmed` level may
/// only strengthen. `Failed` is final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationCell {
    status: ConfirmationStatus,
}

impl Default for ConfirmationCell {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmationCell {
    pub fn new() -> Self {
        Self {
            status: ConfirmationStatus::Pending,
        }
    }

    pub fn status(&self) -> &ConfirmationStatus {
        &self.status
    }

    /// Record an observation; returns whether the stored status changed.
    pub fn observe(&mut self, next: ConfirmationStatus) -> bool {
        let accept = match (&self.status, &next) {
            (ConfirmationStatus::Failed(_), _) => false,
            (_, ConfirmationStatus::Pending) => false,
            (ConfirmationStatus::Pending, _) => true,
            (ConfirmationStatus::Confirmed(current), ConfirmationStatus::Confirmed(level)) => {
                level > current
            }
            (ConfirmationStatus::Confirmed(_), ConfirmationStatus::Failed(_)) => false,
        };

        if accept {
            self.status = next;
        }
        accept
    }

    /// Whether tracking toward `target` can stop
    pub fn is_terminal(&self, target: FinalityLevel) -> bool {
        match &self.status {
            ConfirmationStatus::Pending => false,
            ConfirmationStatus::Confirmed(level) => *level >= target,
            ConfirmationStatus::Failed(_) => true,
        }
    }
}

/// Successful tracking result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub signature: Signature,
    /// Level observed; at least the tracker's target
    pub finality: FinalityLevel,
    /// Status queries issued
    pub attempts: u32,
    pub elapsed: Duration,
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} after {} poll(s) in {:?}",
            self.signature, self.finality, self.attempts, self.elapsed
        )
    }
}

#[derive(Debug, Clone, Error)]
pub enum TrackError {
    /// Local deadline passed without a terminal status. The transaction
    /// may still land; re-check by signature rather than resubmitting.
    #[error("Timed out waiting for {signature} after {attempts} poll(s) ({elapsed:?})")]
    Timeout {
        signature: Signature,
        attempts: u32,
        elapsed: Duration,
    },

    /// The ledger executed the transaction and it failed
    #[error("Transaction failed: {0}")]
    Failed(FailureReason),
}

impl TrackError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TrackError::Timeout { .. })
    }

    pub fn category(&self) -> &'static str {
        match self {
            TrackError::Timeout { .. } => "timeout",
            TrackError::Failed(_) => "failed",
        }
    }
}

/// Keeps the active tracker gauge accurate when a tracking future is dropped
struct ActiveTrackerGuard;

impl ActiveTrackerGuard {
    fn new() -> Self {
        metrics().active_trackers.inc();
        Self
    }
}

impl Drop for ActiveTrackerGuard {
    fn drop(&mut self) {
        metrics().active_trackers.dec();
    }
}

/// Polls a `LedgerClient` for transaction finality
#[derive(Clone)]
pub struct ConfirmationTracker {
    ledger: Arc<dyn LedgerClient>,
    config: TrackerConfig,
}

impl fmt::Debug for ConfirmationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationTracker")
            .field("endpoint", &self.ledger.endpoint())
            .field("config", &self.config)
            .finish()
    }
}

impl ConfirmationTracker {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: TrackerConfig) -> Self {
        Self { ledger, config }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Wait for the handle's transaction to reach the target finality.
    pub async fn track(&self, handle: &SubmissionHandle) -> Result<Confirmation, TrackError> {
        let logger = StructuredLogger::new(handle.correlation_id().clone());
        let result = self.poll_until_terminal(handle.signature(), &logger).await;

        if result.is_ok() {
            let since_submit = chrono::Utc::now() - handle.submitted_at();
            if let Ok(latency) = since_submit.to_std() {
                metrics()
                    .confirmation_latency
                    .observe(latency.as_secs_f64());
            }
        }
        result
    }

    /// Track by signature alone, e.g. to re-check after a timeout.
    pub async fn track_signature(&self, signature: &Signature) -> Result<Confirmation, TrackError> {
        let logger = StructuredLogger::new(CorrelationId::new());
        self.poll_until_terminal(signature, &logger).await
    }

    /// Track many handles concurrently, one independent future per handle.
    ///
    /// Results are returned in the order of `handles`.
    pub async fn track_many(
        &self,
        handles: &[SubmissionHandle],
    ) -> Vec<Result<Confirmation, TrackError>> {
        join_all(handles.iter().map(|h| self.track(h))).await
    }

    /// One status query, with no polling and no deadline.
    pub async fn query_status(
        &self,
        signature: &Signature,
    ) -> Result<ConfirmationStatus, crate::rpc_manager::RpcManagerError> {
        metrics().status_polls.inc();
        self.ledger.get_status(signature).await
    }

    async fn poll_until_terminal(
        &self,
        signature: &Signature,
        logger: &StructuredLogger,
    ) -> Result<Confirmation, TrackError> {
        let _guard = ActiveTrackerGuard::new();
        let sig = signature.to_string();
        let target = self.config.target;
        let start = Instant::now();
        let deadline = start
            .checked_add(self.config.timeout())
            .unwrap_or_else(|| start + FAR_FUTURE);

        let mut cell = ConfirmationCell::new();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            metrics().status_polls.inc();

            match timeout_at(deadline, self.ledger.get_status(signature)).await {
                Err(_) => {}
                Ok(Err(e)) => {
                    metrics().status_poll_errors.inc();
                    warn!(signature = %sig, attempt = attempts, error = %e, "Status query failed");
                }
                Ok(Ok(status)) => {
                    logger.log_status_observed(&sig, &format!("{:?}", status), attempts);
                    cell.observe(status);
                }
            }

            match cell.status() {
                ConfirmationStatus::Confirmed(finality) if *finality >= target => {
                    let elapsed = start.elapsed();
                    metrics().confirmations_confirmed.inc();
                    logger.log_confirmed(&sig, finality.as_str(), attempts, saturating_millis(elapsed));
                    return Ok(Confirmation {
                        signature: *signature,
                        finality: *finality,
                        attempts,
                        elapsed,
                    });
                }
                ConfirmationStatus::Failed(reason) => {
                    metrics().confirmations_failed.inc();
                    logger.log_execution_failed(&sig, &reason.to_string());
                    return Err(TrackError::Failed(reason.clone()));
                }
                _ => {}
            }

            let now = Instant::now();
            if now >= deadline {
                let elapsed = now - start;
                metrics().confirmation_timeouts.inc();
                logger.log_tracking_timeout(&sig, attempts, saturating_millis(elapsed));
                return Err(TrackError::Timeout {
                    signature: *signature,
                    attempts,
                    elapsed,
                });
            }

            // The last poll lands exactly on the deadline
            let delay = self.config.poll.backoff_delay(attempts - 1);
            sleep_until((now + delay).min(deadline)).await;
        }
    }
}
