//! Structured logging for the invocation lifecycle

use crate::observability::CorrelationId;

/// Logger bound to one invocation's correlation id
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context_id: CorrelationId,
}

impl StructuredLogger {
    pub fn new(context_id: CorrelationId) -> Self {
        Self { context_id }
    }

    pub fn context_id(&self) -> &CorrelationId {
        &self.context_id
    }

    pub fn log_submit_attempt(&self, ix_count: usize, attempt: u32) {
        tracing::info!(
            context_id = %self.context_id,
            ix_count = %ix_count,
            attempt = %attempt,
            "Submitting transaction"
        );
    }

    pub fn log_submit_success(&self, sig: &str, endpoint: &str, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            signature = %sig,
            endpoint = %endpoint,
            latency_ms = %latency_ms,
            "Transaction accepted by node"
        );
    }

    pub fn log_submit_failure(&self, error: &str, latency_ms: u64) {
        tracing::warn!(
            context_id = %self.context_id,
            error = %error,
            latency_ms = %latency_ms,
            "Transaction submission failed"
        );
    }

    pub fn log_simulation_failure(&self, reason: &str, log_lines: usize) {
        tracing::warn!(
            context_id = %self.context_id,
            reason = %reason,
            log_lines = %log_lines,
            "Pre-flight simulation failed"
        );
    }

    pub fn log_anchor_refresh(&self, attempt: u32, delay_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            attempt = %attempt,
            delay_ms = %delay_ms,
            "Anchor expired, rebuilding with a fresh anchor"
        );
    }

    pub fn log_status_observed(&self, sig: &str, status: &str, attempt: u32) {
        tracing::debug!(
            context_id = %self.context_id,
            signature = %sig,
            status = %status,
            attempt = %attempt,
            "Status observed"
        );
    }

    pub fn log_confirmed(&self, sig: &str, finality: &str, attempts: u32, elapsed_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            signature = %sig,
            finality = %finality,
            attempts = %attempts,
            elapsed_ms = %elapsed_ms,
            "Transaction confirmed"
        );
    }

    pub fn log_execution_failed(&self, sig: &str, reason: &str) {
        tracing::error!(
            context_id = %self.context_id,
            signature = %sig,
            reason = %reason,
            "Transaction failed on ledger"
        );
    }

    pub fn log_tracking_timeout(&self, sig: &str, attempts: u32, elapsed_ms: u64) {
        tracing::warn!(
            context_id = %self.context_id,
            signature = %sig,
            attempts = %attempts,
            elapsed_ms = %elapsed_ms,
            "Gave up waiting for confirmation; status may still change"
        );
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(
            context_id = %self.context_id,
            message = %message,
            "Warning"
        );
    }
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new(CorrelationId::new())
    }
}
