//! RPC Manager Module
//!
//! Ledger transport: the `LedgerClient` seam used by submission and
//! confirmation, and `RpcLedger`, its JSON-RPC implementation.

use crate::tx_builder::{FreshnessAnchor, SignedEnvelope};
use crate::types::{ConfirmationStatus, SimulationOutcome};
use async_trait::async_trait;
use solana_sdk::signature::Signature;

// Submodules
pub mod rpc_config;
pub mod rpc_errors;
pub mod rpc_ledger;

// Re-exports for convenience
pub use rpc_config::{ConfigError, RpcEndpointConfig};
pub use rpc_errors::{RetryPolicy, RpcManagerError};
pub use rpc_ledger::RpcLedger;

/// Operations the client needs from a ledger node.
///
/// There is no cancellation operation: once sent, a transaction either
/// lands before its anchor expires or it does not.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Identifier of the node (its URL for RPC transports)
    fn endpoint(&self) -> &str;

    /// Fetch a fresh anchor to build transactions against
    async fn latest_anchor(&self) -> Result<FreshnessAnchor, RpcManagerError>;

    /// Execute the envelope without committing it
    async fn simulate(&self, envelope: &SignedEnvelope) -> Result<SimulationOutcome, RpcManagerError>;

    /// Send the envelope once; returns the signature the node accepted
    async fn submit(&self, envelope: &SignedEnvelope) -> Result<Signature, RpcManagerError>;

    /// Current status of a previously submitted transaction
    async fn get_status(&self, signature: &Signature) -> Result<ConfirmationStatus, RpcManagerError>;
}
