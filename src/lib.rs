//! Dubuu client library
//!
//! Builds, submits and confirms invocations of the Dubuu marketplace
//! program on a Solana-compatible ledger.

pub mod client;
pub mod compat;
pub mod config;
pub mod confirmation;
pub mod endpoints;
pub mod errors;
pub mod metrics;
pub mod observability;
pub mod program;
pub mod structured_logging;
pub mod submission;
pub mod test_utils;
pub mod tx_builder;
pub mod types;
pub mod wallet;

// Component modules with non-standard paths (directories with spaces)
#[path = "rpc manager/mod.rs"]
pub mod rpc_manager;

// Re-export commonly used types
pub use client::{InvocationOutcome, MethodCall, ProgramClient, ProgramHandle};
pub use config::Config;
pub use confirmation::{Confirmation, ConfirmationTracker, TrackError, TrackerConfig};
pub use errors::{ClientError, ErrorKind, Remediation};
pub use rpc_manager::{LedgerClient, RpcLedger};
pub use submission::{SubmissionClient, SubmissionHandle, SubmitError};
pub use types::{ConfirmationStatus, FailureReason, FinalityLevel};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
