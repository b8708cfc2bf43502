//! Test Utilities Module
//!
//! `MockLedger` is a scriptable, in-memory `LedgerClient`. It records every
//! call, rejects expired anchors the way a real node does and confirms a
//! transaction after a configurable number of status polls.
//!
//! Only compiled when running tests or with the `test_utils` feature.

#![cfg(any(test, feature = "test_utils"))]

use crate::rpc_manager::{LedgerClient, RpcManagerError};
use crate::tx_builder::{FreshnessAnchor, SignedEnvelope};
use crate::types::{ConfirmationStatus, FailureReason, FinalityLevel, SimulationOutcome};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use solana_sdk::{hash::Hash, signature::Signature};
use std::collections::HashSet;

pub const MOCK_ENDPOINT: &str = "mock://ledger";

/// A call made against the mock, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    LatestAnchor,
    Simulate(Signature),
    Submit(Signature),
    GetStatus(Signature),
}

#[derive(Debug)]
struct TxRecord {
    polls: u32,
    execution_error: Option<FailureReason>,
    forced_status: Option<ConfirmationStatus>,
}

#[derive(Debug)]
struct MockState {
    current_anchor: FreshnessAnchor,
    expired_anchors: HashSet<Hash>,
    stale_anchors_to_serve: u32,
    confirm_after_polls: u32,
    finality: FinalityLevel,
    execution_error: Option<FailureReason>,
    simulation_error: Option<FailureReason>,
    network_down: bool,
    insufficient_fee: bool,
    next_block_height: u64,
}

impl MockState {
    fn fresh_anchor(&mut self) -> FreshnessAnchor {
        self.next_block_height += 150;
        FreshnessAnchor::new(Hash::new_unique(), self.next_block_height)
    }
}

/// In-memory ledger for deterministic tests
#[derive(Debug)]
pub struct MockLedger {
    state: Mutex<MockState>,
    transactions: DashMap<Signature, TxRecord>,
    calls: Mutex<Vec<LedgerCall>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    /// A healthy ledger that finalizes transactions on the first poll
    pub fn new() -> Self {
        let mut state = MockState {
            current_anchor: FreshnessAnchor::new(Hash::default(), 0),
            expired_anchors: HashSet::new(),
            stale_anchors_to_serve: 0,
            confirm_after_polls: 1,
            finality: FinalityLevel::Finalized,
            execution_error: None,
            simulation_error: None,
            network_down: false,
            insufficient_fee: false,
            next_block_height: 1_000,
        };
        state.current_anchor = state.fresh_anchor();

        Self {
            state: Mutex::new(state),
            transactions: DashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_confirm_after_polls(self, polls: u32) -> Self {
        self.set_confirm_after_polls(polls);
        self
    }

    pub fn with_finality(self, finality: FinalityLevel) -> Self {
        self.state.lock().finality = finality;
        self
    }

    /// Number of status polls after which a landed transaction reports
    /// its outcome. Applies to transactions already submitted too.
    pub fn set_confirm_after_polls(&self, polls: u32) {
        self.state.lock().confirm_after_polls = polls;
    }

    /// Make transactions submitted from now on fail during execution
    pub fn set_execution_error(&self, reason: Option<FailureReason>) {
        self.state.lock().execution_error = reason;
    }

    pub fn set_simulation_error(&self, reason: Option<FailureReason>) {
        self.state.lock().simulation_error = reason;
    }

    pub fn set_network_down(&self, down: bool) {
        self.state.lock().network_down = down;
    }

    pub fn set_insufficient_fee(&self, insufficient: bool) {
        self.state.lock().insufficient_fee = insufficient;
    }

    /// Expire the anchor currently handed out and start serving a new one
    pub fn expire_current_anchor(&self) -> FreshnessAnchor {
        let mut state = self.state.lock();
        let old = state.current_anchor;
        state.expired_anchors.insert(old.blockhash);
        state.current_anchor = state.fresh_anchor();
        old
    }

    /// The next `count` anchor fetches return anchors that are already expired
    pub fn serve_stale_anchors(&self, count: u32) {
        self.state.lock().stale_anchors_to_serve = count;
    }

    /// Report `status` for `signature` on every following poll
    pub fn force_status(&self, signature: &Signature, status: ConfirmationStatus) {
        self.transactions
            .entry(*signature)
            .or_insert_with(|| TxRecord {
                polls: 0,
                execution_error: None,
                forced_status: None,
            })
            .forced_status = Some(status);
    }

    pub fn current_anchor(&self) -> FreshnessAnchor {
        self.state.lock().current_anchor
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().clone()
    }

    pub fn submit_count(&self) -> usize {
        self.count_calls(|c| matches!(c, LedgerCall::Submit(_)))
    }

    pub fn anchor_count(&self) -> usize {
        self.count_calls(|c| matches!(c, LedgerCall::LatestAnchor))
    }

    pub fn simulate_count(&self) -> usize {
        self.count_calls(|c| matches!(c, LedgerCall::Simulate(_)))
    }

    pub fn status_count(&self, signature: &Signature) -> usize {
        self.count_calls(|c| c == &LedgerCall::GetStatus(*signature))
    }

    pub fn is_landed(&self, signature: &Signature) -> bool {
        self.transactions.contains_key(signature)
    }

    fn count_calls(&self, pred: impl Fn(&LedgerCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: LedgerCall) {
        self.calls.lock().push(call);
    }

    fn unreachable_error() -> RpcManagerError {
        RpcManagerError::Transport {
            endpoint: MOCK_ENDPOINT.to_string(),
            message: "connection refused".to_string(),
        }
    }

    /// Node-side validation shared by simulate and submit
    fn validate(&self, envelope: &SignedEnvelope) -> Result<(), FailureReason> {
        let state = self.state.lock();
        if state.expired_anchors.contains(&envelope.anchor().blockhash) {
            return Err(FailureReason::new("BlockhashNotFound"));
        }
        if state.insufficient_fee {
            return Err(FailureReason::new("InsufficientFundsForFee"));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    fn endpoint(&self) -> &str {
        MOCK_ENDPOINT
    }

    async fn latest_anchor(&self) -> Result<FreshnessAnchor, RpcManagerError> {
        self.record(LedgerCall::LatestAnchor);
        let mut state = self.state.lock();
        if state.network_down {
            return Err(Self::unreachable_error());
        }

        if state.stale_anchors_to_serve > 0 {
            state.stale_anchors_to_serve -= 1;
            let stale = state.fresh_anchor();
            state.expired_anchors.insert(stale.blockhash);
            return Ok(stale);
        }

        Ok(state.current_anchor)
    }

    async fn simulate(&self, envelope: &SignedEnvelope) -> Result<SimulationOutcome, RpcManagerError> {
        self.record(LedgerCall::Simulate(envelope.signature()));
        if self.state.lock().network_down {
            return Err(Self::unreachable_error());
        }

        let err = match self.validate(envelope) {
            Err(reason) => Some(reason),
            Ok(()) => self.state.lock().simulation_error.clone(),
        };

        Ok(SimulationOutcome {
            logs: vec![
                "Program log: Instruction: simulated".to_string(),
                format!("Program consumed {} compute units", 1_200),
            ],
            units_consumed: Some(1_200),
            err,
        })
    }

    async fn submit(&self, envelope: &SignedEnvelope) -> Result<Signature, RpcManagerError> {
        let signature = envelope.signature();
        self.record(LedgerCall::Submit(signature));
        if self.state.lock().network_down {
            return Err(Self::unreachable_error());
        }

        if let Err(reason) = self.validate(envelope) {
            return Err(RpcManagerError::from_failure(reason, Vec::new(), MOCK_ENDPOINT));
        }

        if self.transactions.contains_key(&signature) {
            return Err(RpcManagerError::AlreadyProcessed {
                endpoint: MOCK_ENDPOINT.to_string(),
            });
        }

        let execution_error = self.state.lock().execution_error.clone();
        self.transactions.insert(
            signature,
            TxRecord {
                polls: 0,
                execution_error,
                forced_status: None,
            },
        );
        Ok(signature)
    }

    async fn get_status(&self, signature: &Signature) -> Result<ConfirmationStatus, RpcManagerError> {
        self.record(LedgerCall::GetStatus(*signature));
        let (network_down, confirm_after, finality) = {
            let state = self.state.lock();
            (state.network_down, state.confirm_after_polls, state.finality)
        };
        if network_down {
            return Err(Self::unreachable_error());
        }

        let Some(mut record) = self.transactions.get_mut(signature) else {
            return Ok(ConfirmationStatus::Pending);
        };

        if let Some(forced) = &record.forced_status {
            return Ok(forced.clone());
        }

        record.polls += 1;
        if record.polls < confirm_after {
            return Ok(ConfirmationStatus::Pending);
        }

        Ok(match &record.execution_error {
            Some(reason) => ConfirmationStatus::Failed(reason.clone()),
            None => ConfirmationStatus::Confirmed(finality),
        })
    }
}
