//! Submission client behaviour against the in-memory ledger.

use dubuu_client::program::marketplace_interface;
use dubuu_client::submission::{RejectReason, SubmissionClient, SubmissionConfig, SubmitError};
use dubuu_client::test_utils::{LedgerCall, MockLedger};
use dubuu_client::tx_builder::{AccountRefs, InstructionBuilder};
use dubuu_client::types::FailureReason;
use dubuu_client::LedgerClient;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::sync::Arc;
use std::time::Duration;

fn initialize_ix(payer: &Keypair) -> Instruction {
    let iface = marketplace_interface(Pubkey::new_unique());
    InstructionBuilder::build_method(
        &iface,
        "initialize",
        vec![],
        &AccountRefs::new().with("signer", payer.pubkey()),
    )
    .unwrap()
    .into()
}

fn client(ledger: &Arc<MockLedger>, config: SubmissionConfig) -> SubmissionClient {
    SubmissionClient::new(Arc::clone(ledger) as Arc<dyn LedgerClient>, config)
}

#[tokio::test]
async fn submit_returns_handle_for_accepted_transaction() {
    let ledger = Arc::new(MockLedger::new());
    let payer = Keypair::new();

    let handle = client(&ledger, SubmissionConfig::default())
        .submit(vec![initialize_ix(&payer)], &[&payer])
        .await
        .unwrap();

    assert!(ledger.is_landed(handle.signature()));
    assert_eq!(handle.anchor(), &ledger.current_anchor());
    assert_eq!(handle.endpoint(), "mock://ledger");
    assert!(!handle.to_string().is_empty());
    assert_eq!(
        ledger.calls(),
        vec![
            LedgerCall::LatestAnchor,
            LedgerCall::Simulate(*handle.signature()),
            LedgerCall::Submit(*handle.signature()),
        ]
    );
}

#[tokio::test]
async fn stale_anchor_is_rejected_not_hung() {
    let ledger = Arc::new(MockLedger::new());
    let payer = Keypair::new();
    let stale = ledger.expire_current_anchor();

    let config = SubmissionConfig {
        preflight: false,
        ..SubmissionConfig::default()
    };
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        client(&ledger, config).submit_with_anchor(vec![initialize_ix(&payer)], &[&payer], stale),
    )
    .await
    .expect("submission must not hang");

    assert!(matches!(
        result,
        Err(SubmitError::RejectedByNode(RejectReason::StaleAnchor))
    ));
    assert_eq!(ledger.submit_count(), 1);
}

#[tokio::test]
async fn stale_anchor_caught_by_preflight_never_reaches_submit() {
    let ledger = Arc::new(MockLedger::new());
    let payer = Keypair::new();
    let stale = ledger.expire_current_anchor();

    let err = client(&ledger, SubmissionConfig::default())
        .submit_with_anchor(vec![initialize_ix(&payer)], &[&payer], stale)
        .await
        .unwrap_err();

    assert!(err.is_stale_anchor());
    assert_eq!(ledger.simulate_count(), 1);
    assert_eq!(ledger.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn fresh_anchor_retry_rebuilds_after_stale_rejection() {
    let ledger = Arc::new(MockLedger::new());
    ledger.serve_stale_anchors(2);
    let payer = Keypair::new();

    let handle = client(&ledger, SubmissionConfig::default())
        .submit_with_fresh_anchor(vec![initialize_ix(&payer)], &[&payer])
        .await
        .unwrap();

    assert_eq!(ledger.anchor_count(), 3);
    assert_eq!(handle.anchor(), &ledger.current_anchor());
    assert_eq!(ledger.submit_count(), 1);
    assert!(ledger.is_landed(handle.signature()));
}

#[tokio::test(start_paused = true)]
async fn fresh_anchor_retry_gives_up_after_budget() {
    let ledger = Arc::new(MockLedger::new());
    ledger.serve_stale_anchors(10);
    let payer = Keypair::new();
    let config = SubmissionConfig {
        max_anchor_refreshes: 2,
        ..SubmissionConfig::default()
    };

    let err = client(&ledger, config)
        .submit_with_fresh_anchor(vec![initialize_ix(&payer)], &[&payer])
        .await
        .unwrap_err();

    assert!(err.is_stale_anchor());
    assert_eq!(ledger.anchor_count(), 3);
    assert_eq!(ledger.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn fresh_anchor_retry_does_not_retry_other_rejections() {
    let ledger = Arc::new(MockLedger::new());
    ledger.set_insufficient_fee(true);
    let payer = Keypair::new();

    let err = client(&ledger, SubmissionConfig::default())
        .submit_with_fresh_anchor(vec![initialize_ix(&payer)], &[&payer])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SubmitError::RejectedByNode(RejectReason::InsufficientFee)
    ));
    assert_eq!(ledger.anchor_count(), 1);
}

#[tokio::test]
async fn unreachable_node_is_network_unavailable() {
    let ledger = Arc::new(MockLedger::new());
    ledger.set_network_down(true);
    let payer = Keypair::new();

    let err = client(&ledger, SubmissionConfig::default())
        .submit(vec![initialize_ix(&payer)], &[&payer])
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::NetworkUnavailable(_)));
    assert!(err.is_retryable());
    assert_eq!(ledger.submit_count(), 0);
}

#[tokio::test]
async fn simulation_failure_stops_before_send() {
    let ledger = Arc::new(MockLedger::new());
    ledger.set_simulation_error(Some(FailureReason::custom(0, 6002)));
    let payer = Keypair::new();

    let err = client(&ledger, SubmissionConfig::default())
        .submit(vec![initialize_ix(&payer)], &[&payer])
        .await
        .unwrap_err();

    match err {
        SubmitError::SimulationFailed { reason, logs } => {
            assert_eq!(reason.custom_code(), Some(6002));
            assert!(!logs.is_empty());
        }
        other => panic!("expected SimulationFailed, got {other:?}"),
    }
    assert_eq!(ledger.submit_count(), 0);
}

#[tokio::test]
async fn missing_program_is_a_simulation_failure_not_a_fee_payer_rejection() {
    let ledger = Arc::new(MockLedger::new());
    ledger.set_simulation_error(Some(FailureReason::new("ProgramAccountNotFound")));
    let payer = Keypair::new();

    let err = client(&ledger, SubmissionConfig::default())
        .submit(vec![initialize_ix(&payer)], &[&payer])
        .await
        .unwrap_err();

    match &err {
        SubmitError::SimulationFailed { reason, .. } => {
            assert_eq!(reason.message(), "ProgramAccountNotFound");
        }
        other => panic!("expected SimulationFailed, got {other:?}"),
    }
    assert!(!err.to_string().contains("fee payer"));
    assert_eq!(ledger.submit_count(), 0);
}

#[tokio::test]
async fn same_envelope_is_not_accepted_twice() {
    let ledger = Arc::new(MockLedger::new());
    let payer = Keypair::new();
    let submitter = client(&ledger, SubmissionConfig::default());

    let envelope = submitter
        .prepare(vec![initialize_ix(&payer)], &[&payer], ledger.current_anchor())
        .unwrap()
        .sign(&[&payer])
        .unwrap();

    submitter.submit_envelope(&envelope).await.unwrap();
    let err = submitter.submit_envelope(&envelope).await.unwrap_err();

    assert!(matches!(
        err,
        SubmitError::RejectedByNode(RejectReason::AlreadyProcessed)
    ));
    assert_eq!(ledger.submit_count(), 2);
}

#[tokio::test]
async fn missing_signer_is_a_build_error() {
    let ledger = Arc::new(MockLedger::new());
    let payer = Keypair::new();
    let other = Keypair::new();

    let err = client(&ledger, SubmissionConfig::default())
        .submit(vec![initialize_ix(&other)], &[&payer])
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::Build(_)));
    assert_eq!(ledger.submit_count(), 0);
}
