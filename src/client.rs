//! Program facade
//!
//! `ProgramHandle` pins the endpoint and program id once, from
//! configuration. `ProgramClient` ties the builder, submission client and
//! confirmation tracker together behind a method-call API:
//!
//! ```rust,no_run
//! # async fn example(client: &dubuu_client::ProgramClient, payer: &solana_sdk::signature::Keypair)
//! # -> Result<(), dubuu_client::ClientError> {
//! let outcome = client.method("initialize").signer(payer).send().await?;
//! tracing::info!(signature = %outcome.signature(), "Your transaction signature");
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::confirmation::{Confirmation, ConfirmationTracker, TrackerConfig};
use crate::errors::ClientError;
use crate::observability::CorrelationId;
use crate::program::{marketplace_interface, ArgValue, ProgramInterface};
use crate::rpc_manager::{ConfigError, LedgerClient, RpcLedger};
use crate::submission::{SubmissionClient, SubmissionConfig, SubmissionHandle};
use crate::tx_builder::{AccountRefs, InstructionBuilder, MethodInstruction, TransactionBuilderError};
use crate::types::SimulationOutcome;
use solana_sdk::{pubkey::Pubkey, signature::Signature, signer::Signer};
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Resolved program metadata: which program, on which endpoint, with
/// which interface. Immutable once built.
#[derive(Debug, Clone)]
pub struct ProgramHandle {
    name: String,
    endpoint: String,
    interface: Arc<ProgramInterface>,
}

impl ProgramHandle {
    pub fn new(endpoint: impl Into<String>, interface: ProgramInterface) -> Self {
        Self {
            name: interface.name.clone(),
            endpoint: endpoint.into(),
            interface: Arc::new(interface),
        }
    }

    /// Marketplace program at the configured id and endpoint
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let program_id = config.program.program_id()?;
        let mut handle = Self::new(config.rpc.url.clone(), marketplace_interface(program_id));
        handle.name = config.program.name.clone();
        Ok(handle)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.interface.program_id
    }

    pub fn interface(&self) -> &ProgramInterface {
        &self.interface
    }
}

impl fmt::Display for ProgramHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) @ {}", self.name, self.interface.program_id, self.endpoint)
    }
}

/// Result of a confirmed invocation
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    pub handle: SubmissionHandle,
    pub confirmation: Confirmation,
}

impl InvocationOutcome {
    pub fn signature(&self) -> &Signature {
        self.handle.signature()
    }
}

/// Invokes methods of one program through a ledger
#[derive(Debug, Clone)]
pub struct ProgramClient {
    handle: ProgramHandle,
    submission: SubmissionClient,
    tracker: ConfirmationTracker,
}

impl ProgramClient {
    pub fn new(
        handle: ProgramHandle,
        ledger: Arc<dyn LedgerClient>,
        submission: SubmissionConfig,
        tracker: TrackerConfig,
    ) -> Self {
        Self {
            handle,
            submission: SubmissionClient::new(Arc::clone(&ledger), submission),
            tracker: ConfirmationTracker::new(ledger, tracker),
        }
    }

    /// Client over JSON-RPC, built entirely from `config`
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let handle = ProgramHandle::from_config(config)?;
        let ledger = RpcLedger::new(config.rpc.clone())?;
        info!(program = %handle, "Program client ready");

        Ok(Self::new(
            handle,
            Arc::new(ledger),
            config.submission.clone(),
            config.confirmation.clone(),
        ))
    }

    pub fn handle(&self) -> &ProgramHandle {
        &self.handle
    }

    pub fn submission(&self) -> &SubmissionClient {
        &self.submission
    }

    pub fn tracker(&self) -> &ConfirmationTracker {
        &self.tracker
    }

    /// Start a call to `name`
    pub fn method(&self, name: &str) -> MethodCall<'_> {
        MethodCall {
            client: self,
            method: name.to_string(),
            args: Vec::new(),
            accounts: AccountRefs::new(),
            signers: Vec::new(),
            correlation_id: None,
        }
    }
}

/// A method invocation being assembled.
///
/// The first signer pays the fee. Required signer accounts the caller
/// leaves out are filled with the fee payer.
pub struct MethodCall<'a> {
    client: &'a ProgramClient,
    method: String,
    args: Vec<ArgValue>,
    accounts: AccountRefs,
    signers: Vec<&'a dyn Signer>,
    correlation_id: Option<CorrelationId>,
}

impl fmt::Debug for MethodCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodCall")
            .field("method", &self.method)
            .field("args", &self.args)
            .field("accounts", &self.accounts)
            .field("signers", &self.signers.len())
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

impl<'a> MethodCall<'a> {
    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn args(mut self, values: impl IntoIterator<Item = ArgValue>) -> Self {
        self.args.extend(values);
        self
    }

    pub fn account(mut self, name: &str, key: Pubkey) -> Self {
        self.accounts.insert(name, key);
        self
    }

    pub fn accounts(mut self, refs: AccountRefs) -> Self {
        for name in refs.names() {
            if let Some(key) = refs.get(name) {
                self.accounts.insert(name, *key);
            }
        }
        self
    }

    pub fn signer(mut self, signer: &'a dyn Signer) -> Self {
        self.signers.push(signer);
        self
    }

    /// Log submission and confirmation under `id` instead of a fresh one
    pub fn correlation(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Build the instruction without touching the network
    pub fn instruction(&self) -> Result<MethodInstruction, TransactionBuilderError> {
        let interface = self.client.handle.interface();
        let mut accounts = self.accounts.clone();

        if let (Some(payer), Some(schema)) = (self.signers.first(), interface.method(&self.method)) {
            let payer = payer
                .try_pubkey()
                .map_err(|e| TransactionBuilderError::Signing(e.to_string()))?;
            for spec in schema.signer_accounts() {
                if !spec.optional && spec.address.is_none() && !accounts.contains(&spec.name) {
                    accounts.insert(spec.name.clone(), payer);
                }
            }
        }

        InstructionBuilder::build_method(interface, &self.method, self.args.clone(), &accounts)
    }

    /// Submit once (rebuilding only on stale anchors) without waiting
    /// for confirmation.
    #[instrument(skip_all, fields(method = %self.method))]
    pub async fn rpc(self) -> Result<SubmissionHandle, ClientError> {
        let ix = self.instruction()?;
        let correlation_id = self.correlation_id.clone().unwrap_or_default();
        let handle = self
            .client
            .submission
            .submit_with_fresh_anchor_correlated(vec![ix.into()], &self.signers, correlation_id)
            .await?;
        Ok(handle)
    }

    /// Submit and wait for the tracker's target finality
    #[instrument(skip_all, fields(method = %self.method))]
    pub async fn send(self) -> Result<InvocationOutcome, ClientError> {
        let client = self.client;
        let handle = self.rpc().await?;
        let confirmation = client.tracker.track(&handle).await?;
        Ok(InvocationOutcome {
            handle,
            confirmation,
        })
    }

    /// Simulate without sending
    pub async fn simulate(self) -> Result<SimulationOutcome, ClientError> {
        let ix = self.instruction()?;
        let outcome = self
            .client
            .submission
            .simulate_only(vec![ix.into()], &self.signers)
            .await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockLedger;
    use crate::types::{ConfirmationStatus, FailureReason, FinalityLevel};
    use solana_sdk::signature::Keypair;
    use std::time::Duration;

    fn client(ledger: Arc<MockLedger>) -> ProgramClient {
        let handle = ProgramHandle::new("mock://ledger", marketplace_interface(Pubkey::new_unique()));
        ProgramClient::new(
            handle,
            ledger,
            SubmissionConfig::default(),
            TrackerConfig::default().with_timeout(Duration::from_secs(10)),
        )
    }

    #[test]
    fn test_handle_from_config() {
        let mut config = Config::default();
        assert!(ProgramHandle::from_config(&config).is_err());

        let program_id = Pubkey::new_unique();
        config.program.program_id = Some(program_id.to_string());
        let handle = ProgramHandle::from_config(&config).unwrap();
        assert_eq!(handle.program_id(), &program_id);
        assert_eq!(handle.endpoint(), config.rpc.url);
        assert!(handle.interface().method("initialize").is_some());
    }

    #[test]
    fn test_signer_account_filled_from_payer() {
        let client = client(Arc::new(MockLedger::new()));
        let payer = Keypair::new();
        let ix = client.method("initialize").signer(&payer).instruction().unwrap();
        assert_eq!(ix.accounts().len(), 1);
        assert_eq!(ix.accounts()[0].pubkey, payer.pubkey());
        assert!(ix.accounts()[0].is_signer);
    }

    #[test]
    fn test_unknown_method() {
        let client = client(Arc::new(MockLedger::new()));
        let payer = Keypair::new();
        let err = client.method("close_marketplace").signer(&payer).instruction().unwrap_err();
        assert!(matches!(err, TransactionBuilderError::UnknownMethod { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_initialize() {
        let ledger = Arc::new(MockLedger::new().with_confirm_after_polls(2));
        let client = client(Arc::clone(&ledger));
        let payer = Keypair::new();

        let outcome = client.method("initialize").signer(&payer).send().await.unwrap();
        assert_eq!(outcome.confirmation.finality, FinalityLevel::Finalized);
        assert_eq!(outcome.confirmation.attempts, 2);
        assert_eq!(ledger.submit_count(), 1);
        assert!(!outcome.signature().to_string().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_surfaces_program_error() {
        let ledger = Arc::new(MockLedger::new());
        ledger.set_execution_error(Some(FailureReason::custom(0, 6002)));
        let client = client(Arc::clone(&ledger));
        let payer = Keypair::new();

        let err = client.method("initialize").signer(&payer).send().await.unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Failed);
        let ClientError::Track(crate::confirmation::TrackError::Failed(reason)) = err else {
            panic!("expected execution failure");
        };
        assert_eq!(
            reason.program_error(),
            Some(crate::program::MarketplaceError::MarketplacePaused)
        );
    }

    #[tokio::test]
    async fn test_simulate_does_not_submit() {
        let ledger = Arc::new(MockLedger::new());
        let client = client(Arc::clone(&ledger));
        let payer = Keypair::new();

        let outcome = client.method("initialize").signer(&payer).simulate().await.unwrap();
        assert!(outcome.is_ok());
        assert_eq!(ledger.simulate_count(), 1);
        assert_eq!(ledger.submit_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_correlation_id_reaches_handle() {
        let ledger = Arc::new(MockLedger::new());
        let client = client(Arc::clone(&ledger));
        let payer = Keypair::new();
        let id = CorrelationId::from("invoke-initialize-1");

        let outcome = client
            .method("initialize")
            .signer(&payer)
            .correlation(id.clone())
            .send()
            .await
            .unwrap();
        assert_eq!(outcome.handle.correlation_id(), &id);

        let (a, b) = (Keypair::new(), Keypair::new());
        let first = client.method("initialize").signer(&a).rpc().await.unwrap();
        let second = client.method("initialize").signer(&b).rpc().await.unwrap();
        assert_ne!(first.correlation_id(), &id);
        assert_ne!(first.correlation_id(), second.correlation_id());
    }

    #[tokio::test]
    async fn test_rpc_returns_pending_handle() {
        let ledger = Arc::new(MockLedger::new());
        let client = client(Arc::clone(&ledger));
        let payer = Keypair::new();

        let handle = client.method("initialize").signer(&payer).rpc().await.unwrap();
        assert!(ledger.is_landed(handle.signature()));
        assert_eq!(ledger.status_count(handle.signature()), 0);
        assert_eq!(
            client.tracker().query_status(handle.signature()).await.unwrap(),
            ConfirmationStatus::Confirmed(FinalityLevel::Finalized)
        );
    }
}
