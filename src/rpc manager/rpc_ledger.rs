use super::rpc_config::{ConfigError, RpcEndpointConfig};
use super::rpc_errors::RpcManagerError;
use super::LedgerClient;
use crate::tx_builder::{FreshnessAnchor, SignedEnvelope};
use crate::types::{ConfirmationStatus, FailureReason, FinalityLevel, SimulationOutcome};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig};
use solana_sdk::signature::Signature;
use solana_transaction_status::{TransactionConfirmationStatus, UiTransactionEncoding};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, instrument, warn};

/// `LedgerClient` over a single JSON-RPC endpoint.
///
/// One shared `RpcClient` (and its HTTP connection pool) serves every
/// caller; a semaphore bounds in-flight requests and status polls go
/// through a rate limiter so many concurrent trackers cannot flood the node.
pub struct RpcLedger {
    client: Arc<RpcClient>,
    config: RpcEndpointConfig,
    permits: Semaphore,
    status_limiter: DefaultDirectRateLimiter,
}

impl std::fmt::Debug for RpcLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedger")
            .field("url", &self.config.url)
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

impl RpcLedger {
    pub fn new(config: RpcEndpointConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let client = Arc::new(RpcClient::new_with_timeout_and_commitment(
            config.url.clone(),
            config.timeout(),
            config.commitment.commitment(),
        ));
        Self::with_client(client, config)
    }

    /// Wrap an existing client, sharing its connection pool
    pub fn with_client(client: Arc<RpcClient>, config: RpcEndpointConfig) -> Result<Self, ConfigError> {
        let rps = NonZeroU32::new(config.status_rate_limit_rps).ok_or_else(|| {
            ConfigError::ValidationError("status_rate_limit_rps must be > 0".to_string())
        })?;

        Ok(Self {
            client,
            permits: Semaphore::new(config.max_concurrency as usize),
            status_limiter: RateLimiter::direct(Quota::per_second(rps)),
            config,
        })
    }

    pub fn config(&self) -> &RpcEndpointConfig {
        &self.config
    }

    pub fn rpc_client(&self) -> Arc<RpcClient> {
        Arc::clone(&self.client)
    }

    async fn permit(&self) -> Result<SemaphorePermit<'_>, RpcManagerError> {
        self.permits
            .acquire()
            .await
            .map_err(|e| RpcManagerError::Internal(format!("semaphore closed: {}", e)))
    }

    fn map_err(&self, err: solana_client::client_error::ClientError) -> RpcManagerError {
        RpcManagerError::from_client_error(err, &self.config.url)
    }
}

/// Map a node-reported confirmation level onto ours.
///
/// Nodes that omit `confirmation_status` report `confirmations: None` once
/// the block is rooted.
fn finality_of(
    confirmation_status: Option<&TransactionConfirmationStatus>,
    confirmations: Option<usize>,
) -> FinalityLevel {
    match confirmation_status {
        Some(TransactionConfirmationStatus::Processed) => FinalityLevel::Processed,
        Some(TransactionConfirmationStatus::Confirmed) => FinalityLevel::Confirmed,
        Some(TransactionConfirmationStatus::Finalized) => FinalityLevel::Finalized,
        None if confirmations.is_none() => FinalityLevel::Finalized,
        None => FinalityLevel::Confirmed,
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    fn endpoint(&self) -> &str {
        &self.config.url
    }

    #[instrument(skip(self), fields(url = %self.config.url))]
    async fn latest_anchor(&self) -> Result<FreshnessAnchor, RpcManagerError> {
        let _permit = self.permit().await?;
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(self.config.commitment.commitment())
            .await
            .map_err(|e| self.map_err(e))?;

        debug!(%blockhash, last_valid_block_height, "Fetched freshness anchor");
        Ok(FreshnessAnchor::new(blockhash, last_valid_block_height))
    }

    #[instrument(skip(self, envelope), fields(signature = %envelope.signature()))]
    async fn simulate(&self, envelope: &SignedEnvelope) -> Result<SimulationOutcome, RpcManagerError> {
        let _permit = self.permit().await?;
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: false,
            commitment: Some(self.config.commitment.commitment()),
            encoding: Some(UiTransactionEncoding::Base64),
            ..Default::default()
        };

        let response = self
            .client
            .simulate_transaction_with_config(envelope.transaction(), config)
            .await
            .map_err(|e| self.map_err(e))?;

        let result = response.value;
        Ok(SimulationOutcome {
            err: result
                .err
                .as_ref()
                .map(|e| FailureReason::parse(&format!("{:?}", e))),
            logs: result.logs.unwrap_or_default(),
            units_consumed: result.units_consumed,
        })
    }

    #[instrument(skip(self, envelope), fields(signature = %envelope.signature()))]
    async fn submit(&self, envelope: &SignedEnvelope) -> Result<Signature, RpcManagerError> {
        let _permit = self.permit().await?;
        let config = RpcSendTransactionConfig {
            skip_preflight: self.config.skip_preflight,
            preflight_commitment: Some(self.config.commitment.commitment().commitment),
            encoding: Some(UiTransactionEncoding::Base64),
            max_retries: self.config.max_node_retries,
            ..Default::default()
        };

        let signature = self
            .client
            .send_transaction_with_config(envelope.transaction(), config)
            .await
            .map_err(|e| self.map_err(e))?;

        if signature != envelope.signature() {
            warn!(
                expected = %envelope.signature(),
                returned = %signature,
                "Node returned unexpected signature"
            );
        }
        Ok(signature)
    }

    #[instrument(skip(self), fields(url = %self.config.url))]
    async fn get_status(&self, signature: &Signature) -> Result<ConfirmationStatus, RpcManagerError> {
        self.status_limiter.until_ready().await;
        let _permit = self.permit().await?;

        let signatures = [*signature];
        let response = if self.config.search_history {
            self.client
                .get_signature_statuses_with_history(&signatures)
                .await
        } else {
            self.client.get_signature_statuses(&signatures).await
        }
        .map_err(|e| self.map_err(e))?;

        let status = match response.value.into_iter().next().flatten() {
            None => ConfirmationStatus::Pending,
            Some(status) => match &status.err {
                Some(err) => ConfirmationStatus::Failed(FailureReason::parse(&format!("{:?}", err))),
                None => ConfirmationStatus::Confirmed(finality_of(
                    status.confirmation_status.as_ref(),
                    status.confirmations,
                )),
            },
        };

        debug!(%signature, ?status, "Signature status");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finality_mapping() {
        assert_eq!(
            finality_of(Some(&TransactionConfirmationStatus::Processed), Some(0)),
            FinalityLevel::Processed
        );
        assert_eq!(
            finality_of(Some(&TransactionConfirmationStatus::Finalized), None),
            FinalityLevel::Finalized
        );
        assert_eq!(finality_of(None, None), FinalityLevel::Finalized);
        assert_eq!(finality_of(None, Some(3)), FinalityLevel::Confirmed);
    }

    #[test]
    fn test_new_validates_config() {
        assert!(RpcLedger::new(RpcEndpointConfig::from_url("ftp://nope")).is_err());

        let ledger = RpcLedger::new(RpcEndpointConfig::default()).unwrap();
        assert_eq!(ledger.endpoint(), crate::rpc_manager::rpc_config::DEFAULT_RPC_URL);
    }
}
