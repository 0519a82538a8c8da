//! Ledger RPC transport
//!
//! The executor only needs four calls from the network; they sit behind the
//! [`Ledger`] trait so tests can script them. [`RpcLedger`] is the production
//! implementation over the nonblocking `solana-client` RpcClient.

use async_trait::async_trait;
use solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::UiTransactionEncoding;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::RpcConfig;
use crate::errors::{SwapError, SwapResult};

/// Send options for a signed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastOptions {
    pub skip_preflight: bool,
    /// Rebroadcast attempts the RPC node performs on our behalf
    pub max_retries: usize,
}

/// What the ledger currently knows about a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    /// Not seen yet, or seen below the requested commitment
    Pending,
    /// Landed and reached the requested commitment
    Landed,
    /// Landed with an execution error
    Failed(String),
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Latest blockhash and the last block height at which it is valid
    async fn latest_blockhash(&self) -> SwapResult<(Hash, u64)>;

    /// Submit a signed transaction; resolves once the node accepts it
    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        options: BroadcastOptions,
    ) -> SwapResult<Signature>;

    async fn signature_state(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> SwapResult<SignatureState>;

    async fn block_height(&self, commitment: CommitmentConfig) -> SwapResult<u64>;
}

/// Ledger backed by a Solana JSON-RPC endpoint
#[derive(Clone)]
pub struct RpcLedger {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl std::fmt::Debug for RpcLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedger")
            .field("url", &self.client.url())
            .field("commitment", &self.commitment)
            .finish()
    }
}

impl RpcLedger {
    pub fn new(client: Arc<RpcClient>, commitment: CommitmentConfig) -> Self {
        Self { client, commitment }
    }

    pub fn from_config(config: &RpcConfig, commitment: CommitmentConfig) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            commitment,
        );
        Self::new(Arc::new(client), commitment)
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn latest_blockhash(&self) -> SwapResult<(Hash, u64)> {
        Ok(self
            .client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await?)
    }

    #[instrument(skip(self, transaction), fields(max_retries = options.max_retries))]
    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        options: BroadcastOptions,
    ) -> SwapResult<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            max_retries: Some(options.max_retries),
            encoding: Some(UiTransactionEncoding::Base64),
            ..RpcSendTransactionConfig::default()
        };
        self.client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(|e| SwapError::Broadcast(e.to_string()))
    }

    async fn signature_state(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> SwapResult<SignatureState> {
        let statuses = self.client.get_signature_statuses(&[*signature]).await?.value;
        let state = match statuses.into_iter().next().flatten() {
            None => SignatureState::Pending,
            Some(status) => match status.err {
                Some(err) => SignatureState::Failed(err.to_string()),
                None if status.satisfies_commitment(commitment) => SignatureState::Landed,
                None => SignatureState::Pending,
            },
        };
        debug!(signature = %signature, state = ?state, "Signature status");
        Ok(state)
    }

    async fn block_height(&self, commitment: CommitmentConfig) -> SwapResult<u64> {
        Ok(self.client.get_block_height_with_commitment(commitment).await?)
    }
}
