//! Swap execution
//!
//! Turns an accepted [`Quote`] into a settled (or expired, or failed) ledger
//! transaction:
//!
//! 1. `prepare`   - preconditions, aggregator build, payload decode
//! 2. `sign`      - external signer raced against the abort signal
//! 3. `broadcast` - submit once, return the signature as soon as accepted
//! 4. `confirm`   - poll status and block height until a terminal outcome
//!
//! Nothing is broadcast after an abort is observed. Once a transaction has
//! been broadcast an abort only stops observation.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::abort::AbortSignal;
use crate::aggregator::{Aggregator, BuildRequest};
use crate::config::Config;
use crate::errors::{SwapError, SwapResult};
use crate::ledger::{BroadcastOptions, Ledger, SignatureState};
use crate::metrics::metrics;
use crate::quote::Quote;
use crate::retry::RetryPolicy;
use crate::wallet::TransactionSigner;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub max_quote_age: Duration,
    pub broadcast: BroadcastOptions,
    pub poll_interval: Duration,
    pub commitment: CommitmentConfig,
    /// Applied to each status / block height call while confirming
    pub rpc_policy: RetryPolicy,
    pub wrap_and_unwrap_sol: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_quote_age: Duration::from_secs(30),
            broadcast: BroadcastOptions {
                skip_preflight: true,
                max_retries: 2,
            },
            poll_interval: Duration::from_millis(2000),
            commitment: CommitmentConfig::confirmed(),
            rpc_policy: RetryPolicy::exponential(
                3,
                Duration::from_millis(250),
                Duration::from_secs(2),
            ),
            wrap_and_unwrap_sol: true,
        }
    }
}

impl ExecutorConfig {
    pub fn from_config(config: &Config) -> Self {
        let execution = &config.execution;
        Self {
            max_quote_age: Duration::from_secs(execution.max_quote_age_secs),
            broadcast: BroadcastOptions {
                skip_preflight: true,
                max_retries: execution.broadcast_max_retries,
            },
            poll_interval: Duration::from_millis(execution.confirm_poll_interval_ms),
            commitment: config.commitment(),
            rpc_policy: RetryPolicy::exponential(
                execution.rpc_max_attempts,
                Duration::from_millis(250),
                Duration::from_secs(2),
            ),
            wrap_and_unwrap_sol: execution.wrap_and_unwrap_sol,
        }
    }
}

/// Unsigned transaction built for an accepted quote
#[derive(Debug)]
pub struct SigningRequest<'q> {
    pub quote: &'q Quote,
    pub signer_pubkey: Pubkey,
    pub unsigned_transaction_bytes: Vec<u8>,
    /// Block height after which the embedded blockhash is no longer valid
    pub last_valid_block_height: u64,
}

/// Serialized transaction owned by one execution attempt
#[derive(Debug)]
pub struct TransactionEnvelope {
    pub raw_bytes: Vec<u8>,
    pub transaction: VersionedTransaction,
    /// Fee payer signature once signed
    pub signature: Option<Signature>,
}

impl TransactionEnvelope {
    pub fn decode(raw_bytes: Vec<u8>) -> SwapResult<Self> {
        let transaction: VersionedTransaction = bincode::deserialize(&raw_bytes)
            .map_err(|e| SwapError::BuildFailed(format!("undecodable transaction: {}", e)))?;
        if transaction.signatures.is_empty() {
            return Err(SwapError::BuildFailed("transaction has no signature slots".into()));
        }
        Ok(Self {
            raw_bytes,
            transaction,
            signature: None,
        })
    }

    fn signed(transaction: VersionedTransaction) -> SwapResult<Self> {
        let signature = transaction
            .signatures
            .first()
            .copied()
            .filter(|sig| *sig != Signature::default())
            .ok_or_else(|| SwapError::Signing("signer returned an unsigned transaction".into()))?;
        let raw_bytes =
            bincode::serialize(&transaction).map_err(|e| SwapError::Signing(e.to_string()))?;
        Ok(Self {
            raw_bytes,
            transaction,
            signature: Some(signature),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Confirmed,
    /// Validity window passed without an observed status; settlement unknown
    Expired,
    Failed,
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationResult {
    pub status: ConfirmationStatus,
    pub signature: Signature,
    pub observed_at: DateTime<Utc>,
    pub last_valid_block_height: u64,
    /// Ledger-provided detail for `Failed`
    pub error: Option<String>,
}

impl ConfirmationResult {
    pub fn is_confirmed(&self) -> bool {
        self.status == ConfirmationStatus::Confirmed
    }

    /// `Ok` only for a confirmed transaction
    pub fn into_result(self) -> SwapResult<Signature> {
        match self.status {
            ConfirmationStatus::Confirmed => Ok(self.signature),
            ConfirmationStatus::Expired => Err(SwapError::ConfirmationExpired {
                signature: self.signature.to_string(),
                last_valid_block_height: self.last_valid_block_height,
            }),
            ConfirmationStatus::Failed => Err(SwapError::TransactionFailed {
                signature: self.signature.to_string(),
                detail: self.error.unwrap_or_else(|| "unknown error".into()),
            }),
        }
    }
}

/// Step boundary reported by [`SwapExecutor::execute_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStep {
    /// Signed; about to be submitted
    Broadcasting,
    /// Accepted by the ledger; confirmation polling starts
    Broadcast(Signature),
}

fn track_started() {
    let m = metrics();
    m.swaps_started.inc();
    m.active_swaps.inc();
}

fn track_finished(result: &SwapResult<ConfirmationResult>) {
    let m = metrics();
    m.active_swaps.dec();
    match result {
        Ok(outcome) => match outcome.status {
            ConfirmationStatus::Confirmed => m.swaps_confirmed.inc(),
            ConfirmationStatus::Expired => m.swaps_expired.inc(),
            ConfirmationStatus::Failed => m.swaps_failed.inc(),
        },
        Err(SwapError::SigningAborted) => m.swaps_aborted.inc(),
        Err(_) => m.swaps_failed.inc(),
    }
}

/// Builds, signs, broadcasts and confirms swap transactions
pub struct SwapExecutor {
    aggregator: Arc<dyn Aggregator>,
    ledger: Arc<dyn Ledger>,
    config: ExecutorConfig,
}

impl SwapExecutor {
    pub fn new(
        aggregator: Arc<dyn Aggregator>,
        ledger: Arc<dyn Ledger>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            aggregator,
            ledger,
            config,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run every step for `quote`. The quote is consumed whatever the outcome.
    pub async fn execute(
        &self,
        quote: Quote,
        signer: &dyn TransactionSigner,
        abort: &AbortSignal,
    ) -> SwapResult<ConfirmationResult> {
        self.execute_with(quote, signer, abort, |_| Ok(())).await
    }

    /// Like [`execute`](Self::execute), reporting each [`ExecutionStep`] to
    /// `on_step` as it is reached. An error from `on_step` stops execution.
    #[instrument(
        skip_all,
        fields(input = %quote.input(), output = %quote.output(), in_amount = quote.in_amount())
    )]
    pub async fn execute_with<F>(
        &self,
        quote: Quote,
        signer: &dyn TransactionSigner,
        abort: &AbortSignal,
        on_step: F,
    ) -> SwapResult<ConfirmationResult>
    where
        F: FnMut(ExecutionStep) -> SwapResult<()>,
    {
        track_started();
        let result = self.run_steps(&quote, signer, abort, on_step).await;
        track_finished(&result);
        result
    }

    async fn run_steps<F>(
        &self,
        quote: &Quote,
        signer: &dyn TransactionSigner,
        abort: &AbortSignal,
        mut on_step: F,
    ) -> SwapResult<ConfirmationResult>
    where
        F: FnMut(ExecutionStep) -> SwapResult<()>,
    {
        let request = tokio::select! {
            biased;
            _ = abort.aborted() => return Err(SwapError::SigningAborted),
            request = self.prepare(quote, signer) => request?,
        };
        let last_valid_block_height = request.last_valid_block_height;
        let envelope = TransactionEnvelope::decode(request.unsigned_transaction_bytes)?;
        let envelope = self.sign(envelope, signer, abort).await?;

        on_step(ExecutionStep::Broadcasting)?;
        let signature = self.broadcast(envelope, abort).await?;
        on_step(ExecutionStep::Broadcast(signature))?;

        self.confirm(signature, last_valid_block_height, abort).await
    }

    /// Check preconditions and obtain the unsigned transaction for `quote`
    ///
    /// Fails without any network call when the signer is not ready or the
    /// quote is older than the configured maximum age.
    pub async fn prepare<'q>(
        &self,
        quote: &'q Quote,
        signer: &dyn TransactionSigner,
    ) -> SwapResult<SigningRequest<'q>> {
        if !signer.is_ready() {
            return Err(SwapError::SignerUnavailable("no wallet connected".into()));
        }
        let age = quote.age();
        if age > self.config.max_quote_age {
            return Err(SwapError::QuoteStale {
                age_ms: age.as_millis() as u64,
                max_age_ms: self.config.max_quote_age.as_millis() as u64,
            });
        }

        let signer_pubkey = signer.pubkey();
        let request = BuildRequest {
            quote_response: quote.raw_response(),
            user_public_key: signer_pubkey.to_string(),
            wrap_and_unwrap_sol: self.config.wrap_and_unwrap_sol,
        };
        let built = self.aggregator.build_swap(&request).await?;
        let unsigned_transaction_bytes = BASE64
            .decode(built.swap_transaction.trim())
            .map_err(|e| SwapError::BuildFailed(format!("invalid base64 payload: {}", e)))?;

        let last_valid_block_height = match built.last_valid_block_height {
            Some(height) => height,
            None => self.ledger.latest_blockhash().await?.1,
        };
        debug!(
            payload_bytes = unsigned_transaction_bytes.len(),
            last_valid_block_height,
            "Swap transaction built"
        );

        Ok(SigningRequest {
            quote,
            signer_pubkey,
            unsigned_transaction_bytes,
            last_valid_block_height,
        })
    }

    /// Ask the signer for a signature, giving up as soon as `abort` is raised
    pub async fn sign(
        &self,
        envelope: TransactionEnvelope,
        signer: &dyn TransactionSigner,
        abort: &AbortSignal,
    ) -> SwapResult<TransactionEnvelope> {
        if abort.is_aborted() {
            return Err(SwapError::SigningAborted);
        }
        let signed = tokio::select! {
            biased;
            _ = abort.aborted() => {
                info!("Signing aborted by caller");
                return Err(SwapError::SigningAborted);
            }
            signed = signer.sign(envelope.transaction) => signed?,
        };
        TransactionEnvelope::signed(signed)
    }

    /// Submit a signed envelope. Consumes it; a broadcast is never repeated.
    pub async fn broadcast(
        &self,
        envelope: TransactionEnvelope,
        abort: &AbortSignal,
    ) -> SwapResult<Signature> {
        if envelope.signature.is_none() {
            return Err(SwapError::Signing("refusing to broadcast an unsigned transaction".into()));
        }
        // last point at which an abort has no side effect
        if abort.is_aborted() {
            return Err(SwapError::SigningAborted);
        }
        let signature = self
            .ledger
            .send_transaction(&envelope.transaction, self.config.broadcast)
            .await?;
        info!(signature = %signature, bytes = envelope.raw_bytes.len(), "Transaction broadcast");
        Ok(signature)
    }

    /// Poll until the signature lands, fails, or the validity window passes
    pub async fn confirm(
        &self,
        signature: Signature,
        last_valid_block_height: u64,
        abort: &AbortSignal,
    ) -> SwapResult<ConfirmationResult> {
        let started = Instant::now();
        let abandoned = || SwapError::ObservationAbandoned {
            signature: signature.to_string(),
        };

        let outcome = loop {
            let state = tokio::select! {
                biased;
                _ = abort.aborted() => return Err(abandoned()),
                state = self.poll_state(&signature) => state?,
            };
            match state {
                SignatureState::Landed => break (ConfirmationStatus::Confirmed, None),
                SignatureState::Failed(detail) => break (ConfirmationStatus::Failed, Some(detail)),
                SignatureState::Pending => {}
            }

            let height = tokio::select! {
                biased;
                _ = abort.aborted() => return Err(abandoned()),
                height = self.poll_block_height() => height?,
            };
            if height > last_valid_block_height {
                warn!(
                    signature = %signature,
                    block_height = height,
                    last_valid_block_height,
                    "Blockhash expired before confirmation"
                );
                break (ConfirmationStatus::Expired, None);
            }

            tokio::select! {
                biased;
                _ = abort.aborted() => return Err(abandoned()),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        };

        metrics().confirmation_latency.observe(started.elapsed().as_secs_f64());
        let (status, error) = outcome;
        info!(signature = %signature, status = %status, "Confirmation settled");
        Ok(ConfirmationResult {
            status,
            signature,
            observed_at: Utc::now(),
            last_valid_block_height,
            error,
        })
    }

    async fn poll_state(&self, signature: &Signature) -> SwapResult<SignatureState> {
        let ledger = &self.ledger;
        let commitment = self.config.commitment;
        self.config
            .rpc_policy
            .run("signature_status", || async move {
                ledger.signature_state(signature, commitment).await
            })
            .await
            .map_err(|failure| failure.error)
    }

    async fn poll_block_height(&self) -> SwapResult<u64> {
        let ledger = &self.ledger;
        let commitment = self.config.commitment;
        self.config
            .rpc_policy
            .run("block_height", || async move { ledger.block_height(commitment).await })
            .await
            .map_err(|failure| failure.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::abort_pair;
    use crate::assets;
    use crate::test_utils::{MockAggregator, MockLedger, MockSigner, SignerBehavior};
    use serde_json::json;

    async fn fresh_quote() -> Quote {
        let raw = json!({
            "inputMint": assets::SOL_MINT,
            "outputMint": assets::USDC_MINT,
            "inAmount": "1500000000",
            "outAmount": "150000000",
        });
        Quote::from_response(assets::sol(), assets::usdc(), 50, raw).unwrap()
    }

    fn executor(aggregator: Arc<MockAggregator>, ledger: Arc<MockLedger>) -> SwapExecutor {
        SwapExecutor::new(aggregator, ledger, ExecutorConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_on_first_poll() {
        let aggregator = Arc::new(MockAggregator::new());
        let ledger = Arc::new(MockLedger::new());
        let signer = MockSigner::new(SignerBehavior::Sign);

        let result = executor(aggregator.clone(), ledger.clone())
            .execute(fresh_quote().await, &signer, &AbortSignal::never())
            .await
            .unwrap();

        assert_eq!(result.status, ConfirmationStatus::Confirmed);
        assert_eq!(ledger.send_calls(), 1);
        assert_eq!(aggregator.build_calls(), 1);
        assert_eq!(
            ledger.broadcast_options(),
            vec![BroadcastOptions {
                skip_preflight: true,
                max_retries: 2,
            }]
        );
        let sent = ledger.sent_transactions();
        assert_eq!(sent[0].signatures[0], result.signature);
        assert!(sent[0].verify_with_results().iter().all(|ok| *ok));
    }

    #[test]
    fn test_config_always_skips_preflight() {
        let mut config = Config::default();
        config.execution.broadcast_max_retries = 5;

        let executor_config = ExecutorConfig::from_config(&config);

        assert!(executor_config.broadcast.skip_preflight);
        assert_eq!(executor_config.broadcast.max_retries, 5);
        assert_eq!(
            ExecutorConfig::from_config(&Config::default()).broadcast,
            ExecutorConfig::default().broadcast
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_reported_in_order() {
        let ledger = Arc::new(MockLedger::new());
        let signer = MockSigner::new(SignerBehavior::Sign);
        let mut steps = Vec::new();

        let result = executor(Arc::new(MockAggregator::new()), ledger.clone())
            .execute_with(fresh_quote().await, &signer, &AbortSignal::never(), |step| {
                steps.push(step);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(
            steps,
            vec![ExecutionStep::Broadcasting, ExecutionStep::Broadcast(result.signature)]
        );

        // a refusing observer stops before anything is sent
        let err = executor(Arc::new(MockAggregator::new()), ledger.clone())
            .execute_with(fresh_quote().await, &signer, &AbortSignal::never(), |_| {
                Err(SwapError::Configuration("not now".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::Configuration(_)));
        assert_eq!(ledger.send_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_while_signing_never_broadcasts() {
        let aggregator = Arc::new(MockAggregator::new());
        let ledger = Arc::new(MockLedger::new());
        let signer = MockSigner::new(SignerBehavior::Hang);
        let (handle, signal) = abort_pair();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            handle.abort();
        });

        let started = Instant::now();
        let err = executor(aggregator, ledger.clone())
            .execute(fresh_quote().await, &signer, &signal)
            .await
            .unwrap_err();

        assert!(matches!(err, SwapError::SigningAborted));
        assert_eq!(signer.sign_calls(), 1);
        assert_eq!(ledger.send_calls(), 0);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_height_exceeded_is_expired_not_failed() {
        let aggregator = Arc::new(MockAggregator::new());
        let ledger = Arc::new(
            MockLedger::new()
                .with_states([SignatureState::Pending])
                .with_heights([1_001]),
        );
        let signer = MockSigner::new(SignerBehavior::Sign);

        let result = executor(aggregator, ledger.clone())
            .execute(fresh_quote().await, &signer, &AbortSignal::never())
            .await
            .unwrap();

        assert_eq!(result.status, ConfirmationStatus::Expired);
        assert_eq!(result.last_valid_block_height, 1_000);
        assert_eq!(ledger.status_calls(), 1);
        assert!(matches!(
            result.into_result(),
            Err(SwapError::ConfirmationExpired { last_valid_block_height: 1_000, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_error_is_failed_with_detail() {
        let aggregator = Arc::new(MockAggregator::new());
        let ledger = Arc::new(MockLedger::new().with_states([
            SignatureState::Pending,
            SignatureState::Failed("custom program error: 0x1771".into()),
        ]));
        let signer = MockSigner::new(SignerBehavior::Sign);

        let result = executor(aggregator, ledger.clone())
            .execute(fresh_quote().await, &signer, &AbortSignal::never())
            .await
            .unwrap();

        assert_eq!(result.status, ConfirmationStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("custom program error: 0x1771"));
        assert_eq!(ledger.status_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_to_latest_blockhash_height() {
        let aggregator = Arc::new(MockAggregator::new());
        aggregator.set_last_valid_block_height(None);
        let ledger = Arc::new(MockLedger::new());
        let signer = MockSigner::new(SignerBehavior::Sign);
        let quote = fresh_quote().await;

        let request = executor(aggregator, ledger)
            .prepare(&quote, &signer)
            .await
            .unwrap();

        assert_eq!(request.last_valid_block_height, 1_000);
        assert_eq!(request.signer_pubkey, signer.pubkey());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_quote_makes_no_call() {
        let aggregator = Arc::new(MockAggregator::new());
        let ledger = Arc::new(MockLedger::new());
        let signer = MockSigner::new(SignerBehavior::Sign);
        let quote = fresh_quote().await;

        tokio::time::advance(Duration::from_secs(31)).await;
        let err = executor(aggregator.clone(), ledger.clone())
            .execute(quote, &signer, &AbortSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, SwapError::QuoteStale { .. }));
        assert_eq!(aggregator.build_calls(), 0);
        assert_eq!(ledger.send_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unready_signer_makes_no_call() {
        let aggregator = Arc::new(MockAggregator::new());
        let ledger = Arc::new(MockLedger::new());
        let signer = MockSigner::disconnected();

        let err = executor(aggregator.clone(), ledger.clone())
            .execute(fresh_quote().await, &signer, &AbortSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, SwapError::SignerUnavailable(_)));
        assert_eq!(aggregator.build_calls(), 0);
        assert_eq!(signer.sign_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_build_failure_and_garbage_payload() {
        let ledger = Arc::new(MockLedger::new());
        let signer = MockSigner::new(SignerBehavior::Sign);

        let aggregator = Arc::new(MockAggregator::new());
        aggregator.fail_builds("400 Bad Request");
        let err = executor(aggregator.clone(), ledger.clone())
            .execute(fresh_quote().await, &signer, &AbortSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::BuildFailed(_)));
        assert_eq!(aggregator.build_calls(), 1);

        assert!(matches!(
            TransactionEnvelope::decode(vec![1, 2, 3]),
            Err(SwapError::BuildFailed(_))
        ));
        assert_eq!(ledger.send_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_signature_and_broadcast() {
        let aggregator = Arc::new(MockAggregator::new());
        let ledger = Arc::new(MockLedger::new());

        let rejecting = MockSigner::new(SignerBehavior::Reject);
        let err = executor(aggregator.clone(), ledger.clone())
            .execute(fresh_quote().await, &rejecting, &AbortSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::Signing(_)));
        assert_eq!(ledger.send_calls(), 0);

        ledger.fail_sends("Blockhash not found");
        let err = executor(aggregator, ledger.clone())
            .execute(
                fresh_quote().await,
                &MockSigner::new(SignerBehavior::Sign),
                &AbortSignal::never(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::Broadcast(_)));
        assert_eq!(ledger.send_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_after_broadcast_abandons_observation() {
        let aggregator = Arc::new(MockAggregator::new());
        let ledger = Arc::new(
            MockLedger::new()
                .with_states([SignatureState::Pending])
                .with_heights([10]),
        );
        let signer = MockSigner::new(SignerBehavior::Sign);
        let (handle, signal) = abort_pair();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            handle.abort();
        });

        let err = executor(aggregator, ledger.clone())
            .execute(fresh_quote().await, &signer, &signal)
            .await
            .unwrap_err();

        assert!(matches!(err, SwapError::ObservationAbandoned { .. }));
        assert_eq!(ledger.send_calls(), 1);
        assert!(ledger.status_calls() >= 2);
    }
}
