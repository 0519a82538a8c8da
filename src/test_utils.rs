//! Test Utilities Module
//!
//! Scriptable stand-ins for the aggregator, the ledger and the signing
//! capability, so the pipeline can be driven deterministically without a
//! network. Only compiled when running tests or when the `test_utils`
//! feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::{Message, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::aggregator::{Aggregator, BuildRequest, BuildResponse, QuoteParams};
use crate::errors::{SwapError, SwapResult};
use crate::ledger::{BroadcastOptions, Ledger, SignatureState};
use crate::wallet::TransactionSigner;

/// Unsigned single-instruction transaction with `payer` as the only signer
pub fn unsigned_transaction(payer: &Pubkey) -> VersionedTransaction {
    let instruction = Instruction::new_with_bytes(
        Pubkey::new_unique(),
        &[7, 7, 7],
        vec![AccountMeta::new(*payer, true)],
    );
    let message = Message::new_with_blockhash(&[instruction], Some(payer), &Hash::new_unique());
    VersionedTransaction {
        signatures: vec![Signature::default(); message.header.num_required_signatures as usize],
        message: VersionedMessage::Legacy(message),
    }
}

/// Wire encoding used by the aggregator's build endpoint
pub fn encode_transaction(transaction: &VersionedTransaction) -> String {
    BASE64.encode(bincode::serialize(transaction).expect("transaction serializes"))
}

/// Aggregator whose quote endpoint returns `outAmount = amount / 10`
/// (1.5 SOL -> 150 USDC) unless scripted otherwise
#[derive(Default)]
pub struct MockAggregator {
    quote_calls: AtomicUsize,
    build_calls: AtomicUsize,
    quote_failures_left: AtomicUsize,
    quote_amounts: Mutex<Vec<u64>>,
    quote_body: Mutex<Option<Value>>,
    quote_delays: Mutex<HashMap<u64, Duration>>,
    build_failure: Mutex<Option<String>>,
    last_valid_block_height: Mutex<Option<u64>>,
}

impl MockAggregator {
    pub fn new() -> Self {
        let mock = Self::default();
        *mock.last_valid_block_height.lock().unwrap() = Some(1_000);
        mock
    }

    /// Next `n` quote calls fail with a transient transport error
    pub fn fail_quotes_times(&self, n: usize) {
        self.quote_failures_left.store(n, Ordering::SeqCst);
    }

    /// Return this body for every quote instead of the computed one
    pub fn set_quote_body(&self, body: Value) {
        *self.quote_body.lock().unwrap() = Some(body);
    }

    /// Delay the response for requests quoting `amount`
    pub fn delay_quote(&self, amount: u64, delay: Duration) {
        self.quote_delays.lock().unwrap().insert(amount, delay);
    }

    pub fn fail_builds(&self, reason: &str) {
        *self.build_failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn set_last_valid_block_height(&self, height: Option<u64>) {
        *self.last_valid_block_height.lock().unwrap() = height;
    }

    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    pub fn build_calls(&self) -> usize {
        self.build_calls.load(Ordering::SeqCst)
    }

    /// Amounts of every quote request received, in call order
    pub fn quoted_amounts(&self) -> Vec<u64> {
        self.quote_amounts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Aggregator for MockAggregator {
    async fn quote(&self, params: &QuoteParams<'_>) -> SwapResult<Value> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.quote_amounts.lock().unwrap().push(params.amount);

        let delay = self.quote_delays.lock().unwrap().get(&params.amount).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .quote_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SwapError::Transport {
                status: Some(503),
                message: "mock outage".into(),
            });
        }

        if let Some(body) = self.quote_body.lock().unwrap().clone() {
            return Ok(body);
        }
        Ok(json!({
            "inputMint": params.input_mint,
            "outputMint": params.output_mint,
            "inAmount": params.amount.to_string(),
            "outAmount": (params.amount / 10).to_string(),
            "slippageBps": params.slippage_bps,
            "routePlan": [{"swapInfo": {"label": "Mock AMM"}, "percent": 100}]
        }))
    }

    async fn build_swap(&self, request: &BuildRequest<'_>) -> SwapResult<BuildResponse> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.build_failure.lock().unwrap().clone() {
            return Err(SwapError::BuildFailed(reason));
        }
        let payer = Pubkey::from_str(&request.user_public_key)
            .map_err(|e| SwapError::BuildFailed(e.to_string()))?;
        Ok(BuildResponse {
            swap_transaction: encode_transaction(&unsigned_transaction(&payer)),
            last_valid_block_height: *self.last_valid_block_height.lock().unwrap(),
        })
    }
}

/// Ledger that replays scripted signature states and block heights.
/// The last scripted value of each queue repeats once the queue drains.
pub struct MockLedger {
    send_calls: AtomicUsize,
    status_calls: AtomicUsize,
    send_failure: Mutex<Option<String>>,
    states: Mutex<VecDeque<SignatureState>>,
    heights: Mutex<VecDeque<u64>>,
    blockhash: (Hash, u64),
    sent: Mutex<Vec<VersionedTransaction>>,
    send_options: Mutex<Vec<BroadcastOptions>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            send_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            send_failure: Mutex::new(None),
            states: Mutex::new(VecDeque::from([SignatureState::Landed])),
            heights: Mutex::new(VecDeque::from([100])),
            blockhash: (Hash::new_unique(), 1_000),
            sent: Mutex::new(Vec::new()),
            send_options: Mutex::new(Vec::new()),
        }
    }

    pub fn with_states(self, states: impl IntoIterator<Item = SignatureState>) -> Self {
        *self.states.lock().unwrap() = states.into_iter().collect();
        self
    }

    pub fn with_heights(self, heights: impl IntoIterator<Item = u64>) -> Self {
        *self.heights.lock().unwrap() = heights.into_iter().collect();
        self
    }

    pub fn fail_sends(&self, reason: &str) {
        *self.send_failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn sent_transactions(&self) -> Vec<VersionedTransaction> {
        self.sent.lock().unwrap().clone()
    }

    /// Options passed to every `send_transaction` call, in call order
    pub fn broadcast_options(&self) -> Vec<BroadcastOptions> {
        self.send_options.lock().unwrap().clone()
    }

    fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
        let mut queue = queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn latest_blockhash(&self) -> SwapResult<(Hash, u64)> {
        Ok(self.blockhash)
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        options: BroadcastOptions,
    ) -> SwapResult<Signature> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        self.send_options.lock().unwrap().push(options);
        if let Some(reason) = self.send_failure.lock().unwrap().clone() {
            return Err(SwapError::Broadcast(reason));
        }
        self.sent.lock().unwrap().push(transaction.clone());
        Ok(transaction.signatures[0])
    }

    async fn signature_state(
        &self,
        _signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> SwapResult<SignatureState> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::next(&self.states).unwrap_or(SignatureState::Pending))
    }

    async fn block_height(&self, _commitment: CommitmentConfig) -> SwapResult<u64> {
        Ok(Self::next(&self.heights).unwrap_or(0))
    }
}

/// How a [`MockSigner`] responds to `sign`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerBehavior {
    Sign,
    Reject,
    /// Never resolves, like a wallet prompt nobody answers
    Hang,
}

pub struct MockSigner {
    keypair: Keypair,
    ready: bool,
    behavior: SignerBehavior,
    sign_calls: AtomicUsize,
}

impl MockSigner {
    pub fn new(behavior: SignerBehavior) -> Self {
        Self {
            keypair: Keypair::new(),
            ready: true,
            behavior,
            sign_calls: AtomicUsize::new(0),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            ready: false,
            ..Self::new(SignerBehavior::Sign)
        }
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSigner for MockSigner {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign(&self, transaction: VersionedTransaction) -> SwapResult<VersionedTransaction> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            SignerBehavior::Sign => {
                VersionedTransaction::try_new(transaction.message, &[&self.keypair])
                    .map_err(|e| SwapError::Signing(e.to_string()))
            }
            SignerBehavior::Reject => Err(SwapError::Signing("user rejected the request".into())),
            SignerBehavior::Hang => std::future::pending().await,
        }
    }
}
