//! Error taxonomy for the swap pipeline
//!
//! Every failure the pipeline can surface to a caller is a [`SwapError`]
//! variant. Components that own a transient operation retry it locally and
//! within a fixed bound; whatever survives those bounds propagates here as a
//! typed value, never as a silent default.

use solana_client::client_error::ClientError;
use thiserror::Error;

/// Comprehensive error type for quoting and executing swaps
#[derive(Error, Debug)]
pub enum SwapError {
    /// User supplied amount is malformed, zero, negative or too precise
    #[error("Invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: String },

    /// Symbol or mint not present in the asset registry
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    /// Input and output resolve to the same mint
    #[error("Input and output asset are both {0}")]
    SameAsset(String),

    /// Transport-level failure talking to the aggregator
    ///
    /// Covers connection errors, timeouts and non-success HTTP statuses.
    /// Always considered transient.
    #[error("Aggregator transport error (status: {status:?}): {message}")]
    Transport { status: Option<u16>, message: String },

    /// Quote retries exhausted
    #[error("Quote unavailable after {attempts} attempt(s): {cause}")]
    QuoteUnavailable { attempts: u32, cause: String },

    /// Aggregator answered with a body the pipeline cannot use
    #[error("Malformed quote response: {0}")]
    QuoteMalformed(String),

    /// Quote is older than the configured freshness bound
    #[error("Quote is stale ({age_ms}ms old, max {max_age_ms}ms); request a new quote")]
    QuoteStale { age_ms: u64, max_age_ms: u64 },

    /// No signing capability is connected
    #[error("Signer unavailable: {0}")]
    SignerUnavailable(String),

    /// Swap was aborted before anything was broadcast
    #[error("Swap aborted before broadcast")]
    SigningAborted,

    /// The signing capability rejected or failed to sign
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Aggregator could not construct a transaction for the quote
    #[error("Swap transaction build failed: {0}")]
    BuildFailed(String),

    /// Ledger rejected the signed transaction
    #[error("Broadcast rejected: {0}")]
    Broadcast(String),

    /// Blockhash validity window elapsed before a status was observed.
    /// The transaction may or may not have landed.
    #[error(
        "Confirmation window expired for {signature} \
         (last valid block height {last_valid_block_height})"
    )]
    ConfirmationExpired {
        signature: String,
        last_valid_block_height: u64,
    },

    /// Ledger reported an explicit execution failure
    #[error("Transaction {signature} failed: {detail}")]
    TransactionFailed { signature: String, detail: String },

    /// Caller stopped observing an already broadcast transaction
    #[error("Stopped observing {signature}; settlement may still occur")]
    ObservationAbandoned { signature: String },

    /// Ledger RPC failure outside of broadcast
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Session asked to move along an edge the state machine does not have
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Configuration or construction error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SwapError {
    pub fn invalid_amount(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if retrying the same operation could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Rpc(_) => true,

            Self::InvalidAmount { .. }
            | Self::UnknownAsset(_)
            | Self::SameAsset(_)
            | Self::QuoteUnavailable { .. }
            | Self::QuoteMalformed(_)
            | Self::QuoteStale { .. }
            | Self::SignerUnavailable(_)
            | Self::SigningAborted
            | Self::Signing(_)
            | Self::BuildFailed(_)
            | Self::Broadcast(_)
            | Self::ConfirmationExpired { .. }
            | Self::TransactionFailed { .. }
            | Self::ObservationAbandoned { .. }
            | Self::InvalidTransition { .. }
            | Self::Configuration(_) => false,
        }
    }

    /// Errors caused by user input rather than by the pipeline
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount { .. } | Self::UnknownAsset(_) | Self::SameAsset(_)
        )
    }

    /// Short label for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::UnknownAsset(_) => "unknown_asset",
            Self::SameAsset(_) => "same_asset",
            Self::Transport { .. } => "transport",
            Self::QuoteUnavailable { .. } => "quote_unavailable",
            Self::QuoteMalformed(_) => "quote_malformed",
            Self::QuoteStale { .. } => "quote_stale",
            Self::SignerUnavailable(_) => "signer_unavailable",
            Self::SigningAborted => "signing_aborted",
            Self::Signing(_) => "signing",
            Self::BuildFailed(_) => "build_failed",
            Self::Broadcast(_) => "broadcast",
            Self::ConfirmationExpired { .. } => "confirmation_expired",
            Self::TransactionFailed { .. } => "transaction_failed",
            Self::ObservationAbandoned { .. } => "observation_abandoned",
            Self::Rpc(_) => "rpc",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Configuration(_) => "configuration",
        }
    }
}

impl From<reqwest::Error> for SwapError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<ClientError> for SwapError {
    fn from(err: ClientError) -> Self {
        Self::Rpc(err.to_string())
    }
}

/// Result alias used across the pipeline
pub type SwapResult<T> = std::result::Result<T, SwapError>;
