//! solswap - Solana swap quoting and execution
//!
//! Converts human amounts to base units, fetches debounced aggregator
//! quotes, and executes accepted quotes through an external signer with
//! blockhash-expiry aware confirmation.

pub mod abort;
pub mod aggregator;
pub mod amount;
pub mod assets;
pub mod config;
pub mod debounce;
pub mod errors;
pub mod executor;
pub mod ledger;
pub mod metrics;
pub mod quote;
pub mod retry;
pub mod service;
pub mod session;
pub mod structured_logging;
pub mod summary;
pub mod wallet;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

// Re-export commonly used types
pub use abort::{abort_pair, AbortHandle, AbortSignal};
pub use assets::Asset;
pub use config::Config;
pub use debounce::{DebouncedQuoteController, QuoteInput, QuoteUpdate};
pub use errors::{SwapError, SwapResult};
pub use executor::{ConfirmationResult, ConfirmationStatus, ExecutionStep, SwapExecutor};
pub use quote::{Quote, QuoteClient};
pub use service::SwapService;
pub use session::{SwapSession, SwapState};
pub use summary::SwapSummary;
pub use wallet::{KeypairSigner, TransactionSigner};
