//! Caller-facing swap surface
//!
//! [`SwapService`] wires the transports into the quoting and execution
//! components once and hands out sessions and debounced controllers that
//! share them.

use std::sync::Arc;

use crate::abort::AbortSignal;
use crate::aggregator::{Aggregator, JupiterClient};
use crate::amount;
use crate::assets::{self, Asset};
use crate::config::Config;
use crate::debounce::DebouncedQuoteController;
use crate::errors::{SwapError, SwapResult};
use crate::executor::{ConfirmationResult, ExecutorConfig, SwapExecutor};
use crate::ledger::{Ledger, RpcLedger};
use crate::quote::{Quote, QuoteClient};
use crate::session::SwapSession;
use crate::wallet::TransactionSigner;

pub struct SwapService {
    config: Config,
    quotes: Arc<QuoteClient>,
    executor: Arc<SwapExecutor>,
}

impl SwapService {
    pub fn new(config: Config, aggregator: Arc<dyn Aggregator>, ledger: Arc<dyn Ledger>) -> Self {
        let quotes = Arc::new(QuoteClient::new(aggregator.clone(), config.quote_retry_policy()));
        let executor = Arc::new(SwapExecutor::new(
            aggregator,
            ledger,
            ExecutorConfig::from_config(&config),
        ));
        Self {
            config,
            quotes,
            executor,
        }
    }

    /// Production wiring: Jupiter over HTTP, Solana JSON-RPC ledger
    pub fn from_config(config: Config) -> SwapResult<Self> {
        let aggregator = Arc::new(JupiterClient::from_config(&config.aggregator)?);
        let ledger = Arc::new(RpcLedger::from_config(&config.rpc, config.commitment()));
        Ok(Self::new(config, aggregator, ledger))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Quote `amount` of `from` into `to` at the configured slippage.
    /// Assets are given by symbol or mint.
    pub async fn request_quote(&self, amount: &str, from: &str, to: &str) -> SwapResult<Quote> {
        self.request_quote_with_slippage(amount, from, to, self.config.quote.slippage_bps)
            .await
    }

    pub async fn request_quote_with_slippage(
        &self,
        amount_text: &str,
        from: &str,
        to: &str,
        slippage_bps: u16,
    ) -> SwapResult<Quote> {
        let (input, output) = resolve_pair(from, to)?;
        let units = amount::to_base_units(amount_text, input)?;
        self.quotes.get_quote(input, output, units, slippage_bps).await
    }

    pub async fn execute_swap(
        &self,
        quote: Quote,
        signer: &dyn TransactionSigner,
        abort: &AbortSignal,
    ) -> SwapResult<ConfirmationResult> {
        self.executor.execute(quote, signer, abort).await
    }

    /// Fresh session sharing this service's transports
    pub fn session(&self) -> SwapSession {
        SwapSession::new(self.quotes.clone(), self.executor.clone())
    }

    pub fn quote_controller(&self, from: &str, to: &str) -> SwapResult<DebouncedQuoteController> {
        let (input, output) = resolve_pair(from, to)?;
        Ok(DebouncedQuoteController::new(
            self.quotes.clone(),
            self.config.debounce_interval(),
            input,
            output,
            self.config.quote.slippage_bps,
        ))
    }
}

fn resolve_pair(from: &str, to: &str) -> SwapResult<(&'static Asset, &'static Asset)> {
    let input = assets::resolve(from)?;
    let output = assets::resolve(to)?;
    if input.mint == output.mint {
        return Err(SwapError::SameAsset(input.symbol.to_string()));
    }
    Ok((input, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockAggregator, MockLedger, MockSigner, SignerBehavior};

    fn service(aggregator: Arc<MockAggregator>) -> SwapService {
        SwapService::new(Config::default(), aggregator, Arc::new(MockLedger::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_quote_by_symbol_and_mint() {
        let aggregator = Arc::new(MockAggregator::new());
        let service = service(aggregator.clone());

        let quote = service.request_quote("1.5", "sol", assets::USDC_MINT).await.unwrap();

        assert_eq!(quote.in_amount(), 1_500_000_000);
        assert_eq!(quote.output().symbol, "USDC");
        assert_eq!(quote.slippage_bps(), 50);
    }

    #[tokio::test]
    async fn test_request_quote_input_errors() {
        let aggregator = Arc::new(MockAggregator::new());
        let service = service(aggregator.clone());

        assert!(matches!(
            service.request_quote("1", "SOL", "DOGE").await,
            Err(SwapError::UnknownAsset(_))
        ));
        assert!(matches!(
            service.request_quote("1", "USDC", "usdc").await,
            Err(SwapError::SameAsset(_))
        ));
        assert!(matches!(
            service.request_quote("0.0000001", "USDC", "SOL").await,
            Err(SwapError::InvalidAmount { .. })
        ));
        assert_eq!(aggregator.quote_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_swap() {
        let service = service(Arc::new(MockAggregator::new()));
        let quote = service.request_quote("2", "SOL", "BONK").await.unwrap();

        let result = service
            .execute_swap(quote, &MockSigner::new(SignerBehavior::Sign), &AbortSignal::never())
            .await
            .unwrap();

        assert!(result.is_confirmed());
    }
}
