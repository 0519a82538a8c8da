//! Swap session state machine
//!
//! One [`SwapSession`] coordinates a single swap attempt from quoting to a
//! terminal ledger outcome. Steps run strictly in sequence. A failed step
//! moves the session to `Failed` (or back to `Idle` for input errors raised
//! before a quote exists); nothing is retried implicitly. Terminal sessions
//! go back to `Idle` only through [`SwapSession::reset`].

use chrono::{DateTime, Utc};
use solana_sdk::signature::Signature;
use std::sync::Arc;
use tokio::time::Instant;

use crate::abort::AbortSignal;
use crate::amount;
use crate::assets::Asset;
use crate::errors::{SwapError, SwapResult};
use crate::executor::{ConfirmationResult, ConfirmationStatus, ExecutionStep, SwapExecutor};
use crate::quote::{Quote, QuoteClient};
use crate::structured_logging::SwapLogger;
use crate::wallet::TransactionSigner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapState {
    Idle,
    Quoting,
    Quoted,
    Signing,
    Broadcasting,
    Confirming,
    Confirmed,
    Expired,
    Failed,
}

impl SwapState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Quoting => "quoting",
            Self::Quoted => "quoted",
            Self::Signing => "signing",
            Self::Broadcasting => "broadcasting",
            Self::Confirming => "confirming",
            Self::Confirmed => "confirmed",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Expired | Self::Failed)
    }

    /// Whether the machine has an edge from `self` to `next`
    pub fn can_transition_to(&self, next: SwapState) -> bool {
        use SwapState::*;
        match (self, next) {
            (Idle, Quoting) => true,
            (Quoting, Quoted | Idle | Failed) => true,
            (Quoted, Quoting | Signing | Idle) => true,
            (Signing, Broadcasting | Failed) => true,
            (Broadcasting, Confirming | Failed) => true,
            (Confirming, Confirmed | Expired | Failed) => true,
            (Confirmed | Expired | Failed, Idle) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for SwapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded transition
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub from: SwapState,
    pub to: SwapState,
    pub at: DateTime<Utc>,
}

pub struct SwapSession {
    client: Arc<QuoteClient>,
    executor: Arc<SwapExecutor>,
    logger: SwapLogger,
    state: SwapState,
    history: Vec<StateChange>,
    quote: Option<Quote>,
    signature: Option<Signature>,
    outcome: Option<ConfirmationResult>,
    last_error: Option<String>,
}

impl SwapSession {
    pub fn new(client: Arc<QuoteClient>, executor: Arc<SwapExecutor>) -> Self {
        Self {
            client,
            executor,
            logger: SwapLogger::generate(),
            state: SwapState::Idle,
            history: Vec::new(),
            quote: None,
            signature: None,
            outcome: None,
            last_error: None,
        }
    }

    pub fn session_id(&self) -> &str {
        self.logger.session_id()
    }

    pub fn state(&self) -> SwapState {
        self.state
    }

    pub fn history(&self) -> &[StateChange] {
        &self.history
    }

    /// Quote currently held for execution
    pub fn quote(&self) -> Option<&Quote> {
        self.quote.as_ref()
    }

    /// Signature of the broadcast transaction, set once the ledger accepts it
    pub fn signature(&self) -> Option<Signature> {
        self.signature
    }

    pub fn outcome(&self) -> Option<&ConfirmationResult> {
        self.outcome.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Move along an edge of the machine, rejecting anything else
    pub fn transition(&mut self, next: SwapState) -> SwapResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(SwapError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.logger.log_transition(self.state.as_str(), next.as_str());
        self.history.push(StateChange {
            from: self.state,
            to: next,
            at: Utc::now(),
        });
        self.state = next;
        Ok(())
    }

    /// Quote `amount` (decimal text in `input` units); replaces any held quote
    pub async fn request_quote(
        &mut self,
        amount_text: &str,
        input: &'static Asset,
        output: &'static Asset,
        slippage_bps: u16,
    ) -> SwapResult<&Quote> {
        self.transition(SwapState::Quoting)?;
        self.quote = None;

        let result = match amount::to_base_units(amount_text, input) {
            Ok(units) => self.client.get_quote(input, output, units, slippage_bps).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(quote) => {
                self.logger.log_quote(
                    input.symbol,
                    output.symbol,
                    quote.in_amount(),
                    quote.out_amount(),
                );
                self.transition(SwapState::Quoted)?;
                self.last_error = None;
                Ok(self.quote.insert(quote))
            }
            Err(err) => {
                let next = if err.is_input_error() {
                    SwapState::Idle
                } else {
                    SwapState::Failed
                };
                self.fail(next, &err)?;
                Err(err)
            }
        }
    }

    /// Execute the held quote, consuming it
    ///
    /// Expired and failed ledger outcomes are returned as `Ok` results with
    /// the matching status; the session is left in the corresponding
    /// terminal state.
    pub async fn execute(
        &mut self,
        signer: &dyn TransactionSigner,
        abort: &AbortSignal,
    ) -> SwapResult<ConfirmationResult> {
        if self.state != SwapState::Quoted {
            return Err(SwapError::InvalidTransition {
                from: self.state.to_string(),
                to: SwapState::Signing.to_string(),
            });
        }
        let quote = self
            .quote
            .take()
            .ok_or_else(|| SwapError::Configuration("quoted session holds no quote".into()))?;
        self.transition(SwapState::Signing)?;
        self.signature = None;
        self.logger
            .log_swap_attempt(quote.input().symbol, quote.output().symbol, quote.in_amount());

        let started = Instant::now();
        let executor = self.executor.clone();
        let result = executor
            .execute_with(quote, signer, abort, |step| self.enter_step(step))
            .await;

        match &result {
            Ok(outcome) => {
                let terminal = match outcome.status {
                    ConfirmationStatus::Confirmed => SwapState::Confirmed,
                    ConfirmationStatus::Expired => SwapState::Expired,
                    ConfirmationStatus::Failed => SwapState::Failed,
                };
                self.logger.log_outcome(
                    outcome.status.as_str(),
                    &outcome.signature.to_string(),
                    started.elapsed().as_millis() as u64,
                );
                self.last_error = outcome.error.clone();
                self.outcome = Some(outcome.clone());
                self.transition(terminal)?;
            }
            Err(err) => self.fail(SwapState::Failed, err)?,
        }
        result
    }

    fn enter_step(&mut self, step: ExecutionStep) -> SwapResult<()> {
        match step {
            ExecutionStep::Broadcasting => self.transition(SwapState::Broadcasting),
            ExecutionStep::Broadcast(signature) => {
                self.logger.log_broadcast(&signature.to_string());
                self.signature = Some(signature);
                self.transition(SwapState::Confirming)
            }
        }
    }

    /// Return a terminal session (or one holding an unwanted quote) to `Idle`
    pub fn reset(&mut self) -> SwapResult<()> {
        self.transition(SwapState::Idle)?;
        self.quote = None;
        self.signature = None;
        self.outcome = None;
        self.last_error = None;
        Ok(())
    }

    fn fail(&mut self, next: SwapState, err: &SwapError) -> SwapResult<()> {
        self.logger.log_failure(err.kind(), &err.to_string());
        self.last_error = Some(err.to_string());
        self.transition(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets;
    use crate::executor::ExecutorConfig;
    use crate::ledger::SignatureState;
    use crate::retry::RetryPolicy;
    use crate::test_utils::{MockAggregator, MockLedger, MockSigner, SignerBehavior};

    fn session(aggregator: Arc<MockAggregator>, ledger: Arc<MockLedger>) -> SwapSession {
        let client = Arc::new(QuoteClient::new(aggregator.clone(), RetryPolicy::quote_default()));
        let executor = Arc::new(SwapExecutor::new(aggregator, ledger, ExecutorConfig::default()));
        SwapSession::new(client, executor)
    }

    fn visited(session: &SwapSession) -> Vec<SwapState> {
        session.history().iter().map(|change| change.to).collect()
    }

    #[test]
    fn test_transition_table() {
        use SwapState::*;
        assert!(Idle.can_transition_to(Quoting));
        assert!(Quoted.can_transition_to(Quoting));
        assert!(Confirming.can_transition_to(Expired));
        assert!(Failed.can_transition_to(Idle));

        assert!(!Idle.can_transition_to(Signing));
        assert!(!Quoting.can_transition_to(Signing));
        assert!(!Broadcasting.can_transition_to(Idle));
        assert!(!Confirmed.can_transition_to(Quoting));
        assert!(!Signing.can_transition_to(Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_lifecycle() {
        let aggregator = Arc::new(MockAggregator::new());
        let ledger = Arc::new(
            MockLedger::new().with_states([SignatureState::Pending, SignatureState::Landed]),
        );
        let mut session = session(aggregator, ledger);
        let signer = MockSigner::new(SignerBehavior::Sign);

        let quote = session
            .request_quote("1.5", assets::sol(), assets::usdc(), 50)
            .await
            .unwrap();
        assert_eq!(quote.in_amount(), 1_500_000_000);

        let outcome = session.execute(&signer, &AbortSignal::never()).await.unwrap();

        assert!(outcome.is_confirmed());
        assert_eq!(session.signature(), Some(outcome.signature));
        assert!(session.quote().is_none());
        assert_eq!(
            visited(&session),
            vec![
                SwapState::Quoting,
                SwapState::Quoted,
                SwapState::Signing,
                SwapState::Broadcasting,
                SwapState::Confirming,
                SwapState::Confirmed,
            ]
        );

        session.reset().unwrap();
        assert_eq!(session.state(), SwapState::Idle);
        assert!(session.outcome().is_none());
        assert!(session.signature().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_error_returns_to_idle() {
        let aggregator = Arc::new(MockAggregator::new());
        let mut session = session(aggregator.clone(), Arc::new(MockLedger::new()));

        let err = session
            .request_quote("-2", assets::sol(), assets::usdc(), 50)
            .await
            .unwrap_err();

        assert!(matches!(err, SwapError::InvalidAmount { .. }));
        assert_eq!(session.state(), SwapState::Idle);
        assert_eq!(aggregator.quote_calls(), 0);
        assert!(session.last_error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_outage_fails_session() {
        let aggregator = Arc::new(MockAggregator::new());
        aggregator.fail_quotes_times(usize::MAX);
        let mut session = session(aggregator, Arc::new(MockLedger::new()));

        let err = session
            .request_quote("1", assets::sol(), assets::usdc(), 50)
            .await
            .unwrap_err();

        assert!(matches!(err, SwapError::QuoteUnavailable { .. }));
        assert_eq!(session.state(), SwapState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_requires_quote() {
        let mut session = session(Arc::new(MockAggregator::new()), Arc::new(MockLedger::new()));
        let signer = MockSigner::new(SignerBehavior::Sign);

        let err = session.execute(&signer, &AbortSignal::never()).await.unwrap_err();

        assert!(matches!(err, SwapError::InvalidTransition { .. }));
        assert_eq!(session.state(), SwapState::Idle);
        assert!(session.history().is_empty());
        assert!(matches!(session.reset(), Err(SwapError::InvalidTransition { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_is_terminal_and_distinct() {
        let aggregator = Arc::new(MockAggregator::new());
        let ledger = Arc::new(
            MockLedger::new()
                .with_states([SignatureState::Pending])
                .with_heights([5_000]),
        );
        let mut session = session(aggregator, ledger);
        let signer = MockSigner::new(SignerBehavior::Sign);

        session
            .request_quote("1", assets::sol(), assets::usdc(), 50)
            .await
            .unwrap();
        let outcome = session.execute(&signer, &AbortSignal::never()).await.unwrap();

        assert_eq!(outcome.status, ConfirmationStatus::Expired);
        assert_eq!(session.state(), SwapState::Expired);
        // no implicit re-quote or retry
        assert!(session.execute(&signer, &AbortSignal::never()).await.is_err());
        assert_eq!(session.state(), SwapState::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_during_signing_fails_before_broadcast() {
        let aggregator = Arc::new(MockAggregator::new());
        let ledger = Arc::new(MockLedger::new());
        let mut session = session(aggregator, ledger.clone());
        let signer = MockSigner::new(SignerBehavior::Hang);
        let (handle, signal) = crate::abort::abort_pair();

        session
            .request_quote("1", assets::sol(), assets::usdc(), 50)
            .await
            .unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            handle.abort();
        });
        let err = session.execute(&signer, &signal).await.unwrap_err();

        assert!(matches!(err, SwapError::SigningAborted));
        assert_eq!(session.state(), SwapState::Failed);
        assert!(!visited(&session).contains(&SwapState::Broadcasting));
        assert_eq!(ledger.send_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signature_kept_when_observation_abandoned() {
        let aggregator = Arc::new(MockAggregator::new());
        let ledger = Arc::new(
            MockLedger::new()
                .with_states([SignatureState::Pending])
                .with_heights([10]),
        );
        let mut session = session(aggregator, ledger.clone());
        let signer = MockSigner::new(SignerBehavior::Sign);
        let (handle, signal) = crate::abort::abort_pair();

        session
            .request_quote("1", assets::sol(), assets::usdc(), 50)
            .await
            .unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            handle.abort();
        });
        let err = session.execute(&signer, &signal).await.unwrap_err();

        assert!(matches!(err, SwapError::ObservationAbandoned { .. }));
        assert_eq!(session.state(), SwapState::Failed);
        let sent = ledger.sent_transactions();
        assert_eq!(session.signature(), Some(sent[0].signatures[0]));
        assert!(visited(&session).contains(&SwapState::Confirming));
    }
}
