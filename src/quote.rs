//! Swap quotes
//!
//! A [`Quote`] is validated once, at construction, and is read-only
//! afterwards. It is intentionally not `Clone`: executing a swap consumes the
//! quote, so the same quote can never be submitted twice.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::aggregator::{Aggregator, QuoteParams};
use crate::amount::{self, UiAmount};
use crate::assets::Asset;
use crate::errors::{SwapError, SwapResult};
use crate::metrics::metrics;
use crate::retry::RetryPolicy;

#[derive(Debug)]
pub struct Quote {
    input: &'static Asset,
    output: &'static Asset,
    in_amount: u64,
    out_amount: u64,
    route: Vec<String>,
    slippage_bps: u16,
    price_impact_pct: Option<f64>,
    fetched_at: Instant,
    raw: Value,
}

impl Quote {
    /// Validate an aggregator response body for the requested pair
    pub fn from_response(
        input: &'static Asset,
        output: &'static Asset,
        slippage_bps: u16,
        raw: Value,
    ) -> SwapResult<Self> {
        if input.mint == output.mint {
            return Err(SwapError::SameAsset(input.symbol.to_string()));
        }
        if !raw.is_object() {
            return Err(SwapError::QuoteMalformed("response is not an object".into()));
        }

        let in_amount = amount_field(&raw, "inAmount")?;
        let out_amount = amount_field(&raw, "outAmount")?;
        if in_amount == 0 {
            return Err(SwapError::QuoteMalformed("inAmount is zero".into()));
        }

        for (field, expected) in [("inputMint", input.mint), ("outputMint", output.mint)] {
            if let Some(mint) = raw.get(field).and_then(Value::as_str) {
                if mint != expected {
                    return Err(SwapError::QuoteMalformed(format!(
                        "{} is {}, expected {}",
                        field, mint, expected
                    )));
                }
            }
        }

        let route = raw
            .get("routePlan")
            .and_then(Value::as_array)
            .map(|steps| steps.iter().map(hop_label).collect())
            .unwrap_or_default();

        let price_impact_pct = match raw.get("priceImpactPct") {
            Some(Value::String(s)) => s.parse().ok(),
            Some(Value::Number(n)) => n.as_f64(),
            _ => None,
        };

        Ok(Self {
            input,
            output,
            in_amount,
            out_amount,
            route,
            slippage_bps,
            price_impact_pct,
            fetched_at: Instant::now(),
            raw,
        })
    }

    pub fn input(&self) -> &'static Asset {
        self.input
    }

    pub fn output(&self) -> &'static Asset {
        self.output
    }

    pub fn in_amount(&self) -> u64 {
        self.in_amount
    }

    pub fn out_amount(&self) -> u64 {
        self.out_amount
    }

    pub fn input_ui(&self) -> UiAmount {
        amount::from_base_units(self.in_amount, self.input)
    }

    pub fn output_ui(&self) -> UiAmount {
        amount::from_base_units(self.out_amount, self.output)
    }

    /// Output per one unit of input, in UI units
    pub fn price(&self) -> f64 {
        self.output_ui().as_f64() / self.input_ui().as_f64()
    }

    /// Ordered venue labels of the route
    pub fn route(&self) -> &[String] {
        &self.route
    }

    pub fn slippage_bps(&self) -> u16 {
        self.slippage_bps
    }

    pub fn price_impact_pct(&self) -> Option<f64> {
        self.price_impact_pct
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// Body as returned by the aggregator; the build endpoint wants it verbatim
    pub fn raw_response(&self) -> &Value {
        &self.raw
    }
}

fn amount_field(raw: &Value, field: &str) -> SwapResult<u64> {
    let text = match raw.get(field) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Null) | None => {
            return Err(SwapError::QuoteMalformed(format!("missing {}", field)))
        }
        Some(other) => {
            return Err(SwapError::QuoteMalformed(format!(
                "{} has unexpected type: {}",
                field, other
            )))
        }
    };
    if text.is_empty() {
        return Err(SwapError::QuoteMalformed(format!("{} is empty", field)));
    }
    text.parse::<u64>()
        .map_err(|_| SwapError::QuoteMalformed(format!("{} is not an integer: {}", field, text)))
}

fn hop_label(step: &Value) -> String {
    step.pointer("/swapInfo/label")
        .or_else(|| step.get("label"))
        .and_then(Value::as_str)
        .filter(|l| !l.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Fetches and validates quotes with a bounded retry policy
pub struct QuoteClient {
    aggregator: Arc<dyn Aggregator>,
    policy: RetryPolicy,
}

impl QuoteClient {
    pub fn new(aggregator: Arc<dyn Aggregator>, policy: RetryPolicy) -> Self {
        Self { aggregator, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Quote `amount` base units of `input` into `output`
    ///
    /// Transport failures are retried per the policy and surface as
    /// [`SwapError::QuoteUnavailable`] once exhausted. Malformed bodies are
    /// returned immediately.
    pub async fn get_quote(
        &self,
        input: &'static Asset,
        output: &'static Asset,
        amount: u64,
        slippage_bps: u16,
    ) -> SwapResult<Quote> {
        if input.mint == output.mint {
            return Err(SwapError::SameAsset(input.symbol.to_string()));
        }
        if amount == 0 {
            return Err(SwapError::invalid_amount("0", "must be greater than zero"));
        }

        let m = metrics();
        m.quotes_requested.inc();
        let timer = m.quote_latency.start_timer();

        let params = QuoteParams {
            input_mint: input.mint,
            output_mint: output.mint,
            amount,
            slippage_bps,
        };
        let params = &params;
        let aggregator = &self.aggregator;
        let result = self
            .policy
            .run("aggregator_quote", || async move {
                let raw = aggregator.quote(params).await?;
                Quote::from_response(input, output, slippage_bps, raw)
            })
            .await;
        timer.observe_duration();

        match result {
            Ok(quote) => {
                info!(
                    input = %input,
                    output = %output,
                    in_amount = quote.in_amount,
                    out_amount = quote.out_amount,
                    hops = quote.route.len(),
                    "Quote received"
                );
                Ok(quote)
            }
            Err(failure) => {
                m.quotes_failed.inc();
                debug!(attempts = failure.attempts, error = %failure.error, "Quote failed");
                if failure.exhausted {
                    Err(SwapError::QuoteUnavailable {
                        attempts: failure.attempts,
                        cause: failure.error.to_string(),
                    })
                } else {
                    Err(failure.error)
                }
            }
        }
    }
}
