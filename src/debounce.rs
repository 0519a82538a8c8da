//! Debounced quoting
//!
//! Rapid amount edits are coalesced into a single outstanding quote request.
//! Every accepted edit takes the next sequence number and re-arms one
//! quiet-interval timer; only a timer that elapses without being superseded
//! issues a request, under the number of the edit that armed it. Only the
//! response carrying the latest number is delivered, whatever order
//! responses arrive in, so a request still in flight when the user edits
//! again is never shown.
//!
//! All of this runs on the controller's own task: in-flight requests are
//! polled from a `FuturesUnordered` inside the same `select!` loop that
//! drains the inbound channel.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::amount;
use crate::assets::Asset;
use crate::errors::{SwapError, SwapResult};
use crate::metrics::metrics;
use crate::quote::{Quote, QuoteClient};

/// Inbound controller events
#[derive(Debug, Clone)]
pub enum QuoteInput {
    /// Amount field changed (decimal text in input-asset units)
    Amount(String),
    /// Selected pair changed
    Pair {
        input: &'static Asset,
        output: &'static Asset,
    },
}

/// Outbound result for the latest issued request
#[derive(Debug)]
pub struct QuoteUpdate {
    pub seq: u64,
    pub amount: String,
    pub result: SwapResult<Quote>,
}

/// Monotonic input numbering
#[derive(Debug, Default)]
pub struct QuoteSequencer {
    latest: u64,
}

impl QuoteSequencer {
    pub fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn latest(&self) -> u64 {
        self.latest
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.latest
    }
}

pub struct DebouncedQuoteController {
    client: Arc<QuoteClient>,
    interval: Duration,
    input: &'static Asset,
    output: &'static Asset,
    slippage_bps: u16,
}

impl DebouncedQuoteController {
    pub fn new(
        client: Arc<QuoteClient>,
        interval: Duration,
        input: &'static Asset,
        output: &'static Asset,
        slippage_bps: u16,
    ) -> Self {
        Self {
            client,
            interval,
            input,
            output,
            slippage_bps,
        }
    }

    /// Drive the controller until `inputs` closes and every in-flight
    /// request has settled, or until `updates` is dropped
    ///
    /// An amount still waiting on its quiet interval when `inputs` closes is
    /// quoted once the interval elapses.
    #[instrument(
        skip_all,
        name = "quote_controller",
        fields(interval_ms = self.interval.as_millis() as u64)
    )]
    pub async fn run(
        self,
        mut inputs: mpsc::Receiver<QuoteInput>,
        updates: mpsc::Sender<QuoteUpdate>,
    ) {
        let mut sequencer = QuoteSequencer::default();
        let mut in_flight = FuturesUnordered::new();
        let mut amount_text = String::new();
        let mut inputs_open = true;
        let (mut input, mut output) = (self.input, self.output);
        let mut armed = false;

        let timer = tokio::time::sleep(self.interval);
        tokio::pin!(timer);

        loop {
            if !inputs_open && !armed && in_flight.is_empty() {
                break;
            }

            tokio::select! {
                event = inputs.recv(), if inputs_open => match event {
                    Some(QuoteInput::Amount(text)) => {
                        amount_text = text;
                        // supersedes anything in flight for the old amount
                        let seq = sequencer.issue();
                        match amount::to_base_units(&amount_text, input) {
                            Ok(_) => {
                                timer.as_mut().reset(Instant::now() + self.interval);
                                armed = true;
                            }
                            Err(err) => {
                                armed = false;
                                let text = amount_text.clone();
                                if !self.deliver(&updates, seq, text, Err(err)).await {
                                    return;
                                }
                            }
                        }
                    }
                    Some(QuoteInput::Pair { input: next_input, output: next_output }) => {
                        input = next_input;
                        output = next_output;
                        if !amount_text.is_empty() {
                            sequencer.issue();
                            timer.as_mut().reset(Instant::now() + self.interval);
                            armed = true;
                        }
                    }
                    None => inputs_open = false,
                },

                _ = &mut timer, if armed => {
                    armed = false;
                    let seq = sequencer.latest();
                    match amount::to_base_units(&amount_text, input) {
                        Ok(units) => {
                            debug!(seq, amount = %amount_text, "Issuing quote request");
                            in_flight.push(fetch(
                                self.client.clone(),
                                seq,
                                amount_text.clone(),
                                input,
                                output,
                                units,
                                self.slippage_bps,
                            ));
                        }
                        // pair changed to an asset with fewer decimals
                        Err(err) => {
                            if !self.deliver(&updates, seq, amount_text.clone(), Err(err)).await {
                                return;
                            }
                        }
                    }
                },

                Some(update) = in_flight.next(), if !in_flight.is_empty() => {
                    if sequencer.is_current(update.seq) {
                        if updates.send(update).await.is_err() {
                            return;
                        }
                    } else {
                        metrics().quote_responses_discarded.inc();
                        debug!(
                            seq = update.seq,
                            latest = sequencer.latest(),
                            "Discarding superseded quote response"
                        );
                    }
                },
            }
        }
        debug!(issued = sequencer.latest(), "Quote controller stopped");
    }

    async fn deliver(
        &self,
        updates: &mpsc::Sender<QuoteUpdate>,
        seq: u64,
        amount: String,
        result: SwapResult<Quote>,
    ) -> bool {
        updates.send(QuoteUpdate { seq, amount, result }).await.is_ok()
    }
}

async fn fetch(
    client: Arc<QuoteClient>,
    seq: u64,
    amount: String,
    input: &'static Asset,
    output: &'static Asset,
    units: u64,
    slippage_bps: u16,
) -> QuoteUpdate {
    let result = client.get_quote(input, output, units, slippage_bps).await;
    QuoteUpdate { seq, amount, result }
}

impl QuoteUpdate {
    pub fn is_input_error(&self) -> bool {
        matches!(&self.result, Err(e) if e.is_input_error())
    }

    pub fn quote(&self) -> Option<&Quote> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&SwapError> {
        self.result.as_ref().err()
    }
}
