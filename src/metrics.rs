//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Quote counters
    pub quotes_requested: IntCounter,
    pub quotes_failed: IntCounter,
    pub quote_responses_discarded: IntCounter,

    // Swap outcome counters
    pub swaps_started: IntCounter,
    pub swaps_confirmed: IntCounter,
    pub swaps_expired: IntCounter,
    pub swaps_failed: IntCounter,
    pub swaps_aborted: IntCounter,

    // Gauges
    pub active_swaps: IntGauge,

    // Histograms
    pub quote_latency: Histogram,
    pub confirmation_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let quotes_requested = IntCounter::with_opts(Opts::new(
            "quotes_requested_total",
            "Quote requests issued to the aggregator (before retries)",
        ))?;

        let quotes_failed = IntCounter::with_opts(Opts::new(
            "quotes_failed_total",
            "Quote requests that failed after retries or validation",
        ))?;

        let quote_responses_discarded = IntCounter::with_opts(Opts::new(
            "quote_responses_discarded_total",
            "Quote responses dropped because a newer request was issued",
        ))?;

        let swaps_started =
            IntCounter::with_opts(Opts::new("swaps_started_total", "Swap executions started"))?;

        let swaps_confirmed = IntCounter::with_opts(Opts::new(
            "swaps_confirmed_total",
            "Swaps confirmed at the requested commitment",
        ))?;

        let swaps_expired = IntCounter::with_opts(Opts::new(
            "swaps_expired_total",
            "Swaps whose blockhash expired before a status was observed",
        ))?;

        let swaps_failed = IntCounter::with_opts(Opts::new(
            "swaps_failed_total",
            "Swaps that failed at any step",
        ))?;

        let swaps_aborted = IntCounter::with_opts(Opts::new(
            "swaps_aborted_total",
            "Swaps aborted by the caller before broadcast",
        ))?;

        let active_swaps = IntGauge::with_opts(Opts::new(
            "active_swaps",
            "Number of swaps currently executing",
        ))?;

        let quote_latency = Histogram::with_opts(
            HistogramOpts::new("quote_latency_seconds", "Quote latency including retries")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
        )?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "confirmation_latency_seconds",
                "Time from broadcast to a terminal confirmation status",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        registry.register(Box::new(quotes_requested.clone()))?;
        registry.register(Box::new(quotes_failed.clone()))?;
        registry.register(Box::new(quote_responses_discarded.clone()))?;
        registry.register(Box::new(swaps_started.clone()))?;
        registry.register(Box::new(swaps_confirmed.clone()))?;
        registry.register(Box::new(swaps_expired.clone()))?;
        registry.register(Box::new(swaps_failed.clone()))?;
        registry.register(Box::new(swaps_aborted.clone()))?;
        registry.register(Box::new(active_swaps.clone()))?;
        registry.register(Box::new(quote_latency.clone()))?;
        registry.register(Box::new(confirmation_latency.clone()))?;

        Ok(Self {
            registry,
            quotes_requested,
            quotes_failed,
            quote_responses_discarded,
            swaps_started,
            swaps_confirmed,
            swaps_expired,
            swaps_failed,
            swaps_aborted,
            active_swaps,
            quote_latency,
            confirmation_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every registered metric
    pub fn gather_text(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}
