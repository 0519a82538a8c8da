//! Configuration module for the swap pipeline
//!
//! This module handles configuration loading from TOML files, `.env` files
//! and `SOLSWAP_*` environment variables, and provides the structured
//! configuration types each component is constructed from.

use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Route aggregator endpoint
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    /// Ledger RPC endpoint
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Quote fetching and debouncing
    #[serde(default)]
    pub quote: QuoteConfig,

    /// Swap execution
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Local signing key (CLI only)
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Base URL of the aggregator API (quote + swap endpoints)
    #[serde(default = "default_aggregator_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// processed | confirmed | finalized
    #[serde(default = "default_commitment")]
    pub commitment: String,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// Slippage tolerance (basis points)
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,

    /// Attempts per quote, including the first
    #[serde(default = "default_quote_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between quote attempts
    #[serde(default = "default_quote_retry_delay")]
    pub retry_delay_ms: u64,

    /// Quiet interval before an amount change triggers a quote
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Quotes older than this must be refreshed before execution
    #[serde(default = "default_max_quote_age")]
    pub max_quote_age_secs: u64,

    /// Rebroadcast attempts delegated to the RPC node
    #[serde(default = "default_broadcast_retries")]
    pub broadcast_max_retries: usize,

    #[serde(default = "default_confirm_poll_interval")]
    pub confirm_poll_interval_ms: u64,

    /// Attempts for each individual confirmation-poll RPC call
    #[serde(default = "default_rpc_attempts")]
    pub rpc_max_attempts: u32,

    #[serde(default = "default_true")]
    pub wrap_and_unwrap_sol: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

// Default value functions
fn default_aggregator_url() -> String { "https://quote-api.jup.ag/v6".to_string() }
fn default_rpc_url() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_http_timeout() -> u64 { 15 }
fn default_slippage_bps() -> u16 { 50 }
fn default_quote_attempts() -> u32 { 3 }
fn default_quote_retry_delay() -> u64 { 1000 }
fn default_debounce() -> u64 { 500 }
fn default_max_quote_age() -> u64 { 30 }
fn default_broadcast_retries() -> usize { 2 }
fn default_confirm_poll_interval() -> u64 { 2000 }
fn default_rpc_attempts() -> u32 { 3 }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_true() -> bool { true }

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            base_url: default_aggregator_url(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            commitment: default_commitment(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            slippage_bps: default_slippage_bps(),
            max_attempts: default_quote_attempts(),
            retry_delay_ms: default_quote_retry_delay(),
            debounce_ms: default_debounce(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_quote_age_secs: default_max_quote_age(),
            broadcast_max_retries: default_broadcast_retries(),
            confirm_poll_interval_ms: default_confirm_poll_interval(),
            rpc_max_attempts: default_rpc_attempts(),
            wrap_and_unwrap_sol: default_true(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aggregator: AggregatorConfig::default(),
            rpc: RpcConfig::default(),
            quote: QuoteConfig::default(),
            execution: ExecutionConfig::default(),
            wallet: WalletConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with `.env` and environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SOLSWAP_*` overrides using the given variable lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SOLSWAP_AGGREGATOR_URL") {
            self.aggregator.base_url = url;
        }
        if let Some(url) = lookup("SOLSWAP_RPC_URL") {
            self.rpc.url = url;
        }
        if let Some(path) = lookup("SOLSWAP_KEYPAIR") {
            self.wallet.keypair_path = path;
        }
        if let Some(bps) = lookup("SOLSWAP_SLIPPAGE_BPS") {
            self.quote.slippage_bps = bps
                .parse()
                .map_err(|e| anyhow::anyhow!("SOLSWAP_SLIPPAGE_BPS={}: {}", bps, e))?;
        }
        Ok(())
    }

    /// Reject values no component can operate with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.aggregator.base_url.trim().is_empty() {
            anyhow::bail!("aggregator.base_url must not be empty");
        }
        if self.rpc.url.trim().is_empty() {
            anyhow::bail!("rpc.url must not be empty");
        }
        if self.quote.slippage_bps > 10_000 {
            anyhow::bail!(
                "quote.slippage_bps must be at most 10000, got {}",
                self.quote.slippage_bps
            );
        }
        if self.quote.max_attempts == 0 {
            anyhow::bail!("quote.max_attempts must be at least 1");
        }
        parse_commitment(&self.rpc.commitment)?;
        Ok(())
    }

    pub fn quote_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.quote.max_attempts,
            Duration::from_millis(self.quote.retry_delay_ms),
        )
    }

    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.quote.debounce_ms)
    }

    pub fn commitment(&self) -> CommitmentConfig {
        parse_commitment(&self.rpc.commitment).unwrap_or_else(|_| CommitmentConfig::confirmed())
    }
}

fn parse_commitment(level: &str) -> anyhow::Result<CommitmentConfig> {
    match level.to_ascii_lowercase().as_str() {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => anyhow::bail!("unknown commitment level '{}'", other),
    }
}
