//! Static asset registry
//!
//! Read-only, process-wide and initialised once. Lookups never allocate
//! new assets; every `&'static Asset` handed out points into the registry.

use once_cell::sync::Lazy;
use std::fmt;

use crate::errors::{SwapError, SwapResult};

pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
pub const BONK_MINT: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
pub const WIF_MINT: &str = "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm";

/// A tradable SPL asset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asset {
    pub symbol: &'static str,
    pub mint: &'static str,
    pub decimals: u8,
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol)
    }
}

static REGISTRY: Lazy<Vec<Asset>> = Lazy::new(|| {
    vec![
        Asset {
            symbol: "SOL",
            mint: SOL_MINT,
            decimals: 9,
        },
        Asset {
            symbol: "USDC",
            mint: USDC_MINT,
            decimals: 6,
        },
        Asset {
            symbol: "BONK",
            mint: BONK_MINT,
            decimals: 5,
        },
        Asset {
            symbol: "WIF",
            mint: WIF_MINT,
            decimals: 6,
        },
    ]
});

/// All registered assets, in registry order
pub fn all() -> &'static [Asset] {
    &REGISTRY
}

/// Case-insensitive lookup by ticker symbol
pub fn by_symbol(symbol: &str) -> SwapResult<&'static Asset> {
    REGISTRY
        .iter()
        .find(|a| a.symbol.eq_ignore_ascii_case(symbol.trim()))
        .ok_or_else(|| SwapError::UnknownAsset(symbol.to_string()))
}

pub fn by_mint(mint: &str) -> SwapResult<&'static Asset> {
    REGISTRY
        .iter()
        .find(|a| a.mint == mint)
        .ok_or_else(|| SwapError::UnknownAsset(mint.to_string()))
}

/// Resolve either a symbol or a mint address
pub fn resolve(key: &str) -> SwapResult<&'static Asset> {
    by_symbol(key).or_else(|_| by_mint(key.trim()))
}

pub fn sol() -> &'static Asset {
    &REGISTRY[0]
}

pub fn usdc() -> &'static Asset {
    &REGISTRY[1]
}
