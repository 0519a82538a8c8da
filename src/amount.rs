//! Decimal amount <-> base unit conversion
//!
//! Scaling is done entirely in integer arithmetic (u128 intermediate,
//! 10^decimals) so no amount ever passes through a float on its way to
//! or from base units.

use std::fmt;

use crate::assets::Asset;
use crate::errors::{SwapError, SwapResult};

/// Largest precision we can scale without overflowing u64 for a single unit
pub const MAX_DECIMALS: u8 = 18;

/// Exact human-readable amount of some asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiAmount {
    units: u64,
    decimals: u8,
}

impl UiAmount {
    pub fn base_units(&self) -> u64 {
        self.units
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Lossy float view for display math (prices, ratios)
    pub fn as_f64(&self) -> f64 {
        self.units as f64 / 10f64.powi(self.decimals as i32)
    }
}

impl fmt::Display for UiAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10u128.pow(self.decimals as u32);
        let units = self.units as u128;
        let whole = units / scale;
        let frac = units % scale;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:0width$}", frac, width = self.decimals as usize);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

/// Parse a decimal string into base units of `asset`
///
/// Rejects empty, non-numeric, negative and zero input, more fractional
/// digits than the asset supports, and values that do not fit in u64.
pub fn to_base_units(amount: &str, asset: &Asset) -> SwapResult<u64> {
    if asset.decimals > MAX_DECIMALS {
        return Err(SwapError::Configuration(format!(
            "{} has {} decimals (max {})",
            asset.symbol, asset.decimals, MAX_DECIMALS
        )));
    }

    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(SwapError::invalid_amount(amount, "empty"));
    }
    if trimmed.starts_with('-') {
        return Err(SwapError::invalid_amount(amount, "must not be negative"));
    }
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let (whole, frac) = match unsigned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (unsigned, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(SwapError::invalid_amount(amount, "not a number"));
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(SwapError::invalid_amount(amount, "not a number"));
    }
    if frac.len() > asset.decimals as usize {
        return Err(SwapError::invalid_amount(
            amount,
            format!("{} supports at most {} decimal places", asset.symbol, asset.decimals),
        ));
    }

    let overflow = || SwapError::invalid_amount(amount, "too large");
    let scale = 10u128.pow(asset.decimals as u32);
    let whole_units = if whole.is_empty() {
        0u128
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };
    let frac_units = if frac.is_empty() {
        0u128
    } else {
        let padded = format!("{:0<width$}", frac, width = asset.decimals as usize);
        padded.parse::<u128>().map_err(|_| overflow())?
    };

    let units = whole_units
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(overflow)?;
    if units == 0 {
        return Err(SwapError::invalid_amount(amount, "must be greater than zero"));
    }
    u64::try_from(units).map_err(|_| overflow())
}

/// Exact decimal view of `units` base units of `asset`
pub fn from_base_units(units: u64, asset: &Asset) -> UiAmount {
    UiAmount {
        units,
        decimals: asset.decimals.min(MAX_DECIMALS),
    }
}
