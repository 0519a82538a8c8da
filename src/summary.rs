//! Human readable quote summary

use serde::Serialize;
use std::fmt;

use crate::quote::Quote;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapSummary {
    pub input_symbol: String,
    pub output_symbol: String,
    pub input_amount: String,
    pub output_amount: String,
    pub price: f64,
    /// Venue labels joined with " → ", or "N/A" for an empty route
    pub route: String,
    /// Slippage tolerance in percent
    pub slippage_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_impact_pct: Option<f64>,
}

impl SwapSummary {
    pub fn from_quote(quote: &Quote) -> Self {
        let route = if quote.route().is_empty() {
            "N/A".to_string()
        } else {
            quote.route().join(" → ")
        };
        Self {
            input_symbol: quote.input().symbol.to_string(),
            output_symbol: quote.output().symbol.to_string(),
            input_amount: quote.input_ui().to_string(),
            output_amount: quote.output_ui().to_string(),
            price: quote.price(),
            route,
            slippage_pct: quote.slippage_bps() as f64 / 100.0,
            price_impact_pct: quote.price_impact_pct(),
        }
    }
}

impl fmt::Display for SwapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Swap {} {} to {}", self.input_amount, self.input_symbol, self.output_symbol)?;
        writeln!(f, "  Input:    {} {}", self.input_amount, self.input_symbol)?;
        writeln!(f, "  Output:   {} {}", self.output_amount, self.output_symbol)?;
        writeln!(
            f,
            "  Price:    1 {} = {:.6} {}",
            self.input_symbol, self.price, self.output_symbol
        )?;
        writeln!(f, "  Route:    {}", self.route)?;
        if let Some(impact) = self.price_impact_pct {
            writeln!(f, "  Impact:   {:.4}%", impact)?;
        }
        write!(f, "  Slippage: {}%", self.slippage_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets;
    use serde_json::json;

    #[test]
    fn test_summary_fields() {
        let raw = json!({
            "inAmount": "1500000000",
            "outAmount": "150000000",
            "routePlan": [
                {"swapInfo": {"label": "Whirlpool"}},
                {"swapInfo": {"label": "Phoenix"}}
            ]
        });
        let quote = Quote::from_response(assets::sol(), assets::usdc(), 50, raw).unwrap();
        let summary = SwapSummary::from_quote(&quote);

        assert_eq!(summary.input_amount, "1.5");
        assert_eq!(summary.output_amount, "150");
        assert_eq!(summary.route, "Whirlpool → Phoenix");
        assert_eq!(summary.slippage_pct, 0.5);

        let text = summary.to_string();
        assert!(text.contains("1 SOL = 100.000000 USDC"));
        assert!(text.contains("Slippage: 0.5%"));
    }

    #[test]
    fn test_empty_route_is_na() {
        let raw = json!({"inAmount": "1000000", "outAmount": "5"});
        let quote = Quote::from_response(assets::usdc(), assets::sol(), 100, raw).unwrap();
        let summary = SwapSummary::from_quote(&quote);

        assert_eq!(summary.route, "N/A");
        assert_eq!(summary.slippage_pct, 1.0);
    }
}
