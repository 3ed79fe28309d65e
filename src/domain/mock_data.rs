//! Offline fixtures for --mock runs: a hardcoded portfolio, deterministic
//! synthetic price history, and a canned analysis so the whole pipeline
//! works with zero network access.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::model::{AssetType, Holding};
use crate::domain::ports::ChatModel;
use crate::utils::error::Result;

pub fn mock_holdings() -> Vec<Holding> {
    vec![
        Holding {
            ticker: "VOO".to_string(),
            name: "Vanguard S&P 500 ETF".to_string(),
            shares: 298.0,
            price: 541.80,
            value: 161_456.0,
            account: "Fidelity".to_string(),
            asset_type: AssetType::Etf,
        },
        Holding {
            ticker: "QQMG".to_string(),
            name: "Invesco NASDAQ 100 ETF".to_string(),
            shares: 1118.0,
            price: 28.40,
            value: 31_751.0,
            account: "Fidelity + Robinhood".to_string(),
            asset_type: AssetType::Etf,
        },
        Holding {
            ticker: "SNOW".to_string(),
            name: "Snowflake Inc".to_string(),
            shares: 25.0,
            price: 148.50,
            value: 3_713.0,
            account: "Robinhood".to_string(),
            asset_type: AssetType::Stock,
        },
        Holding {
            ticker: "SPAXX".to_string(),
            name: "Fidelity Government Money Market Fund".to_string(),
            shares: 8_200.0,
            price: 1.0,
            value: 8_200.0,
            account: "Fidelity".to_string(),
            asset_type: AssetType::Cash,
        },
        Holding {
            ticker: "FCASH".to_string(),
            name: "Fidelity Cash".to_string(),
            shares: 1_800.0,
            price: 1.0,
            value: 1_800.0,
            account: "Fidelity".to_string(),
            asset_type: AssetType::Cash,
        },
    ]
}

/// ~1y of synthetic daily closes per ticker. Seeded from the ticker name
/// so repeated runs produce identical series.
pub fn mock_price_history(tickers: &[String]) -> HashMap<String, Vec<f64>> {
    tickers
        .iter()
        .map(|ticker| (ticker.clone(), synthetic_series(ticker, 260)))
        .collect()
}

fn synthetic_series(ticker: &str, bars: usize) -> Vec<f64> {
    let seed = ticker
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    let mut state = seed | 1;
    let mut price = 50.0 + (seed % 400) as f64;

    let mut out = Vec::with_capacity(bars);
    for _ in 0..bars {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let noise = ((state >> 33) % 2001) as f64 / 1000.0 - 1.0; // [-1, 1]
        price = (price * (1.0 + 0.0004 + 0.01 * noise)).max(1.0);
        out.push(price);
    }
    out
}

pub fn canned_analysis_markdown() -> String {
    "\
## RECOMMENDED ACTIONS
[HIGH] SNOW — Position is under 2% of the portfolio; either add to a meaningful size or exit.
[MEDIUM] QQMG — Overlaps heavily with VOO's top holdings; review whether both are needed.
[LOW] VOO — Core holding performing in line; no action required.

## EXECUTIVE SUMMARY
The portfolio is concentrated in broad-market index exposure with a small satellite stock position. Its biggest strength is low-cost diversified beta; its biggest concern is the overlap between the two index funds and an underweight cash-deployment plan.

## PER-TICKER ANALYSIS

### VOO — Vanguard S&P 500 ETF
**Recommendation:** HOLD
**Role in portfolio:** Core US large-cap exposure and the portfolio's anchor position.
**Assessment:** Low-cost index fund tracking the S&P 500. It carries the portfolio's market risk but no idiosyncratic risk worth flagging.
**Key risks:** broad market drawdown, concentration in US large caps

### QQMG — Invesco NASDAQ 100 ETF
**Recommendation:** HOLD
**Role in portfolio:** Growth tilt via NASDAQ 100 exposure.
**Assessment:** Adds tech-heavy growth on top of VOO. Reasonable satellite, but the top holdings overlap with VOO materially.
**Key risks:** tech sector concentration, rate sensitivity

### SNOW — Snowflake Inc
**Recommendation:** REDUCE
**Role in portfolio:** Single-stock growth bet.
**Assessment:** Too small to move the portfolio while still adding single-name volatility. Size it properly or recycle into the index sleeve.
**Key risks:** valuation, competitive pressure, position too small to matter

## CASH POSITION
The money-market balance is roughly five percent of the portfolio, which is appropriate as a buffer. Deploying a portion into the core index position on weakness would be reasonable.

## PORTFOLIO RISK ASSESSMENT
- Concentration risk: High — two index funds dominate the portfolio.
- Diversification: Limited to US equities; no bonds or international exposure.
- Correlation risk: VOO and QQMG are highly correlated.
- Overall rating: BALANCED
"
    .to_string()
}

/// ChatModel stand-in used by --mock and by tests.
pub struct CannedChat;

#[async_trait]
impl ChatModel for CannedChat {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Ok(canned_analysis_markdown())
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_holdings_shape() {
        let holdings = mock_holdings();
        assert_eq!(holdings.len(), 5);
        assert_eq!(
            holdings.iter().filter(|h| h.asset_type == AssetType::Cash).count(),
            2
        );
    }

    #[test]
    fn test_synthetic_series_deterministic() {
        let a = synthetic_series("VOO", 260);
        let b = synthetic_series("VOO", 260);
        assert_eq!(a, b);
        assert_eq!(a.len(), 260);
        assert!(a.iter().all(|p| *p >= 1.0));

        let other = synthetic_series("SNOW", 260);
        assert_ne!(a, other);
    }

    #[test]
    fn test_canned_markdown_has_required_sections() {
        let md = canned_analysis_markdown();
        for heading in [
            "## RECOMMENDED ACTIONS",
            "## EXECUTIVE SUMMARY",
            "## PER-TICKER ANALYSIS",
            "## CASH POSITION",
            "## PORTFOLIO RISK ASSESSMENT",
        ] {
            assert!(md.contains(heading), "missing {}", heading);
        }
    }
}
