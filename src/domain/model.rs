use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::domain::services::fundamentals::FundamentalSnapshot;
use crate::domain::services::sentiment::NewsSnapshot;
use crate::domain::services::technicals::TechnicalSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Etf,
    Cash,
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetType::Stock => write!(f, "stock"),
            AssetType::Etf => write!(f, "etf"),
            AssetType::Cash => write!(f, "cash"),
        }
    }
}

/// One merged position. `account` is a label like "Robinhood",
/// "Fidelity-Z24", or "Fidelity-Z24 + Robinhood" after cross-broker merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub name: String,
    pub shares: f64,
    pub price: f64,
    pub value: f64,
    pub account: String,
    pub asset_type: AssetType,
}

impl Holding {
    pub fn is_cash(&self) -> bool {
        self.asset_type == AssetType::Cash
    }
}

/// Output of the ingest stage: the merged holdings list plus any
/// data-freshness warnings (cache fallbacks, partial broker failures).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub holdings: Vec<Holding>,
    pub total_value: f64,
    pub data_warnings: Vec<String>,
}

impl PortfolioSnapshot {
    pub fn new(holdings: Vec<Holding>, data_warnings: Vec<String>) -> Self {
        let total_value = holdings.iter().map(|h| h.value).sum();
        Self {
            holdings,
            total_value,
            data_warnings,
        }
    }

    pub fn equity_tickers(&self) -> Vec<String> {
        self.holdings
            .iter()
            .filter(|h| !h.is_cash())
            .map(|h| h.ticker.clone())
            .collect()
    }

    pub fn equity_count(&self) -> usize {
        self.holdings.iter().filter(|h| !h.is_cash()).count()
    }

    pub fn cash_count(&self) -> usize {
        self.holdings.iter().filter(|h| h.is_cash()).count()
    }

    pub fn invested_value(&self) -> f64 {
        self.holdings
            .iter()
            .filter(|h| !h.is_cash())
            .map(|h| h.value)
            .sum()
    }

    pub fn cash_value(&self) -> f64 {
        self.holdings
            .iter()
            .filter(|h| h.is_cash())
            .map(|h| h.value)
            .sum()
    }
}

/// Output of the enrich stage. Any map may be missing a ticker: cash
/// symbols never have market data, and fundamentals/news degrade to
/// warnings on failure.
#[derive(Debug, Clone, Default)]
pub struct MarketContext {
    pub technicals: HashMap<String, TechnicalSnapshot>,
    pub fundamentals: HashMap<String, FundamentalSnapshot>,
    pub news: HashMap<String, NewsSnapshot>,
}

/// Output of the summarize stage. The LLM's markdown is kept verbatim;
/// report sections are parsed out of it at delivery time.
#[derive(Debug, Clone)]
pub struct PortfolioAnalysis {
    pub raw_markdown: String,
}

impl PortfolioAnalysis {
    pub fn is_empty(&self) -> bool {
        self.raw_markdown.trim().is_empty()
    }
}
