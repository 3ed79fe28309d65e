//! FundamentalSnapshot — structured fundamental data for one ticker,
//! built from the flat per-ticker info objects the price-data API
//! returns (upstream field names like `trailingPE`, `returnOnEquity`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub ticker: String,

    // Identity
    pub sector: Option<String>,
    pub industry: Option<String>,

    // Size
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,

    // Valuation
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    pub price_to_sales: Option<f64>,

    // Profitability (decimals, 0.25 = 25%)
    pub roe: Option<f64>,
    pub roa: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub profit_margin: Option<f64>,

    // Growth (YoY, decimal)
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,

    // Balance sheet
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,

    // Cash
    pub free_cash_flow: Option<f64>,
    pub total_cash: Option<f64>,
    pub total_debt: Option<f64>,

    // EPS
    pub trailing_eps: Option<f64>,
    pub forward_eps: Option<f64>,

    // Analyst
    pub analyst_rating: Option<String>,
    pub analyst_mean_score: Option<f64>,
    pub analyst_count: Option<i64>,
    pub target_price_mean: Option<f64>,
    pub target_price_low: Option<f64>,
    pub target_price_high: Option<f64>,

    // Dividend — yield arrives already in percentage form (1.11 = 1.11%)
    pub dividend_yield: Option<f64>,
    pub dividend_rate: Option<f64>,
    pub payout_ratio: Option<f64>,

    // Risk
    pub beta: Option<f64>,

    // 52-week range
    pub week52_high: Option<f64>,
    pub week52_low: Option<f64>,
}

impl FundamentalSnapshot {
    /// One-paragraph text summary suitable for LLM context.
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} fundamentals:", self.ticker)];

        if let Some(sector) = &self.sector {
            let mut sector_str = sector.clone();
            if let Some(industry) = &self.industry {
                if industry != sector {
                    sector_str = format!("{} / {}", sector_str, industry);
                }
            }
            parts.push(format!("Sector: {}.", sector_str));
        }

        if let Some(mc) = self.market_cap {
            parts.push(format!("Market cap: {}.", format_dollars(mc)));
        }

        let mut val = Vec::new();
        if let Some(v) = self.trailing_pe {
            val.push(format!("P/E(ttm)={:.1}", v));
        }
        if let Some(v) = self.forward_pe {
            val.push(format!("P/E(fwd)={:.1}", v));
        }
        if let Some(v) = self.price_to_book {
            val.push(format!("P/B={:.1}", v));
        }
        if let Some(v) = self.ev_to_ebitda {
            val.push(format!("EV/EBITDA={:.1}", v));
        }
        if !val.is_empty() {
            parts.push(format!("Valuation: {}.", val.join(", ")));
        }

        let mut eps = Vec::new();
        if let Some(v) = self.trailing_eps {
            eps.push(format!("EPS(ttm)=${:.2}", v));
        }
        if let Some(v) = self.forward_eps {
            eps.push(format!("EPS(fwd)=${:.2}", v));
        }
        if !eps.is_empty() {
            parts.push(format!("{}.", eps.join(" ")));
        }

        let mut prof = Vec::new();
        if let Some(v) = self.roe {
            prof.push(format!("ROE={:.1}%", v * 100.0));
        }
        if let Some(v) = self.profit_margin {
            prof.push(format!("Net margin={:.1}%", v * 100.0));
        }
        if let Some(v) = self.gross_margin {
            prof.push(format!("Gross margin={:.1}%", v * 100.0));
        }
        if !prof.is_empty() {
            parts.push(format!("Profitability: {}.", prof.join(", ")));
        }

        let mut growth = Vec::new();
        if let Some(v) = self.revenue_growth {
            growth.push(format!("Rev growth={:+.1}%", v * 100.0));
        }
        if let Some(v) = self.earnings_growth {
            growth.push(format!("EPS growth={:+.1}%", v * 100.0));
        }
        if !growth.is_empty() {
            parts.push(format!("Growth (YoY): {}.", growth.join(", ")));
        }

        let mut bs = Vec::new();
        if let Some(v) = self.debt_to_equity {
            bs.push(format!("D/E={:.1}", v));
        }
        if let Some(v) = self.current_ratio {
            bs.push(format!("Current ratio={:.1}", v));
        }
        if !bs.is_empty() {
            parts.push(format!("Balance sheet: {}.", bs.join(", ")));
        }

        if let Some(fcf) = self.free_cash_flow {
            parts.push(format!("FCF: {}.", format_dollars(fcf)));
        }

        if let Some(rating) = &self.analyst_rating {
            if let Some(target) = self.target_price_mean {
                let count = self
                    .analyst_count
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "?".to_string());
                let mut analyst_str = format!(
                    "Analysts ({}): consensus={}, mean target=${:.2}",
                    count,
                    rating.to_uppercase(),
                    target
                );
                if let (Some(low), Some(high)) = (self.target_price_low, self.target_price_high) {
                    analyst_str.push_str(&format!(" (range ${:.2}–${:.2})", low, high));
                }
                analyst_str.push('.');
                parts.push(analyst_str);
            } else {
                parts.push(format!(
                    "Analyst consensus: {} ({} analysts).",
                    rating.to_uppercase(),
                    self.analyst_count.unwrap_or(0)
                ));
            }
        }

        if let Some(dy) = self.dividend_yield {
            if dy > 0.0 {
                let mut div_str = format!("Dividend: {:.2}% yield", dy);
                if let Some(rate) = self.dividend_rate {
                    div_str.push_str(&format!(" (${:.2}/yr)", rate));
                }
                div_str.push('.');
                parts.push(div_str);
            }
        }

        let mut misc = Vec::new();
        if let Some(beta) = self.beta {
            misc.push(format!("Beta={:.2}", beta));
        }
        if let (Some(high), Some(low)) = (self.week52_high, self.week52_low) {
            misc.push(format!("52-wk range ${:.2}–${:.2}", low, high));
        }
        if !misc.is_empty() {
            parts.push(format!("{}.", misc.join(" | ")));
        }

        parts.join(" ")
    }
}

fn format_dollars(amount: f64) -> String {
    let abs = amount.abs();
    if abs >= 1e12 {
        format!("${:.2}T", amount / 1e12)
    } else if abs >= 1e9 {
        format!("${:.1}B", amount / 1e9)
    } else {
        format!("${:.0}M", amount / 1e6)
    }
}

// ── Lenient field extraction ─────────────────────────────────────────────

fn get_f64(info: &HashMap<String, Value>, key: &str) -> Option<f64> {
    match info.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn get_i64(info: &HashMap<String, Value>, key: &str) -> Option<i64> {
    match info.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn get_str(info: &HashMap<String, Value>, key: &str) -> Option<String> {
    match info.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub fn from_raw_info(ticker: &str, info: &HashMap<String, Value>) -> FundamentalSnapshot {
    FundamentalSnapshot {
        ticker: ticker.to_string(),
        sector: get_str(info, "sector"),
        industry: get_str(info, "industry"),
        market_cap: get_f64(info, "marketCap"),
        enterprise_value: get_f64(info, "enterpriseValue"),
        trailing_pe: get_f64(info, "trailingPE"),
        forward_pe: get_f64(info, "forwardPE"),
        price_to_book: get_f64(info, "priceToBook"),
        ev_to_ebitda: get_f64(info, "enterpriseToEbitda"),
        price_to_sales: get_f64(info, "priceToSalesTrailing12Months"),
        roe: get_f64(info, "returnOnEquity"),
        roa: get_f64(info, "returnOnAssets"),
        gross_margin: get_f64(info, "grossMargins"),
        operating_margin: get_f64(info, "operatingMargins"),
        profit_margin: get_f64(info, "profitMargins"),
        revenue_growth: get_f64(info, "revenueGrowth"),
        earnings_growth: get_f64(info, "earningsGrowth"),
        debt_to_equity: get_f64(info, "debtToEquity"),
        current_ratio: get_f64(info, "currentRatio"),
        free_cash_flow: get_f64(info, "freeCashflow"),
        total_cash: get_f64(info, "totalCash"),
        total_debt: get_f64(info, "totalDebt"),
        trailing_eps: get_f64(info, "trailingEps"),
        forward_eps: get_f64(info, "forwardEps"),
        analyst_rating: get_str(info, "recommendationKey"),
        analyst_mean_score: get_f64(info, "recommendationMean"),
        analyst_count: get_i64(info, "numberOfAnalystOpinions"),
        target_price_mean: get_f64(info, "targetMeanPrice"),
        target_price_low: get_f64(info, "targetLowPrice"),
        target_price_high: get_f64(info, "targetHighPrice"),
        dividend_yield: get_f64(info, "dividendYield"),
        dividend_rate: get_f64(info, "dividendRate"),
        payout_ratio: get_f64(info, "payoutRatio"),
        beta: get_f64(info, "beta"),
        week52_high: get_f64(info, "fiftyTwoWeekHigh"),
        week52_low: get_f64(info, "fiftyTwoWeekLow"),
    }
}

/// Build snapshots for every ticker present in the raw info map.
pub fn compute(
    tickers: &[String],
    raw_info: &HashMap<String, HashMap<String, Value>>,
) -> HashMap<String, FundamentalSnapshot> {
    let mut result = HashMap::new();
    for ticker in tickers {
        if let Some(info) = raw_info.get(ticker) {
            result.insert(ticker.clone(), from_raw_info(ticker, info));
        }
    }
    result
}
