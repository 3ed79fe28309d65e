//! Prompt assembly for the analysis request: portfolio overview, a
//! fixed-width holdings table, per-ticker market/fundamental/news
//! context, and the exact response format the report renderer parses.

use crate::core::format::thousands;
use crate::domain::model::{MarketContext, PortfolioSnapshot};

pub const SYSTEM_PROMPT: &str = "You are an expert financial portfolio analyst. You provide clear, actionable \
investment advice based on portfolio data. You are direct and honest — if a \
position has problems, say so. You focus on what the investor should DO, not \
just what the data says.";

fn pct_of(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    part / total * 100.0
}

pub fn build_prompt(portfolio: &PortfolioSnapshot, market: &MarketContext, today: &str) -> String {
    let total = portfolio.total_value;
    let invested = portfolio.invested_value();
    let cash_total = portfolio.cash_value();

    let mut rows = Vec::new();
    for h in &portfolio.holdings {
        let pct = pct_of(h.value, total);
        rows.push(format!(
            "  {:<8} {:<42} {:>10} sh  ${:>8}  ${:>10}  {:>5.1}%  [{}]",
            h.ticker,
            h.name,
            thousands(h.shares, 2),
            thousands(h.price, 2),
            thousands(h.value, 0),
            pct,
            h.account
        ));
    }
    let holdings_table = rows.join("\n");

    // Per-ticker context sections, in holdings order so runs are stable.
    let equity_tickers = portfolio.equity_tickers();

    let market_section = context_section(
        "MARKET DATA (live technicals — use this to ground your analysis)",
        &equity_tickers,
        |ticker| market.technicals.get(ticker).map(|s| s.summary()),
    );
    let fundamentals_section = context_section(
        "FUNDAMENTALS",
        &equity_tickers,
        |ticker| market.fundamentals.get(ticker).map(|s| s.summary()),
    );
    let news_section = context_section("NEWS & SENTIMENT", &equity_tickers, |ticker| {
        market.news.get(ticker).map(|s| s.summary())
    });

    format!(
        "\
Portfolio Analysis Request — {today}

PORTFOLIO OVERVIEW
  Total Value:   ${total:>12}
  Invested:      ${invested:>12}  ({invested_pct:.1}%)
  Cash & MM:     ${cash:>12}  ({cash_pct:.1}%)
  Positions:     {n_equity} equity  +  {n_cash} cash

HOLDINGS
  {:<8} {:<42} {:>14}  {:>10}  {:>12}  {:>6}  Account
  {dashes}
{holdings_table}
{market_section}{fundamentals_section}{news_section}
Please analyze this portfolio and respond in EXACTLY this format:

## RECOMMENDED ACTIONS
List each action on its own line as: [PRIORITY] TICKER — action description
Priority levels: CRITICAL (act immediately) | HIGH (act within 2 weeks) | MEDIUM (act within a month) | LOW (informational)
Sort by priority (CRITICAL first). Be specific — name the action, not just \"review this position\".

## EXECUTIVE SUMMARY
2-3 sentences. Overall portfolio health, biggest strength, biggest concern.

## PER-TICKER ANALYSIS

### VOO — Vanguard S&P 500 ETF
**Recommendation:** HOLD / ADD / REDUCE / BUY / SELL
**Role in portfolio:** (what this position does for the portfolio)
**Assessment:** (2-3 sentences: quality of this holding, risks, outlook)
**Key risks:** (bullet list, max 3)

(repeat for each non-cash position)

## CASH POSITION
Comment on the ${cash_plain} in money market / cash ({cash_pct:.1}% of portfolio). Is it too high, appropriate, or should it be deployed?

## PORTFOLIO RISK ASSESSMENT
- Concentration risk:
- Diversification:
- Correlation risk:
- Overall rating: (CONSERVATIVE / BALANCED / AGGRESSIVE / OVER-CONCENTRATED)
",
        "Ticker",
        "Name",
        "Shares",
        "Price",
        "Value",
        "Alloc",
        today = today,
        total = thousands(total, 0),
        invested = thousands(invested, 0),
        invested_pct = pct_of(invested, total),
        cash = thousands(cash_total, 0),
        cash_pct = pct_of(cash_total, total),
        n_equity = portfolio.equity_count(),
        n_cash = portfolio.cash_count(),
        dashes = "-".repeat(120),
        holdings_table = holdings_table,
        market_section = market_section,
        fundamentals_section = fundamentals_section,
        news_section = news_section,
        cash_plain = thousands(cash_total, 0),
    )
}

/// "\nHEADER\n  line\n  line\n" or empty when no ticker has data.
fn context_section<F>(header: &str, tickers: &[String], lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut lines = Vec::new();
    for ticker in tickers {
        if let Some(summary) = lookup(ticker) {
            for line in summary.lines() {
                lines.push(format!("  {}", line));
            }
        }
    }
    if lines.is_empty() {
        return String::new();
    }
    format!("\n{}\n{}\n", header, lines.join("\n"))
}
