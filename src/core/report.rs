//! HTML report assembly. Exact numbers (summary card, holdings table)
//! come from the portfolio snapshot; the narrative sections are parsed
//! out of the LLM's markdown.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::format::thousands;
use crate::domain::model::{Holding, PortfolioAnalysis, PortfolioSnapshot};

fn priority_color(priority: &str) -> &'static str {
    match priority {
        "CRITICAL" => "#e74c3c",
        "HIGH" => "#e67e22",
        "MEDIUM" => "#f39c12",
        _ => "#7f8c8d",
    }
}

fn recommendation_color(recommendation: &str) -> &'static str {
    match recommendation {
        "BUY" | "ADD" => "#27ae60",
        "HOLD" => "#2980b9",
        "REDUCE" => "#e67e22",
        "SELL" => "#e74c3c",
        _ => "#7f8c8d",
    }
}

/// Content between `## heading` and the next `## ` heading (or EOF).
pub fn section(text: &str, heading: &str) -> String {
    let marker = format!("## {}", heading);

    let mut search_from = 0;
    let start = loop {
        let Some(pos) = text[search_from..].find(&marker) else {
            return String::new();
        };
        let abs = search_from + pos;
        // Heading must sit at the start of a line.
        if abs == 0 || text.as_bytes()[abs - 1] == b'\n' {
            break abs + marker.len();
        }
        search_from = abs + marker.len();
    };

    let body = &text[start..];
    let end = body.find("\n## ").unwrap_or(body.len());
    body[..end].trim().to_string()
}

fn pct_of(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    part / total * 100.0
}

// ── HTML block builders ──────────────────────────────────────────────────

fn header(total_value: f64, n_equity: usize, today: &str) -> String {
    let plural = if n_equity != 1 { "s" } else { "" };
    format!(
        r#"<h2 style="color:#1a1a2e;border-bottom:3px solid #4a90e2;padding-bottom:10px;margin-top:0;">
  Portfolio Analysis &mdash; {today}
</h2>
<div style="background:#f0f7ff;border-left:4px solid #4a90e2;padding:15px;border-radius:6px;margin:0 0 24px 0;">
  <p style="font-size:22px;font-weight:bold;margin:0 0 4px 0;">${total}</p>
  <p style="color:#666;margin:0;">{n_equity} equity position{plural} &nbsp;|&nbsp; {today}</p>
</div>"#,
        today = today,
        total = thousands(total_value, 0),
        n_equity = n_equity,
        plural = plural,
    )
}

fn warnings_banner(warnings: &[String]) -> String {
    if warnings.is_empty() {
        return String::new();
    }
    let items: String = warnings
        .iter()
        .map(|w| format!("<li style='margin:4px 0;'>{}</li>", w))
        .collect();
    format!(
        r#"<div style="background:#fff8e1;border-left:4px solid #ffc107;padding:15px;border-radius:6px;margin:0 0 24px 0;">
  <strong style="color:#856404;">&#9888; Data Freshness Notice</strong>
  <ul style="margin:8px 0 0 0;padding-left:18px;color:#555;">{}</ul>
  <p style="margin:8px 0 0 0;font-size:12px;color:#888;">Some positions may reflect cached data. Verify figures before acting.</p>
</div>"#,
        items
    )
}

fn holdings_table(holdings: &[Holding], total_value: f64) -> String {
    let mut rows = String::new();
    for (i, h) in holdings.iter().enumerate() {
        let bg = if i % 2 == 0 { "#ffffff" } else { "#f9f9f9" };
        let pct = pct_of(h.value, total_value);
        rows.push_str(&format!(
            r#"
  <tr style="background:{bg};border-bottom:1px solid #eee;">
    <td style="padding:10px;font-weight:bold;">{ticker}</td>
    <td style="padding:10px;">{name}</td>
    <td style="padding:10px;text-align:right;">{shares}</td>
    <td style="padding:10px;text-align:right;">${price}</td>
    <td style="padding:10px;text-align:right;">${value}</td>
    <td style="padding:10px;text-align:right;">{pct:.1}%</td>
    <td style="padding:10px;color:#888;font-size:12px;">{account}</td>
  </tr>"#,
            bg = bg,
            ticker = h.ticker,
            name = h.name,
            shares = thousands(h.shares, 2),
            price = thousands(h.price, 2),
            value = thousands(h.value, 0),
            pct = pct,
            account = h.account,
        ));
    }
    format!(
        r#"<h3 style="color:#1a1a2e;">Holdings</h3>
<table style="width:100%;border-collapse:collapse;font-size:14px;margin-bottom:24px;">
  <thead>
    <tr style="background:#1a1a2e;color:white;">
      <th style="padding:10px;text-align:left;">Symbol</th>
      <th style="padding:10px;text-align:left;">Name</th>
      <th style="padding:10px;text-align:right;">Shares</th>
      <th style="padding:10px;text-align:right;">Price</th>
      <th style="padding:10px;text-align:right;">Value</th>
      <th style="padding:10px;text-align:right;">Alloc</th>
      <th style="padding:10px;text-align:left;">Account</th>
    </tr>
  </thead>
  <tbody>{rows}
  </tbody>
</table>"#,
        rows = rows
    )
}

static ACTION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(CRITICAL|HIGH|MEDIUM|LOW)\]\s+(\w+)\s+[—–-]\s+(.+)$")
        .expect("action line pattern")
});

fn actions_table(raw: &str) -> String {
    let mut rows = String::new();
    for line in raw.lines() {
        let Some(caps) = ACTION_LINE.captures(line.trim()) else {
            continue;
        };
        let (priority, ticker, action) = (&caps[1], &caps[2], &caps[3]);
        let color = priority_color(priority);
        let badge = format!(
            r#"<span style="background:{color};color:white;padding:2px 8px;border-radius:4px;font-size:12px;font-weight:bold;">{priority}</span>"#,
        );
        rows.push_str(&format!(
            r#"
  <tr style="border-bottom:1px solid #eee;">
    <td style="padding:8px;">{badge}</td>
    <td style="padding:8px;font-weight:bold;">{ticker}</td>
    <td style="padding:8px;">{action}</td>
  </tr>"#,
        ));
    }
    if rows.is_empty() {
        return String::new();
    }
    format!(
        r#"<h3 style="color:#1a1a2e;">Recommended Actions</h3>
<table style="width:100%;border-collapse:collapse;font-size:14px;margin-bottom:24px;">
  <thead>
    <tr style="background:#1a1a2e;color:white;">
      <th style="padding:8px;text-align:left;">Priority</th>
      <th style="padding:8px;text-align:left;">Ticker</th>
      <th style="padding:8px;text-align:left;">Action</th>
    </tr>
  </thead>
  <tbody>{rows}
  </tbody>
</table>"#,
        rows = rows
    )
}

fn executive_summary(raw: &str) -> String {
    let body: String = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|p| format!("<p style='margin:4px 0;'>{}</p>", p))
        .collect();
    format!(
        r#"<div style="background:#f0f7ff;border-left:4px solid #4a90e2;padding:15px;border-radius:6px;margin:0 0 24px 0;">
  <h3 style="margin:0 0 10px 0;color:#4a90e2;">Executive Summary</h3>
  {body}
</div>"#,
        body = body
    )
}

static CARD_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^### (\w+)\s*[—–-]\s*(.+)$").expect("card heading pattern"));

/// Value of a `**Label:** value` line inside one ticker block.
fn card_field(block: &str, label: &str) -> String {
    let marker = format!("**{}:**", label);
    let Some(pos) = block.find(&marker) else {
        return String::new();
    };
    let rest = &block[pos + marker.len()..];
    let line = rest.lines().next().unwrap_or("");
    line.trim().to_string()
}

fn ticker_cards(raw: &str) -> String {
    let headings: Vec<_> = CARD_HEADING.captures_iter(raw).collect();
    if headings.is_empty() {
        return String::new();
    }

    let mut cards = String::new();
    for (i, caps) in headings.iter().enumerate() {
        let whole = caps.get(0).expect("match 0 always present");
        let block_end = headings
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(raw.len());
        let block = &raw[whole.start()..block_end];

        let ticker = &caps[1];
        let name = caps[2].trim();

        let rec = card_field(block, "Recommendation");
        let role = card_field(block, "Role in portfolio");
        let assess = card_field(block, "Assessment");
        let risks = card_field(block, "Key risks");

        let rec_key = rec
            .split_whitespace()
            .next()
            .unwrap_or("HOLD")
            .to_uppercase();
        let color = recommendation_color(&rec_key);

        let risks_html = if risks.is_empty() {
            String::new()
        } else {
            let items: String = risks
                .split([',', ';'])
                .map(|r| r.trim().trim_start_matches(['-', '•']).trim())
                .filter(|r| !r.is_empty())
                .map(|r| format!("<li>{}</li>", r))
                .collect();
            format!(
                "<p style='margin:4px 0;'><strong>Key risks:</strong></p>\
                 <ul style='margin:4px 0 0 0;padding-left:18px;'>{}</ul>",
                items
            )
        };

        let role_html = if role.is_empty() {
            String::new()
        } else {
            format!("<p style='margin:4px 0;'><strong>Role:</strong> {}</p>", role)
        };
        let assess_html = if assess.is_empty() {
            String::new()
        } else {
            format!(
                "<p style='margin:4px 0;'><strong>Assessment:</strong> {}</p>",
                assess
            )
        };

        cards.push_str(&format!(
            r#"<div style="border-left:4px solid {color};padding:15px;border-radius:6px;margin:0 0 16px 0;background:#fafafa;">
  <h3 style="margin:0 0 8px 0;color:{color};">{ticker} &mdash; {name}</h3>
  <p style="margin:4px 0;"><strong>Recommendation:</strong>
    <span style="color:{color};font-weight:bold;">{rec}</span></p>
  {role_html}
  {assess_html}
  {risks_html}
</div>"#,
        ));
    }

    format!("<h3 style='color:#1a1a2e;'>Per-Ticker Analysis</h3>{}", cards)
}

fn cash_block(raw: &str) -> String {
    format!(
        r#"<div style="background:#f0fff4;border-left:4px solid #27ae60;padding:15px;border-radius:6px;margin:0 0 24px 0;">
  <h3 style="margin:0 0 8px 0;color:#27ae60;">Cash Position</h3>
  <p style="margin:0;">{}</p>
</div>"#,
        raw.trim()
    )
}

fn risk_block(raw: &str) -> String {
    let items: String = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            format!(
                "<li style='margin:4px 0;'>{}</li>",
                l.trim_start_matches(['-', '•']).trim()
            )
        })
        .collect();
    format!(
        r#"<div style="background:#f9f9f9;border-radius:6px;padding:15px;margin:0 0 24px 0;">
  <h3 style="margin:0 0 10px 0;color:#1a1a2e;">Portfolio Risk Assessment</h3>
  <ul style="margin:0;padding-left:18px;">{}</ul>
</div>"#,
        items
    )
}

fn footer(today: &str) -> String {
    format!(
        r#"<div style="margin-top:30px;padding:12px;background:#f9f9f9;border-radius:6px;font-size:12px;color:#999;">
  <strong>Disclaimer:</strong> This analysis is for informational purposes only and does not
  constitute financial advice. Always consult a licensed financial advisor before making
  investment decisions.<br><br>
  Generated by portfolio-report &middot; {}
</div>"#,
        today
    )
}

// ── Assembler ────────────────────────────────────────────────────────────

pub fn build_html(
    portfolio: &PortfolioSnapshot,
    analysis: &PortfolioAnalysis,
    today: &str,
) -> String {
    let raw = &analysis.raw_markdown;

    let s_actions = section(raw, "RECOMMENDED ACTIONS");
    let s_summary = section(raw, "EXECUTIVE SUMMARY");
    let s_per_ticker = section(raw, "PER-TICKER ANALYSIS");
    let s_cash = section(raw, "CASH POSITION");
    let s_risk = section(raw, "PORTFOLIO RISK ASSESSMENT");

    let mut body = String::new();
    body.push_str(&header(
        portfolio.total_value,
        portfolio.equity_count(),
        today,
    ));
    body.push_str(&warnings_banner(&portfolio.data_warnings));
    body.push_str(&holdings_table(&portfolio.holdings, portfolio.total_value));
    if !s_actions.is_empty() {
        body.push_str(&actions_table(&s_actions));
    }
    if !s_summary.is_empty() {
        body.push_str(&executive_summary(&s_summary));
    }
    if !s_per_ticker.is_empty() {
        body.push_str(&ticker_cards(&s_per_ticker));
    }
    if !s_cash.is_empty() {
        body.push_str(&cash_block(&s_cash));
    }
    if !s_risk.is_empty() {
        body.push_str(&risk_block(&s_risk));
    }
    body.push_str(&footer(today));

    format!(
        "<!DOCTYPE html><html><body style=\"font-family:Arial,sans-serif;max-width:720px;margin:auto;padding:20px;color:#333;\">{}</body></html>",
        body
    )
}
