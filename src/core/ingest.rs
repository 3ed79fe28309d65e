//! Holdings normalization: parse the two broker payloads, classify
//! tickers, merge cross-account and cross-broker duplicates, and keep a
//! per-broker snapshot on disk as a fallback for failed live fetches.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::adapters::brokers::FidelityRow;
use crate::domain::model::{AssetType, Holding};
use crate::domain::ports::Storage;

/// Money-market / sweep symbols that never have price history.
const CASH_TICKERS: &[&str] = &["SPAXX", "FCASH", "CORE", "FDRXX", "FZFXX", "FDIC", "VMFXX"];

// Expanded as new positions appear.
const KNOWN_ETFS: &[&str] = &[
    "VOO", "QQQ", "QQMG", "SPY", "IVV", "VTI", "VEA", "VWO", "BND", "SCHB", "SCHD", "JEPI",
    "JEPQ", "QQQM",
];

const NAME_MAX_LEN: usize = 50;

pub fn classify(ticker: &str, broker_type: Option<&str>) -> AssetType {
    if CASH_TICKERS.contains(&ticker) {
        return AssetType::Cash;
    }
    if KNOWN_ETFS.contains(&ticker) {
        return AssetType::Etf;
    }
    if broker_type.is_some_and(|t| t.eq_ignore_ascii_case("etf")) {
        return AssetType::Etf;
    }
    AssetType::Stock
}

/// Accepts numbers or numeric strings (Robinhood sends every numeric
/// field as a string).
fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truncate_name(name: &str) -> String {
    name.chars().take(NAME_MAX_LEN).collect()
}

/// Parse the Robinhood holdings map: `{ "TICKER": {price, quantity,
/// equity, type, name, ...} }`. Unparseable or zero-share entries are
/// dropped.
pub fn parse_robinhood(raw: &HashMap<String, Value>) -> Vec<Holding> {
    let mut holdings = Vec::new();

    for (ticker, data) in raw {
        let Value::Object(fields) = data else {
            continue;
        };

        let shares = lenient_f64(fields.get("quantity")).unwrap_or(0.0);
        if shares <= 0.0 {
            continue;
        }
        let price = lenient_f64(fields.get("price")).unwrap_or(0.0);
        let mut value = lenient_f64(fields.get("equity")).unwrap_or(0.0);
        if value == 0.0 {
            value = shares * price;
        }

        let name = fields
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(ticker);
        let rh_type = fields.get("type").and_then(|v| v.as_str());

        let ticker = ticker.to_uppercase();
        let asset_type = classify(&ticker, rh_type);
        holdings.push(Holding {
            name: truncate_name(name),
            ticker,
            shares,
            price,
            value,
            account: "Robinhood".to_string(),
            asset_type,
        });
    }

    holdings
}

/// Parse the Fidelity holdings rows. Rows with no ticker, or with
/// neither shares nor value, are dropped.
pub fn parse_fidelity(rows: &[FidelityRow]) -> Vec<Holding> {
    let mut holdings = Vec::new();

    for row in rows {
        let Some(ticker) = row.ticker.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };
        let ticker = ticker.to_uppercase();

        let shares = row.shares.unwrap_or(0.0);
        let price = row.price.unwrap_or(0.0);
        let mut value = row.market_value.unwrap_or(0.0);
        if value == 0.0 {
            value = shares * price;
        }
        if shares <= 0.0 && value <= 0.0 {
            continue;
        }

        let name = row.name.as_deref().unwrap_or(&ticker);
        let account = row
            .account_id
            .as_deref()
            .map(|id| format!("Fidelity-{}", id))
            .unwrap_or_else(|| "Fidelity".to_string());

        let asset_type = classify(&ticker, None);
        holdings.push(Holding {
            name: truncate_name(name),
            ticker,
            shares,
            price,
            value,
            account,
            asset_type,
        });
    }

    holdings
}

/// Merge both brokers' holdings, summing shares/values for duplicate
/// tickers. Multiple Fidelity accounts and cross-broker duplicates each
/// collapse to one row. The result is sorted equities-by-value, cash
/// last.
pub fn merge(robinhood: Vec<Holding>, fidelity: Vec<Holding>) -> Vec<Holding> {
    let mut by_ticker: HashMap<String, Vec<Holding>> = HashMap::new();
    for holding in robinhood.into_iter().chain(fidelity) {
        by_ticker.entry(holding.ticker.clone()).or_default().push(holding);
    }

    let mut merged = Vec::with_capacity(by_ticker.len());
    for (ticker, mut entries) in by_ticker {
        if entries.len() == 1 {
            merged.push(entries.remove(0));
            continue;
        }

        let total_shares: f64 = entries.iter().map(|e| e.shares).sum();
        let total_value: f64 = entries.iter().map(|e| e.value).sum();

        // Name/price/type come from the most significant position.
        let primary = entries
            .iter()
            .max_by(|a, b| a.shares.partial_cmp(&b.shares).unwrap_or(Ordering::Equal))
            .expect("entries is non-empty");

        let accounts: BTreeSet<&str> = entries.iter().map(|e| e.account.as_str()).collect();
        let account = accounts.into_iter().collect::<Vec<_>>().join(" + ");

        merged.push(Holding {
            ticker,
            name: primary.name.clone(),
            shares: total_shares,
            price: primary.price,
            value: total_value,
            account,
            asset_type: primary.asset_type,
        });
    }

    merged.sort_by(|a, b| {
        (a.is_cash() as u8)
            .cmp(&(b.is_cash() as u8))
            .then(b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal))
    });
    merged
}

// ── Snapshot cache ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSnapshot {
    pub fetched_at: String,
    pub holdings: Vec<Holding>,
}

fn snapshot_file(broker: &str) -> String {
    format!("{}_snapshot.json", broker)
}

/// Persist a successful fetch. A cache write failure is only logged —
/// it must never fail the run that just fetched live data.
pub async fn save_snapshot<S: Storage>(storage: &S, broker: &str, holdings: &[Holding]) {
    let snapshot = BrokerSnapshot {
        fetched_at: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        holdings: holdings.to_vec(),
    };

    let payload = match serde_json::to_vec_pretty(&snapshot) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("{} snapshot serialize failed: {}", broker, e);
            return;
        }
    };
    if let Err(e) = storage.write_file(&snapshot_file(broker), &payload).await {
        tracing::warn!("{} snapshot write failed: {}", broker, e);
    }
}

/// Last cached snapshot for a broker, if any.
pub async fn load_snapshot<S: Storage>(storage: &S, broker: &str) -> Option<BrokerSnapshot> {
    let data = storage.read_file(&snapshot_file(broker)).await.ok()?;
    serde_json::from_slice(&data).ok()
}
