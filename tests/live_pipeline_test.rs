//! End-to-end runs against mocked broker/market HTTP services, with a
//! canned chat model standing in for the inference runtime.

use clap::Parser;
use httpmock::prelude::*;
use tempfile::TempDir;

use portfolio_report::config::env::AgentEndpoints;
use portfolio_report::domain::mock_data::CannedChat;
use portfolio_report::utils::validation::Validate;
use portfolio_report::{CliConfig, LocalStorage, ReportEngine, ReportPipeline};

fn live_config(server: &MockServer, out_dir: &TempDir, cache_dir: &TempDir) -> CliConfig {
    let mut config = CliConfig::try_parse_from([
        "portfolio-report",
        "--no-email",
        "--output-path",
        out_dir.path().to_str().unwrap(),
        "--cache-path",
        cache_dir.path().to_str().unwrap(),
    ])
    .unwrap();
    config.endpoints = AgentEndpoints {
        robinhood_url: server.url("/rh"),
        fidelity_url: server.url("/fid"),
        market_data_url: server.url("/mkt"),
        ollama_url: "http://localhost:11434".to_string(),
    };
    config.validate().unwrap();
    config
}

fn mount_market(server: &MockServer) {
    let candles: Vec<serde_json::Value> = (0..80)
        .map(|i| {
            let dip = if i % 3 == 0 { 2.0 } else { 0.0 };
            let close = 500.0 + i as f64 - dip;
            serde_json::json!({
                "date": format!("2026-{:02}-{:02}", 4 + i / 28, 1 + i % 28),
                "open": 500.0 + i as f64,
                "high": 505.0 + i as f64,
                "low": 495.0 + i as f64,
                "close": close,
                "volume": 1_000_000.0
            })
        })
        .collect();
    server.mock(|when, then| {
        when.method(GET).path("/mkt/history");
        then.status(200).json_body(serde_json::json!({
            "VOO": candles.clone(),
            "QQMG": candles
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/mkt/info");
        then.status(200).json_body(serde_json::json!({
            "VOO": {"sector": "Index", "industry": "Large Blend", "marketCap": 1.2e12,
                    "trailingPE": 27.0, "beta": 1.0, "dividendYield": 1.3}
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/mkt/news");
        then.status(200).json_body(serde_json::json!([]));
    });
}

#[tokio::test]
async fn test_live_run_merges_brokers_and_saves_report() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/rh/holdings");
        then.status(200).json_body(serde_json::json!({
            "QQMG": {"price": "28.40", "quantity": "7", "equity": "198.80",
                     "type": "etf", "name": "Invesco NASDAQ 100 ETF"}
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/fid/holdings");
        then.status(200).json_body(serde_json::json!({
            "holdings": [
                {"account_id": "Z24", "ticker": "VOO", "name": "Vanguard S&P 500 ETF",
                 "shares": 298.0, "price": 541.8, "market_value": 161456.0},
                {"account_id": "Z24", "ticker": "QQMG", "name": "Invesco NASDAQ 100 ETF",
                 "shares": 1111.0, "price": 28.4, "market_value": 31552.2},
                {"account_id": "Z31", "ticker": "SPAXX", "name": "Fidelity Government Money Market",
                 "shares": 8200.0, "price": 1.0, "market_value": 8200.0}
            ]
        }));
    });
    mount_market(&server);

    let out_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let config = live_config(&server, &out_dir, &cache_dir);

    let pipeline = ReportPipeline::new(
        LocalStorage::new(config.output_path.clone()),
        LocalStorage::new(config.cache_path.clone()),
        config,
        reqwest::Client::new(),
        Box::new(CannedChat),
        None,
    );

    ReportEngine::new(pipeline).run().await.unwrap();

    let html = std::fs::read_to_string(out_dir.path().join("report.html")).unwrap();
    // Cross-broker QQMG merged into one row: 7 + 1111 shares.
    assert!(html.contains("1,118.00"));
    assert!(html.contains("Fidelity-Z24 + Robinhood"));
    assert!(html.contains("SPAXX"));
    assert!(!html.contains("Data Freshness Notice"));

    // Live fetches leave snapshots behind for the next bad day.
    assert!(cache_dir.path().join("robinhood_snapshot.json").exists());
    assert!(cache_dir.path().join("fidelity_snapshot.json").exists());
}

#[tokio::test]
async fn test_broker_outage_uses_cache_and_flags_report() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/rh/holdings");
        then.status(503);
    });
    server.mock(|when, then| {
        when.method(GET).path("/fid/holdings");
        then.status(200).json_body(serde_json::json!({
            "holdings": [
                {"account_id": "Z24", "ticker": "VOO", "name": "Vanguard S&P 500 ETF",
                 "shares": 298.0, "price": 541.8, "market_value": 161456.0}
            ]
        }));
    });
    mount_market(&server);

    let out_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();

    // Seed the snapshot a previous good run would have left.
    std::fs::write(
        cache_dir.path().join("robinhood_snapshot.json"),
        serde_json::to_vec_pretty(&serde_json::json!({
            "fetched_at": "2026-08-06T09:12:00",
            "holdings": [{
                "ticker": "QQMG", "name": "Invesco NASDAQ 100 ETF", "shares": 7.0,
                "price": 28.4, "value": 198.8, "account": "Robinhood",
                "asset_type": "etf"
            }]
        }))
        .unwrap(),
    )
    .unwrap();

    let config = live_config(&server, &out_dir, &cache_dir);
    let pipeline = ReportPipeline::new(
        LocalStorage::new(config.output_path.clone()),
        LocalStorage::new(config.cache_path.clone()),
        config,
        reqwest::Client::new(),
        Box::new(CannedChat),
        None,
    );

    ReportEngine::new(pipeline).run().await.unwrap();

    let html = std::fs::read_to_string(out_dir.path().join("report.html")).unwrap();
    assert!(html.contains("Data Freshness Notice"));
    assert!(html.contains("2026-08-06T09:12:00"));
    // Cached Robinhood position still shows up in the holdings table.
    assert!(html.contains("QQMG"));
}
