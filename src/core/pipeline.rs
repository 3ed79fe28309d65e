use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde_json::Value;
use std::time::Instant;

use crate::adapters::brokers::{FidelityClient, RobinhoodClient};
use crate::adapters::market::{closes, MarketDataClient};
use crate::core::ingest::{load_snapshot, merge, parse_fidelity, parse_robinhood, save_snapshot};
use crate::core::prompt::{build_prompt, SYSTEM_PROMPT};
use crate::core::report::build_html;
use crate::domain::mock_data;
use crate::domain::model::{Holding, MarketContext, PortfolioAnalysis, PortfolioSnapshot};
use crate::domain::ports::{ChatModel, ConfigProvider, Mailer, Pipeline, Storage};
use crate::domain::services::{fundamentals, sentiment, technicals};
use crate::utils::error::{ReportError, Result};

const REPORT_FILE: &str = "report.html";

pub struct ReportPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    cache: S,
    config: C,
    client: Client,
    llm: Box<dyn ChatModel>,
    mailer: Option<Box<dyn Mailer>>,
}

impl<S: Storage, C: ConfigProvider> ReportPipeline<S, C> {
    pub fn new(
        storage: S,
        cache: S,
        config: C,
        client: Client,
        llm: Box<dyn ChatModel>,
        mailer: Option<Box<dyn Mailer>>,
    ) -> Self {
        Self {
            storage,
            cache,
            config,
            client,
            llm,
            mailer,
        }
    }

    /// Broker fetch failed: try the last snapshot, and record what the
    /// rest of the pipeline (and the report banner) should know.
    async fn broker_fallback(
        &self,
        broker_label: &str,
        cache_key: &str,
        reason: &str,
        warnings: &mut Vec<String>,
    ) -> Vec<Holding> {
        match load_snapshot(&self.cache, cache_key).await {
            Some(snapshot) => {
                let msg = format!(
                    "{} data from cache (last fetched: {}) — {}.",
                    broker_label, snapshot.fetched_at, reason
                );
                tracing::warn!("[fallback] {}", msg);
                warnings.push(msg);
                snapshot.holdings
            }
            None => {
                warnings.push(format!(
                    "{} fetch failed and no cache available — positions excluded.",
                    broker_label
                ));
                Vec::new()
            }
        }
    }
}

fn truncate_error(err: &Value) -> String {
    let text = match err {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.chars().take(120).collect()
}

#[async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ReportPipeline<S, C> {
    async fn ingest(&self) -> Result<PortfolioSnapshot> {
        if self.config.mock() {
            tracing::info!("Mock mode — using built-in holdings");
            return Ok(PortfolioSnapshot::new(mock_data::mock_holdings(), vec![]));
        }

        let robinhood = RobinhoodClient::new(self.client.clone(), self.config.robinhood_url());
        let fidelity = FidelityClient::new(self.client.clone(), self.config.fidelity_url());

        tracing::info!("Fetching Robinhood holdings...");
        tracing::info!("Fetching Fidelity holdings (browser agent — may take ~10s)...");
        let (rh_raw, fid_raw) = tokio::join!(robinhood.get_holdings(), fidelity.get_holdings());

        let mut warnings = Vec::new();

        let rh_holdings = match rh_raw {
            Ok(raw) => {
                let holdings = parse_robinhood(&raw);
                tracing::info!("Robinhood: {} positions", holdings.len());
                save_snapshot(&self.cache, "robinhood", &holdings).await;
                holdings
            }
            Err(e) => {
                tracing::warn!("Robinhood live fetch failed: {}", e);
                self.broker_fallback("Robinhood", "robinhood", "live fetch failed", &mut warnings)
                    .await
            }
        };

        let fid_holdings = match fid_raw {
            Ok(response) if response.holdings.is_empty() && response.error.is_some() => {
                let err = response
                    .error
                    .as_ref()
                    .map(truncate_error)
                    .unwrap_or_default();
                tracing::warn!("Fidelity error: {}", err);
                self.broker_fallback(
                    "Fidelity",
                    "fidelity",
                    &format!("server returned error: {}", err),
                    &mut warnings,
                )
                .await
            }
            Ok(response) => {
                let holdings = parse_fidelity(&response.holdings);
                tracing::info!("Fidelity: {} positions", holdings.len());
                save_snapshot(&self.cache, "fidelity", &holdings).await;
                holdings
            }
            Err(e) => {
                tracing::warn!("Fidelity live fetch failed: {}", e);
                self.broker_fallback("Fidelity", "fidelity", "live fetch failed", &mut warnings)
                    .await
            }
        };

        let merged = merge(rh_holdings, fid_holdings);
        if merged.is_empty() {
            return Err(ReportError::IngestError {
                message: "No holdings fetched from either broker. Check the agent services or use --mock for an offline run.".to_string(),
            });
        }

        Ok(PortfolioSnapshot::new(merged, warnings))
    }

    async fn enrich(&self, portfolio: &PortfolioSnapshot) -> Result<MarketContext> {
        let tickers = portfolio.equity_tickers();
        if tickers.is_empty() {
            tracing::warn!("No equity tickers to enrich");
            return Ok(MarketContext::default());
        }

        if self.config.mock() {
            tracing::info!("Mock mode — synthesizing price history");
            let history = mock_data::mock_price_history(&tickers);
            return Ok(MarketContext {
                technicals: technicals::compute(&history),
                ..Default::default()
            });
        }

        let market = MarketDataClient::new(self.client.clone(), self.config.market_data_url());

        let t0 = Instant::now();
        let history = market
            .fetch_price_history(&tickers, self.config.history_range())
            .await?;
        tracing::info!(
            "Downloaded {}/{} tickers ({:.1}s)",
            history.len(),
            tickers.len(),
            t0.elapsed().as_secs_f64()
        );

        let technicals = technicals::compute(&closes(&history));
        tracing::info!("Technicals computed for {} tickers", technicals.len());

        // Fundamentals and news enrich the prompt but never fail the run.
        let fundamentals = match market.fetch_info(&tickers).await {
            Ok(raw) => fundamentals::compute(&tickers, &raw),
            Err(e) => {
                tracing::warn!("Fundamentals fetch failed — continuing without: {}", e);
                Default::default()
            }
        };
        let news = sentiment::compute_all(market.fetch_news(&tickers).await);

        Ok(MarketContext {
            technicals,
            fundamentals,
            news,
        })
    }

    async fn summarize(
        &self,
        portfolio: &PortfolioSnapshot,
        market: &MarketContext,
    ) -> Result<PortfolioAnalysis> {
        let today = Local::now().format("%B %d, %Y").to_string();
        let prompt = build_prompt(portfolio, market, &today);
        tracing::info!(
            "Requesting analysis from {} ({} prompt chars)",
            self.llm.model_name(),
            prompt.len()
        );

        let t0 = Instant::now();
        let raw_markdown = self.llm.complete(SYSTEM_PROMPT, &prompt).await?;
        let elapsed = t0.elapsed().as_secs_f64();
        let words = raw_markdown.split_whitespace().count();
        tracing::info!(
            "Analysis done: {} words in {:.1}s (~{:.0} words/s)",
            words,
            elapsed,
            words as f64 / elapsed.max(0.001)
        );

        Ok(PortfolioAnalysis { raw_markdown })
    }

    async fn deliver(
        &self,
        portfolio: &PortfolioSnapshot,
        analysis: &PortfolioAnalysis,
    ) -> Result<String> {
        if analysis.is_empty() {
            tracing::warn!("No analysis produced — skipping report delivery");
            return Ok("skipped (no analysis)".to_string());
        }

        let today = Local::now().format("%B %d, %Y").to_string();
        let html = build_html(portfolio, analysis, &today);

        self.storage.write_file(REPORT_FILE, html.as_bytes()).await?;
        let saved = format!(
            "{}/{}",
            self.config.output_path().trim_end_matches('/'),
            REPORT_FILE
        );
        tracing::info!("Report saved to {}", saved);

        match &self.mailer {
            Some(mailer) => {
                let subject = format!("Portfolio Analysis — {}", today);
                let t0 = Instant::now();
                let confirmation = mailer.send_html(&subject, &html)?;
                tracing::info!("Email {} ({:.1}s)", confirmation, t0.elapsed().as_secs_f64());
                Ok(format!("{} — email {}", saved, confirmation))
            }
            None => {
                tracing::info!("Email delivery off — report saved only");
                Ok(saved)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mock_data::CannedChat;
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }

        async fn put_file(&self, path: &str, data: &[u8]) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                ReportError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        mock: bool,
        robinhood_url: String,
        fidelity_url: String,
        market_data_url: String,
    }

    impl MockConfig {
        fn mock_mode() -> Self {
            Self {
                mock: true,
                robinhood_url: String::new(),
                fidelity_url: String::new(),
                market_data_url: String::new(),
            }
        }

        fn live(base_url: &str) -> Self {
            Self {
                mock: false,
                robinhood_url: format!("{}/robinhood", base_url),
                fidelity_url: format!("{}/fidelity", base_url),
                market_data_url: format!("{}/market", base_url),
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn mock(&self) -> bool {
            self.mock
        }
        fn email_enabled(&self) -> bool {
            false
        }
        fn model(&self) -> &str {
            "canned"
        }
        fn max_tokens(&self) -> usize {
            4096
        }
        fn history_range(&self) -> &str {
            "1y"
        }
        fn output_path(&self) -> &str {
            "test_output"
        }
        fn cache_path(&self) -> &str {
            "test_cache"
        }
        fn robinhood_url(&self) -> &str {
            &self.robinhood_url
        }
        fn fidelity_url(&self) -> &str {
            &self.fidelity_url
        }
        fn market_data_url(&self) -> &str {
            &self.market_data_url
        }
    }

    #[derive(Clone, Default)]
    struct RecordingMailer {
        sent: Arc<std::sync::Mutex<Vec<(String, String)>>>,
    }

    impl Mailer for RecordingMailer {
        fn send_html(&self, subject: &str, html_body: &str) -> Result<String> {
            self.sent
                .lock()
                .expect("mailer lock")
                .push((subject.to_string(), html_body.to_string()));
            Ok("sent to test@example.com (250 Ok)".to_string())
        }
    }

    fn pipeline(
        storage: MockStorage,
        cache: MockStorage,
        config: MockConfig,
        mailer: Option<Box<dyn Mailer>>,
    ) -> ReportPipeline<MockStorage, MockConfig> {
        ReportPipeline::new(storage, cache, config, Client::new(), Box::new(CannedChat), mailer)
    }

    fn robinhood_body() -> serde_json::Value {
        serde_json::json!({
            "SNOW": {"price": "148.50", "quantity": "25", "equity": "3712.50",
                     "type": "stock", "name": "Snowflake Inc"},
            "QQMG": {"price": "28.40", "quantity": "7", "equity": "198.80",
                     "type": "etf", "name": "Invesco NASDAQ 100 ETF"}
        })
    }

    fn fidelity_body() -> serde_json::Value {
        serde_json::json!({
            "holdings": [
                {"account_id": "Z24", "ticker": "VOO", "name": "Vanguard S&P 500 ETF",
                 "shares": 298.0, "price": 541.8, "market_value": 161456.0},
                {"account_id": "Z24", "ticker": "QQMG", "name": "Invesco NASDAQ 100 ETF",
                 "shares": 1111.0, "price": 28.4, "market_value": 31552.2},
                {"account_id": "Z31", "ticker": "SPAXX", "name": "Fidelity Government Money Market",
                 "shares": 8200.0, "price": 1.0, "market_value": 8200.0}
            ]
        })
    }

    #[tokio::test]
    async fn test_ingest_mock_mode_is_offline() {
        let pipeline = pipeline(
            MockStorage::default(),
            MockStorage::default(),
            MockConfig::mock_mode(),
            None,
        );

        let portfolio = pipeline.ingest().await.unwrap();
        assert_eq!(portfolio.holdings.len(), 5);
        assert!(portfolio.data_warnings.is_empty());
        assert_eq!(portfolio.equity_tickers(), vec!["VOO", "QQMG", "SNOW"]);
    }

    #[tokio::test]
    async fn test_ingest_merges_both_brokers_and_caches() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/robinhood/holdings");
            then.status(200).json_body(robinhood_body());
        });
        server.mock(|when, then| {
            when.method(GET).path("/fidelity/holdings");
            then.status(200).json_body(fidelity_body());
        });

        let cache = MockStorage::default();
        let pipeline = pipeline(
            MockStorage::default(),
            cache.clone(),
            MockConfig::live(&server.url("")),
            None,
        );

        let portfolio = pipeline.ingest().await.unwrap();

        // QQMG merged across brokers: 7 + 1111 shares
        let qqmg = portfolio
            .holdings
            .iter()
            .find(|h| h.ticker == "QQMG")
            .unwrap();
        assert!((qqmg.shares - 1118.0).abs() < 1e-9);
        assert_eq!(qqmg.account, "Fidelity-Z24 + Robinhood");
        assert!(portfolio.data_warnings.is_empty());

        // Both snapshots persisted for future fallbacks.
        assert!(cache.get_file("robinhood_snapshot.json").await.is_some());
        assert!(cache.get_file("fidelity_snapshot.json").await.is_some());
    }

    #[tokio::test]
    async fn test_ingest_falls_back_to_cache_on_broker_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/robinhood/holdings");
            then.status(500);
        });
        server.mock(|when, then| {
            when.method(GET).path("/fidelity/holdings");
            then.status(200).json_body(fidelity_body());
        });

        let cache = MockStorage::default();
        cache
            .put_file(
                "robinhood_snapshot.json",
                serde_json::to_vec(&serde_json::json!({
                    "fetched_at": "2026-08-06T09:12:00",
                    "holdings": [{
                        "ticker": "SNOW", "name": "Snowflake Inc", "shares": 25.0,
                        "price": 148.5, "value": 3712.5, "account": "Robinhood",
                        "asset_type": "stock"
                    }]
                }))
                .unwrap()
                .as_slice(),
            )
            .await;

        let pipeline = pipeline(
            MockStorage::default(),
            cache,
            MockConfig::live(&server.url("")),
            None,
        );

        let portfolio = pipeline.ingest().await.unwrap();
        assert!(portfolio.holdings.iter().any(|h| h.ticker == "SNOW"));
        assert_eq!(portfolio.data_warnings.len(), 1);
        assert!(portfolio.data_warnings[0].contains("2026-08-06T09:12:00"));
        assert!(portfolio.data_warnings[0].contains("live fetch failed"));
    }

    #[tokio::test]
    async fn test_ingest_fidelity_error_payload_without_cache() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/robinhood/holdings");
            then.status(200).json_body(robinhood_body());
        });
        server.mock(|when, then| {
            when.method(GET).path("/fidelity/holdings");
            then.status(200)
                .json_body(serde_json::json!({"holdings": [], "error": "session expired"}));
        });

        let pipeline = pipeline(
            MockStorage::default(),
            MockStorage::default(),
            MockConfig::live(&server.url("")),
            None,
        );

        let portfolio = pipeline.ingest().await.unwrap();
        // Robinhood positions still present, Fidelity excluded with a warning.
        assert!(portfolio.holdings.iter().any(|h| h.ticker == "SNOW"));
        assert!(!portfolio.holdings.iter().any(|h| h.ticker == "VOO"));
        assert_eq!(portfolio.data_warnings.len(), 1);
        assert!(portfolio.data_warnings[0].contains("no cache available"));
    }

    #[tokio::test]
    async fn test_ingest_fails_when_both_brokers_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path_contains("/holdings");
            then.status(500);
        });

        let pipeline = pipeline(
            MockStorage::default(),
            MockStorage::default(),
            MockConfig::live(&server.url("")),
            None,
        );

        let err = pipeline.ingest().await.unwrap_err();
        assert!(matches!(err, ReportError::IngestError { .. }));
        assert!(err.to_string().contains("--mock"));
    }

    #[tokio::test]
    async fn test_enrich_mock_mode_computes_technicals_offline() {
        let pipeline = pipeline(
            MockStorage::default(),
            MockStorage::default(),
            MockConfig::mock_mode(),
            None,
        );

        let portfolio = pipeline.ingest().await.unwrap();
        let market = pipeline.enrich(&portfolio).await.unwrap();

        assert_eq!(market.technicals.len(), 3);
        assert!(market.technicals.contains_key("VOO"));
        // 260 synthetic bars: every indicator window is satisfied
        assert!(market.technicals["VOO"].sma_200.is_some());
        assert!(market.fundamentals.is_empty());
        assert!(market.news.is_empty());
    }

    #[tokio::test]
    async fn test_enrich_live_fetches_all_three_sources() {
        let server = MockServer::start();
        let candles: Vec<serde_json::Value> = (0..60)
            .map(|i| {
                serde_json::json!({
                    "date": format!("2026-{:02}-{:02}", 3 + i / 28, 1 + i % 28),
                    "open": 500.0 + i as f64, "high": 505.0 + i as f64,
                    "low": 495.0 + i as f64, "close": 500.0 + i as f64,
                    "volume": 1000000.0
                })
            })
            .collect();
        server.mock(|when, then| {
            when.method(GET).path("/market/history");
            then.status(200)
                .json_body(serde_json::json!({"VOO": candles}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/market/info");
            then.status(200).json_body(serde_json::json!({
                "VOO": {"sector": "Index", "industry": "Large Blend",
                        "marketCap": 1.0e12, "trailingPE": 27.1,
                        "beta": 1.0, "dividendYield": 1.3}
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/market/news");
            then.status(200).json_body(serde_json::json!([
                {"title": "Index funds rally to record highs", "publisher": "Newswire",
                 "published_at": chrono::Utc::now().to_rfc3339(), "url": "https://example.com"}
            ]));
        });

        let config = MockConfig::live(&server.url(""));
        let pipeline = pipeline(MockStorage::default(), MockStorage::default(), config, None);

        let portfolio = PortfolioSnapshot::new(
            vec![Holding {
                ticker: "VOO".to_string(),
                name: "Vanguard S&P 500 ETF".to_string(),
                shares: 298.0,
                price: 541.8,
                value: 161456.0,
                account: "Fidelity-Z24".to_string(),
                asset_type: crate::domain::model::AssetType::Etf,
            }],
            vec![],
        );

        let market = pipeline.enrich(&portfolio).await.unwrap();
        assert!(market.technicals.contains_key("VOO"));
        assert_eq!(
            market.fundamentals["VOO"].sector.as_deref(),
            Some("Index")
        );
        let news = &market.news["VOO"];
        assert_eq!(news.headline_count, 1);
        assert_eq!(
            news.sentiment_label,
            crate::domain::services::sentiment::SentimentLabel::Bullish
        );
    }

    #[tokio::test]
    async fn test_enrich_fundamentals_failure_degrades() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/market/history");
            then.status(200).json_body(serde_json::json!({"VOO": [
                {"date": "2026-08-06", "open": 540.0, "high": 544.0,
                 "low": 538.0, "close": 541.8, "volume": 1000000.0}
            ]}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/market/info");
            then.status(500);
        });
        server.mock(|when, then| {
            when.method(GET).path("/market/news");
            then.status(500);
        });

        let pipeline = pipeline(
            MockStorage::default(),
            MockStorage::default(),
            MockConfig::live(&server.url("")),
            None,
        );
        let portfolio = PortfolioSnapshot::new(
            vec![Holding {
                ticker: "VOO".to_string(),
                name: "Vanguard S&P 500 ETF".to_string(),
                shares: 1.0,
                price: 541.8,
                value: 541.8,
                account: "Fidelity".to_string(),
                asset_type: crate::domain::model::AssetType::Etf,
            }],
            vec![],
        );

        let market = pipeline.enrich(&portfolio).await.unwrap();
        assert!(market.technicals.contains_key("VOO"));
        assert!(market.fundamentals.is_empty());
        assert!(market.news.is_empty());
    }

    #[tokio::test]
    async fn test_summarize_with_canned_model() {
        let pipeline = pipeline(
            MockStorage::default(),
            MockStorage::default(),
            MockConfig::mock_mode(),
            None,
        );

        let portfolio = pipeline.ingest().await.unwrap();
        let market = pipeline.enrich(&portfolio).await.unwrap();
        let analysis = pipeline.summarize(&portfolio, &market).await.unwrap();

        assert!(analysis.raw_markdown.contains("## RECOMMENDED ACTIONS"));
        assert!(!analysis.is_empty());
    }

    #[tokio::test]
    async fn test_deliver_saves_report_without_mailer() {
        let storage = MockStorage::default();
        let pipeline = pipeline(
            storage.clone(),
            MockStorage::default(),
            MockConfig::mock_mode(),
            None,
        );

        let portfolio = pipeline.ingest().await.unwrap();
        let analysis = PortfolioAnalysis {
            raw_markdown: crate::domain::mock_data::canned_analysis_markdown(),
        };

        let outcome = pipeline.deliver(&portfolio, &analysis).await.unwrap();
        assert_eq!(outcome, "test_output/report.html");

        let html = String::from_utf8(storage.get_file("report.html").await.unwrap()).unwrap();
        assert!(html.contains("Portfolio Analysis"));
        assert!(html.contains("VOO"));
    }

    #[tokio::test]
    async fn test_deliver_sends_email_when_mailer_present() {
        let storage = MockStorage::default();
        let mailer = RecordingMailer::default();
        let pipeline = pipeline(
            storage.clone(),
            MockStorage::default(),
            MockConfig::mock_mode(),
            Some(Box::new(mailer.clone())),
        );

        let portfolio = pipeline.ingest().await.unwrap();
        let analysis = PortfolioAnalysis {
            raw_markdown: crate::domain::mock_data::canned_analysis_markdown(),
        };

        let outcome = pipeline.deliver(&portfolio, &analysis).await.unwrap();
        assert!(outcome.contains("sent to test@example.com"));

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.starts_with("Portfolio Analysis — "));
        assert!(sent[0].1.contains("<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn test_deliver_skips_empty_analysis() {
        let storage = MockStorage::default();
        let pipeline = pipeline(
            storage.clone(),
            MockStorage::default(),
            MockConfig::mock_mode(),
            None,
        );

        let portfolio = pipeline.ingest().await.unwrap();
        let empty = PortfolioAnalysis {
            raw_markdown: "   ".to_string(),
        };

        let outcome = pipeline.deliver(&portfolio, &empty).await.unwrap();
        assert_eq!(outcome, "skipped (no analysis)");
        assert!(storage.get_file("report.html").await.is_none());
    }
}
