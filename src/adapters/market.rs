//! Price-data API client: batched daily OHLCV history, per-ticker
//! fundamental info objects, and recent news headlines.

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::services::sentiment::Article;
use crate::utils::error::Result;

const NEWS_MAX_PER_TICKER: usize = 8;
const NEWS_MAX_AGE_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct NewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

pub struct MarketDataClient {
    client: Client,
    base_url: String,
}

impl MarketDataClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Batch-download daily history for all tickers in one request.
    /// Tickers missing from the response (cash symbols, delisted) are
    /// simply absent from the map.
    pub async fn fetch_price_history(
        &self,
        tickers: &[String],
        range: &str,
    ) -> Result<HashMap<String, Vec<Candle>>> {
        if tickers.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/history", self.base_url);
        tracing::debug!("History request for {} tickers ({})", tickers.len(), range);

        let response = self
            .client
            .get(&url)
            .query(&[("symbols", tickers.join(",")), ("range", range.to_string())])
            .send()
            .await?
            .error_for_status()?;

        let mut history: HashMap<String, Vec<Candle>> = response.json().await?;
        history.retain(|_, candles| !candles.is_empty());
        Ok(history)
    }

    /// Per-ticker flat info objects for fundamentals. Near-empty objects
    /// (cash symbols come back with a couple of fields) are dropped.
    pub async fn fetch_info(
        &self,
        tickers: &[String],
    ) -> Result<HashMap<String, HashMap<String, Value>>> {
        if tickers.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/info", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("symbols", tickers.join(","))])
            .send()
            .await?
            .error_for_status()?;

        let mut raw: HashMap<String, HashMap<String, Value>> = response.json().await?;
        raw.retain(|ticker, info| {
            if info.len() <= 5 {
                tracing::debug!("{}: info object near-empty, skipping", ticker);
                return false;
            }
            true
        });
        Ok(raw)
    }

    /// Recent headlines per ticker. There is no batch endpoint, so this
    /// fetches per ticker; a failed ticker is logged and skipped.
    pub async fn fetch_news(&self, tickers: &[String]) -> HashMap<String, Vec<Article>> {
        let now = Utc::now();
        let mut result = HashMap::new();

        for ticker in tickers {
            match self.fetch_ticker_news(ticker, now).await {
                Ok(articles) if !articles.is_empty() => {
                    result.insert(ticker.clone(), articles);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("{}: news fetch failed — {}", ticker, e);
                }
            }
        }

        result
    }

    async fn fetch_ticker_news(&self, ticker: &str, now: DateTime<Utc>) -> Result<Vec<Article>> {
        let url = format!("{}/news", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", ticker)])
            .send()
            .await?
            .error_for_status()?;

        let items: Vec<NewsItem> = response.json().await?;

        let mut articles = Vec::new();
        for item in items {
            let title = item.title.trim().to_string();
            if title.is_empty() {
                continue;
            }

            let age_hours = match parse_published_at(item.published_at.as_deref()) {
                Some(published) => (now - published).num_seconds() as f64 / 3600.0,
                None => continue,
            };
            if age_hours > NEWS_MAX_AGE_DAYS as f64 * 24.0 {
                continue;
            }

            articles.push(Article {
                title,
                publisher: item.publisher.unwrap_or_else(|| "Unknown".to_string()),
                age_hours: (age_hours * 10.0).round() / 10.0,
                url: item.url.unwrap_or_default(),
            });

            if articles.len() >= NEWS_MAX_PER_TICKER {
                break;
            }
        }

        Ok(articles)
    }
}

/// Collapse candle history to the close series the indicator math needs.
pub fn closes(history: &HashMap<String, Vec<Candle>>) -> HashMap<String, Vec<f64>> {
    history
        .iter()
        .map(|(ticker, candles)| {
            (
                ticker.clone(),
                candles.iter().map(|c| c.close).collect::<Vec<f64>>(),
            )
        })
        .collect()
}

fn parse_published_at(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
