//! Broker agent clients. The agent services own credentials and browser
//! sessions; this side only ever does a holdings request against their
//! HTTP surface.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::utils::error::Result;

/// Robinhood agent. `GET /holdings` mirrors robin_stocks build_holdings():
/// a map keyed by ticker whose numeric fields arrive as strings.
pub struct RobinhoodClient {
    client: Client,
    base_url: String,
}

impl RobinhoodClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn get_holdings(&self) -> Result<HashMap<String, Value>> {
        let url = format!("{}/holdings", self.base_url);
        tracing::debug!("Robinhood agent request: {}", url);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let raw: HashMap<String, Value> = response.json().await?;
        Ok(raw)
    }
}

/// One row of the Fidelity agent's holdings payload. Numeric fields are
/// already floats (parsed by the agent's scraper).
#[derive(Debug, Clone, Deserialize)]
pub struct FidelityRow {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub shares: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub market_value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FidelityResponse {
    #[serde(default)]
    pub holdings: Vec<FidelityRow>,
    #[serde(default)]
    pub error: Option<Value>,
}

pub struct FidelityClient {
    client: Client,
    base_url: String,
}

impl FidelityClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn get_holdings(&self) -> Result<FidelityResponse> {
        let url = format!("{}/holdings", self.base_url);
        tracing::debug!("Fidelity agent request: {}", url);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let raw: FidelityResponse = response.json().await?;
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_robinhood_holdings_keeps_string_numerics() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/holdings");
            then.status(200).json_body(serde_json::json!({
                "SNOW": {"price": "148.50", "quantity": "25", "equity": "3712.50",
                         "type": "stock", "name": "Snowflake Inc"}
            }));
        });

        let client = RobinhoodClient::new(Client::new(), &server.url(""));
        let raw = client.get_holdings().await.unwrap();

        mock.assert();
        assert_eq!(raw["SNOW"]["quantity"], "25");
    }

    #[tokio::test]
    async fn test_fidelity_error_payload() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/holdings");
            then.status(200)
                .json_body(serde_json::json!({"holdings": [], "error": "session expired"}));
        });

        let client = FidelityClient::new(Client::new(), &server.url(""));
        let response = client.get_holdings().await.unwrap();

        assert!(response.holdings.is_empty());
        assert_eq!(response.error, Some(serde_json::json!("session expired")));
    }

    #[tokio::test]
    async fn test_http_failure_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/holdings");
            then.status(500);
        });

        let client = RobinhoodClient::new(Client::new(), &server.url(""));
        assert!(client.get_holdings().await.is_err());
    }
}
