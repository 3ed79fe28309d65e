use std::env;

use crate::utils::error::{ReportError, Result};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Base URLs of the external services a live run talks to. The agent
/// services manage their own credentials; only their addresses live here.
#[derive(Debug, Clone)]
pub struct AgentEndpoints {
    pub robinhood_url: String,
    pub fidelity_url: String,
    pub market_data_url: String,
    pub ollama_url: String,
}

impl AgentEndpoints {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            robinhood_url: required("ROBINHOOD_AGENT_URL")?,
            fidelity_url: required("FIDELITY_AGENT_URL")?,
            market_data_url: required("MARKET_DATA_URL")?,
            ollama_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string()),
        })
    }
}

impl Default for AgentEndpoints {
    fn default() -> Self {
        Self {
            robinhood_url: String::new(),
            fidelity_url: String::new(),
            market_data_url: String::new(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub from: String,
    pub recipient: String,
    pub username: String,
    pub password: String,
}

impl EmailSettings {
    pub fn from_env() -> Result<Self> {
        let port_raw = env::var("EMAIL_SMTP_PORT").unwrap_or_else(|_| "587".to_string());
        let smtp_port = port_raw
            .parse()
            .map_err(|_| ReportError::InvalidConfigValueError {
                field: "EMAIL_SMTP_PORT".to_string(),
                value: port_raw.clone(),
                reason: "not a valid port number".to_string(),
            })?;

        Ok(Self {
            smtp_server: env::var("EMAIL_SMTP_SERVER")
                .unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            smtp_port,
            from: required("EMAIL_FROM")?,
            recipient: required("REPORT_RECIPIENT")?,
            username: required("EMAIL_SEND_USERNAME")?,
            password: required("EMAIL_SEND_PASSWORD")?,
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| ReportError::MissingConfigError {
        field: name.to_string(),
    })
}
