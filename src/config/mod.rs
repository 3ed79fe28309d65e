pub mod env;

use clap::Parser;

use crate::config::env::AgentEndpoints;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_history_range, validate_non_empty_string, validate_path, validate_positive_number,
    validate_url, Validate,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "portfolio-report")]
#[command(about = "Pulls brokerage holdings, enriches them with market data, and emails an LLM-written HTML report")]
pub struct CliConfig {
    /// Use built-in mock data instead of live broker/market/LLM services
    #[arg(long)]
    pub mock: bool,

    /// Skip email delivery (the report is still saved to the output dir)
    #[arg(long)]
    pub no_email: bool,

    #[arg(long, default_value = "qwen2.5:14b-instruct")]
    pub model: String,

    #[arg(long, default_value = "4096")]
    pub max_tokens: usize,

    /// Price-history window requested from the market-data API
    #[arg(long, default_value = "1y")]
    pub history_range: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, default_value = ".cache")]
    pub cache_path: String,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Log CPU/memory stats after each pipeline stage
    #[arg(long)]
    pub monitor: bool,

    /// Populated from the environment after parsing (live runs only).
    #[arg(skip)]
    pub endpoints: AgentEndpoints,
}

impl ConfigProvider for CliConfig {
    fn mock(&self) -> bool {
        self.mock
    }

    // Mock runs never touch SMTP, whatever --no-email says.
    fn email_enabled(&self) -> bool {
        !self.no_email && !self.mock
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    fn history_range(&self) -> &str {
        &self.history_range
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn cache_path(&self) -> &str {
        &self.cache_path
    }

    fn robinhood_url(&self) -> &str {
        &self.endpoints.robinhood_url
    }

    fn fidelity_url(&self) -> &str {
        &self.endpoints.fidelity_url
    }

    fn market_data_url(&self) -> &str {
        &self.endpoints.market_data_url
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("model", &self.model)?;
        validate_positive_number("max_tokens", self.max_tokens, 1)?;
        validate_history_range("history_range", &self.history_range)?;
        validate_path("output_path", &self.output_path)?;
        validate_path("cache_path", &self.cache_path)?;

        // Service URLs only matter for live runs.
        if !self.mock {
            validate_url("ROBINHOOD_AGENT_URL", &self.endpoints.robinhood_url)?;
            validate_url("FIDELITY_AGENT_URL", &self.endpoints.fidelity_url)?;
            validate_url("MARKET_DATA_URL", &self.endpoints.market_data_url)?;
            validate_url("OLLAMA_BASE_URL", &self.endpoints.ollama_url)?;
        }

        Ok(())
    }
}
