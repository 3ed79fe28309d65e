use crate::domain::model::{MarketContext, PortfolioAnalysis, PortfolioSnapshot};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn mock(&self) -> bool;
    fn email_enabled(&self) -> bool;
    fn model(&self) -> &str;
    fn max_tokens(&self) -> usize;
    fn history_range(&self) -> &str;
    fn output_path(&self) -> &str;
    fn cache_path(&self) -> &str;
    fn robinhood_url(&self) -> &str;
    fn fidelity_url(&self) -> &str;
    fn market_data_url(&self) -> &str;
}

/// The four pipeline stages, run in order by the engine.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn ingest(&self) -> Result<PortfolioSnapshot>;
    async fn enrich(&self, portfolio: &PortfolioSnapshot) -> Result<MarketContext>;
    async fn summarize(
        &self,
        portfolio: &PortfolioSnapshot,
        market: &MarketContext,
    ) -> Result<PortfolioAnalysis>;
    async fn deliver(
        &self,
        portfolio: &PortfolioSnapshot,
        analysis: &PortfolioAnalysis,
    ) -> Result<String>;
}

/// Chat-style LLM backend (local inference runtime or a canned stand-in).
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
    fn model_name(&self) -> &str;
}

/// Outbound email. Sync because lettre's SMTP transport is sync; the
/// pipeline calls it from deliver() directly.
pub trait Mailer: Send + Sync {
    fn send_html(&self, subject: &str, html_body: &str) -> Result<String>;
}
