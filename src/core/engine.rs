use crate::core::format::thousands;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Runs the four pipeline stages in order:
/// ingest → enrich → summarize → deliver.
pub struct ReportEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Ingesting portfolio...");
        let portfolio = self.pipeline.ingest().await?;
        tracing::info!(
            "Portfolio: {} positions | Total value: ${}",
            portfolio.holdings.len(),
            thousands(portfolio.total_value, 0)
        );
        tracing::info!("Equity: {}", portfolio.equity_tickers().join(", "));
        for warning in &portfolio.data_warnings {
            tracing::warn!("{}", warning);
        }
        self.monitor.log_stats("Ingest");

        tracing::info!("Enriching with market data...");
        let market = self.pipeline.enrich(&portfolio).await?;
        tracing::info!(
            "Technicals for {} tickers, fundamentals for {}, news for {}",
            market.technicals.len(),
            market.fundamentals.len(),
            market.news.len()
        );
        self.monitor.log_stats("Enrich");

        tracing::info!("Running LLM analysis...");
        let analysis = self.pipeline.summarize(&portfolio, &market).await?;
        self.monitor.log_stats("Summarize");

        tracing::info!("Building and delivering report...");
        let outcome = self.pipeline.deliver(&portfolio, &analysis).await?;
        self.monitor.log_stats("Deliver");

        self.monitor.log_final_stats();
        Ok(outcome)
    }
}
