pub mod engine;
pub mod format;
pub mod ingest;
pub mod pipeline;
pub mod prompt;
pub mod report;

pub use crate::domain::model::{
    AssetType, Holding, MarketContext, PortfolioAnalysis, PortfolioSnapshot,
};
pub use crate::domain::ports::{ChatModel, ConfigProvider, Mailer, Pipeline, Storage};
pub use crate::utils::error::Result;
