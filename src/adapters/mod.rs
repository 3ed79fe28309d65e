// Adapters layer: concrete clients for external systems (broker agents,
// price-data API, local inference runtime, SMTP, filesystem storage).

pub mod brokers;
pub mod market;
pub mod ollama;
pub mod smtp;
pub mod storage;
