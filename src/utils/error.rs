use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("SMTP delivery failed: {0}")]
    SmtpError(#[from] lettre::transport::smtp::Error),

    #[error("Invalid email address: {0}")]
    AddressError(#[from] lettre::address::AddressError),

    #[error("Email assembly failed: {0}")]
    EmailError(#[from] lettre::error::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Portfolio ingestion failed: {message}")]
    IngestError { message: String },

    #[error("LLM analysis failed: {message}")]
    LlmError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Io,
    Config,
    Data,
    Llm,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReportError::ApiError(_) => ErrorCategory::Network,
            ReportError::IoError(_) => ErrorCategory::Io,
            ReportError::SerializationError(_) => ErrorCategory::Data,
            ReportError::SmtpError(_)
            | ReportError::AddressError(_)
            | ReportError::EmailError(_) => ErrorCategory::Email,
            ReportError::ConfigError { .. }
            | ReportError::MissingConfigError { .. }
            | ReportError::InvalidConfigValueError { .. } => ErrorCategory::Config,
            ReportError::IngestError { .. } | ReportError::ProcessingError { .. } => {
                ErrorCategory::Data
            }
            ReportError::LlmError { .. } => ErrorCategory::Llm,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Config => ErrorSeverity::Critical,
            ErrorCategory::Network | ErrorCategory::Email => ErrorSeverity::Medium,
            ErrorCategory::Io | ErrorCategory::Data | ErrorCategory::Llm => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ReportError::ApiError(_) => {
                "Check that the agent/API services are running and the *_URL variables point at them.".to_string()
            }
            ReportError::IoError(_) => {
                "Check filesystem permissions for the output and cache directories.".to_string()
            }
            ReportError::SerializationError(_) => {
                "An upstream service returned an unexpected payload. Re-run, or inspect the service logs.".to_string()
            }
            ReportError::SmtpError(_) | ReportError::EmailError(_) => {
                "Verify the EMAIL_* settings, or re-run with --no-email to skip delivery.".to_string()
            }
            ReportError::AddressError(_) => {
                "Check REPORT_RECIPIENT and EMAIL_FROM are valid email addresses.".to_string()
            }
            ReportError::ConfigError { .. }
            | ReportError::MissingConfigError { .. }
            | ReportError::InvalidConfigValueError { .. } => {
                "Fix the configuration (CLI flags / .env) and re-run.".to_string()
            }
            ReportError::IngestError { .. } => {
                "Check the broker agent logs, or use --mock for an offline run.".to_string()
            }
            ReportError::LlmError { .. } => {
                "Check that the inference runtime is up (OLLAMA_BASE_URL) and the model is pulled.".to_string()
            }
            ReportError::ProcessingError { .. } => {
                "Re-run with --verbose and inspect the stage logs.".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("A remote service could not be reached: {}", self),
            ErrorCategory::Config => format!("Configuration problem: {}", self),
            ErrorCategory::Email => format!("The report was built but could not be emailed: {}", self),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
