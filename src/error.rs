use std::time::Duration;
use thiserror::Error;

/// Error taxonomy for the discovery and verification pipeline
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (permanent failures)
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // I/O errors (potentially transient)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors (usually permanent)
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // Network errors (transient)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Timeout error: operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    // Contract violations surfaced to the caller
    #[error("Authentication required")]
    AuthRequired,

    #[error("Insufficient credits: {available} remaining")]
    InsufficientCredits { available: u32 },

    #[error("Word limit exceeded: {actual} characters, plan allows {limit}")]
    WordLimitExceeded { limit: usize, actual: usize },

    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    // Failures recovered locally with a safe default; reaching the caller
    // through one of these variants is itself a bug
    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("Language model error: {0}")]
    LanguageModel(String),

    // Account store / collaborator failures
    #[error("Account not found: {email}")]
    AccountNotFound { email: String },

    #[error("Account store error: {0}")]
    AccountStore(String),

    // General service error
    #[error("Service error: {0}")]
    Service(String),
}

/// Error categorization for retry strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Permanent errors - should not retry
    Permanent,
    /// Transient errors - safe to retry
    Transient,
    /// Caller-side contract violations - fix the request, don't retry
    Contract,
}

impl Error {
    /// Categorize error for retry logic
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::Serde(_) => ErrorCategory::Permanent,

            Error::AuthRequired
            | Error::InsufficientCredits { .. }
            | Error::WordLimitExceeded { .. }
            | Error::InvalidInput { .. } => ErrorCategory::Contract,

            Error::Http(_)
            | Error::Timeout { .. }
            | Error::Io(_)
            | Error::Adapter(_)
            | Error::LanguageModel(_)
            | Error::AccountStore(_)
            | Error::Service(_) => ErrorCategory::Transient,

            Error::AccountNotFound { .. } => ErrorCategory::Permanent,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// Adapter error conversion
impl From<crate::client::adapters::AdapterError> for Error {
    fn from(err: crate::client::adapters::AdapterError) -> Self {
        match err {
            crate::client::adapters::AdapterError::Timeout => Error::Timeout {
                timeout: Duration::from_secs(8),
            },
            other => Error::Adapter(other.to_string()),
        }
    }
}
