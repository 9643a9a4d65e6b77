use crate::client::{Source, SourceDb};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur inside a database adapter. These never cross the
/// orchestrator boundary: a failing adapter degrades to an empty result list.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Adapter error: {0}")]
    Other(String),
}

impl AdapterError {
    /// Map a reqwest failure onto the adapter taxonomy
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Network(format!("Connection failed: {err}"))
        } else {
            AdapterError::Network(format!("Request failed: {err}"))
        }
    }

    /// Map an HTTP status onto the adapter taxonomy
    pub fn from_status(status: reqwest::StatusCode, service: &str) -> Self {
        match status.as_u16() {
            429 => AdapterError::RateLimit,
            503 => AdapterError::ServiceUnavailable(format!("{service} temporarily unavailable")),
            code => AdapterError::Network(format!("{service} returned HTTP {code}")),
        }
    }
}

/// One external bibliographic database, normalized to the common
/// [`Source`] shape. Each adapter owns its result cap and HTTP timeout.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Which upstream database this adapter wraps
    fn db(&self) -> SourceDb;

    /// Upper bound on records returned per search
    fn max_results(&self) -> usize;

    /// Search the upstream database for the given keywords
    async fn search(&self, keywords: &[String]) -> Result<Vec<Source>, AdapterError>;

    /// Best single candidate for a free-text query, used by the
    /// verification engine. Default: first search hit.
    async fn best_match(&self, query: &str) -> Result<Option<Source>, AdapterError> {
        let keywords: Vec<String> = query.split_whitespace().map(String::from).collect();
        let results = self.search(&keywords).await?;
        Ok(results.into_iter().next())
    }

    /// Reachability probe for the health endpoint
    async fn health_check(&self) -> bool {
        let probe = vec!["science".to_string()];
        match self.search(&probe).await {
            Ok(_) => true,
            // Rate limiting means the service is up
            Err(AdapterError::RateLimit) => true,
            Err(_) => false,
        }
    }
}
