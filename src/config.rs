use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub adapters: AdaptersConfig,
    pub verification: VerificationConfig,
    pub auth: AuthConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 60,
        }
    }
}

/// Language model provider settings (OpenAI-compatible chat endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Read from REFSCOUT_LLM__API_KEY when not set in the file
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 15,
            max_tokens: 512,
        }
    }
}

/// Settings shared by the bibliographic database adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptersConfig {
    pub user_agent: String,
    /// Contact email sent to CrossRef/OpenAlex for polite-pool access
    pub contact_email: Option<String>,
    pub timeout_secs: u64,
    pub crossref_base_url: String,
    pub pubmed_base_url: String,
    pub semantic_scholar_base_url: String,
    pub arxiv_base_url: String,
    pub openalex_base_url: String,
}

impl Default for AdaptersConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("refscout/{} (Academic Source Discovery)", env!("CARGO_PKG_VERSION")),
            contact_email: None,
            timeout_secs: 8,
            crossref_base_url: "https://api.crossref.org".to_string(),
            pubmed_base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            semantic_scholar_base_url: "https://api.semanticscholar.org/graph/v1".to_string(),
            arxiv_base_url: "http://export.arxiv.org/api".to_string(),
            openalex_base_url: "https://api.openalex.org".to_string(),
        }
    }
}

impl AdaptersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Citation verification pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Timeout for the citation parse step
    pub parse_timeout_secs: u64,
    /// Timeout for the candidate search step
    pub search_timeout_secs: u64,
    /// Delay between consecutive citations, to stay under upstream rate limits
    pub citation_delay_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            parse_timeout_secs: 15,
            search_timeout_secs: 15,
            citation_delay_ms: 500,
        }
    }
}

/// Token-to-account wiring for the default static auth verifier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token -> account email
    pub tokens: HashMap<String, String>,
    /// Accounts seeded into the in-memory store at startup
    pub accounts: Vec<SeedAccount>,
}

/// One account seeded from configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAccount {
    pub email: String,
    pub plan: String,
    #[serde(default)]
    pub credits: Option<u32>,
}

impl Config {
    /// Load configuration: defaults, then optional TOML file, then
    /// REFSCOUT_* environment overrides (double underscore as separator)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("REFSCOUT")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Validate configuration invariants at startup
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::InvalidInput {
                field: "server.port".to_string(),
                reason: "port must be non-zero".to_string(),
            });
        }
        if self.adapters.timeout_secs == 0 {
            return Err(Error::InvalidInput {
                field: "adapters.timeout_secs".to_string(),
                reason: "adapter timeout must be non-zero".to_string(),
            });
        }
        if self.verification.parse_timeout_secs == 0 || self.verification.search_timeout_secs == 0 {
            return Err(Error::InvalidInput {
                field: "verification".to_string(),
                reason: "verification timeouts must be non-zero".to_string(),
            });
        }
        if self.llm.model.is_empty() {
            return Err(Error::InvalidInput {
                field: "llm.model".to_string(),
                reason: "model name cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}
