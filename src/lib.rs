pub mod accounts;
pub mod citations;
pub mod client;
pub mod config;
pub mod credits;
pub mod error;
pub mod intent;
pub mod llm;
pub mod server;
pub mod tools;

pub use accounts::{AccountStore, AuthVerifier, InMemoryAccountStore, StaticTokenVerifier};
pub use citations::{Citation, CitationParser, VerificationEngine};
pub use client::{SearchOrchestrator, Source, SourceDb};
pub use config::Config;
pub use credits::{CreditAccount, CreditLedger, PlanTier};
pub use error::{Error, Result};
pub use intent::{IntentClassifier, SearchDomain, SearchStrategy};
pub use llm::LanguageModel;
pub use server::AppState;
pub use tools::{DiscoverTool, VerifyTool};
