#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use refscout::client::adapters::{AdapterError, DatabaseAdapter};
use refscout::credits::{CreditAccount, CreditLedger, PlanTier};
use refscout::llm::LanguageModel;
use refscout::{Error, InMemoryAccountStore, Result, Source, SourceDb};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Test double for one bibliographic database
pub struct StubAdapter {
    pub db: SourceDb,
    pub results: Vec<Source>,
    pub fail: bool,
    pub calls: Arc<AtomicUsize>,
}

impl StubAdapter {
    pub fn returning(db: SourceDb, results: Vec<Source>) -> Self {
        Self {
            db,
            results,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(db: SourceDb) -> Self {
        Self {
            db,
            results: Vec::new(),
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseAdapter for StubAdapter {
    fn db(&self) -> SourceDb {
        self.db
    }

    fn max_results(&self) -> usize {
        5
    }

    async fn search(&self, _keywords: &[String]) -> std::result::Result<Vec<Source>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(AdapterError::ServiceUnavailable("stubbed outage".to_string()))
        } else {
            Ok(self.results.clone())
        }
    }
}

/// Language model double returning a fixed response
pub struct ScriptedModel(pub String);

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Language model double that always fails, forcing heuristic fallbacks
pub struct OfflineModel;

#[async_trait]
impl LanguageModel for OfflineModel {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        Err(Error::LanguageModel("model offline".to_string()))
    }
}

pub fn make_source(db: SourceDb, title: &str, doi: Option<&str>) -> Source {
    Source {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        authors: "Smith, J.".to_string(),
        year: Some(2020),
        journal: Some("Journal".to_string()),
        doi: doi.map(String::from),
        origin_adapter: db,
        verified: false,
    }
}

pub fn make_account(email: &str, plan: PlanTier, credits: u32) -> CreditAccount {
    CreditAccount {
        email: email.to_string(),
        plan,
        credits,
        credits_reset_date: Utc::now() + ChronoDuration::days(1),
    }
}

/// A ledger over a store seeded with one account
pub async fn seeded_ledger(
    account: CreditAccount,
) -> (Arc<CreditLedger>, Arc<InMemoryAccountStore>) {
    let store = Arc::new(InMemoryAccountStore::default());
    store.insert(account).await;
    (Arc::new(CreditLedger::new(store.clone())), store)
}
