use crate::config::AuthConfig;
use crate::credits::{CreditAccount, PlanTier};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Port to the authentication collaborator: token in, account email out
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Option<String>>;
}

/// Port to the user-account collaborator. The ledger reads the whole
/// account but only ever mutates `credits` and `credits_reset_date`.
///
/// `debit_credit` and `refund_credit` are single serialized operations on
/// the balance (decrement-if-positive / increment); implementations must
/// not expose a read-then-write window between check and mutation.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_by_email(&self, email: &str) -> Result<Option<CreditAccount>>;

    async fn update_by_email(
        &self,
        email: &str,
        credits: u32,
        credits_reset_date: DateTime<Utc>,
    ) -> Result<()>;

    /// Atomically decrement one credit if any remain; returns the new
    /// balance or `InsufficientCredits` without mutating
    async fn debit_credit(&self, email: &str) -> Result<u32>;

    /// Atomically add one credit back; returns the new balance
    async fn refund_credit(&self, email: &str) -> Result<u32>;
}

/// Config-driven bearer-token verifier: a fixed token -> email table.
/// Stands in for the external token service in deployments and tests.
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl AuthVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Option<String>> {
        Ok(self.tokens.get(token).cloned())
    }
}

/// Account store backed by one mutex-guarded map. The mutex is what makes
/// debit and refund single serialized operations.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<HashMap<String, CreditAccount>>,
}

impl InMemoryAccountStore {
    pub async fn insert(&self, account: CreditAccount) {
        self.accounts
            .lock()
            .await
            .insert(account.email.clone(), account);
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get_by_email(&self, email: &str) -> Result<Option<CreditAccount>> {
        Ok(self.accounts.lock().await.get(email).cloned())
    }

    async fn update_by_email(
        &self,
        email: &str,
        credits: u32,
        credits_reset_date: DateTime<Utc>,
    ) -> Result<()> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(email)
            .ok_or_else(|| Error::AccountNotFound {
                email: email.to_string(),
            })?;
        account.credits = credits;
        account.credits_reset_date = credits_reset_date;
        Ok(())
    }

    async fn debit_credit(&self, email: &str) -> Result<u32> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(email)
            .ok_or_else(|| Error::AccountNotFound {
                email: email.to_string(),
            })?;

        if account.credits == 0 {
            return Err(Error::InsufficientCredits { available: 0 });
        }
        account.credits -= 1;
        Ok(account.credits)
    }

    async fn refund_credit(&self, email: &str) -> Result<u32> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(email)
            .ok_or_else(|| Error::AccountNotFound {
                email: email.to_string(),
            })?;
        account.credits += 1;
        Ok(account.credits)
    }
}

/// Build the default auth wiring from configuration: a static token
/// verifier plus an in-memory store seeded with the configured accounts
pub async fn bootstrap(
    config: &AuthConfig,
) -> (Arc<dyn AuthVerifier>, Arc<InMemoryAccountStore>) {
    let store = Arc::new(InMemoryAccountStore::default());

    for seed in &config.accounts {
        let plan = match PlanTier::from_str(&seed.plan) {
            Ok(plan) => plan,
            Err(_) => {
                warn!("Skipping seed account {} with unknown plan '{}'", seed.email, seed.plan);
                continue;
            }
        };
        let limits = plan.limits();
        store
            .insert(CreditAccount {
                email: seed.email.clone(),
                plan,
                credits: seed.credits.unwrap_or(limits.max_credits),
                credits_reset_date: crate::credits::next_reset(limits.reset_period, Utc::now()),
            })
            .await;
    }

    info!(
        "Seeded {} accounts, {} tokens",
        config.accounts.len(),
        config.tokens.len()
    );

    let verifier: Arc<dyn AuthVerifier> = Arc::new(StaticTokenVerifier::new(config.tokens.clone()));
    (verifier, store)
}
