use crate::accounts::AccountStore;
use crate::{Error, Result};
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Plan tiers governing credit allotment and adapter access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for PlanTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "weekly" => Ok(PlanTier::Weekly),
            "monthly" => Ok(PlanTier::Monthly),
            "yearly" => Ok(PlanTier::Yearly),
            other => Err(Error::InvalidInput {
                field: "plan".to_string(),
                reason: format!("Unknown plan tier: {other}"),
            }),
        }
    }
}

/// How often a plan's credit balance refills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Quota and feature bundle for one plan tier
#[derive(Debug, Clone, Copy)]
pub struct PlanLimits {
    pub max_credits: u32,
    pub reset_period: ResetPeriod,
    /// Maximum input length in characters
    pub word_limit: usize,
    pub has_advanced_databases: bool,
    pub has_chat_access: bool,
}

impl PlanTier {
    /// The fixed entitlement table
    pub fn limits(self) -> PlanLimits {
        match self {
            PlanTier::Free => PlanLimits {
                max_credits: 3,
                reset_period: ResetPeriod::Daily,
                word_limit: 300,
                has_advanced_databases: false,
                has_chat_access: false,
            },
            PlanTier::Weekly => PlanLimits {
                max_credits: 35,
                reset_period: ResetPeriod::Weekly,
                word_limit: 1000,
                has_advanced_databases: true,
                has_chat_access: true,
            },
            PlanTier::Monthly => PlanLimits {
                max_credits: 150,
                reset_period: ResetPeriod::Monthly,
                word_limit: 1000,
                has_advanced_databases: true,
                has_chat_access: true,
            },
            PlanTier::Yearly => PlanLimits {
                max_credits: 3000,
                reset_period: ResetPeriod::Yearly,
                word_limit: 1000,
                has_advanced_databases: true,
                has_chat_access: true,
            },
        }
    }
}

/// The two quota fields the ledger owns on a user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAccount {
    pub email: String,
    pub plan: PlanTier,
    pub credits: u32,
    pub credits_reset_date: DateTime<Utc>,
}

/// Next reset boundary strictly after `now`: midnight for daily, Monday
/// midnight for weekly, the 1st of next month, or January 1 of next year
pub fn next_reset(period: ResetPeriod, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let boundary: NaiveDate = match period {
        ResetPeriod::Daily => today + ChronoDuration::days(1),
        ResetPeriod::Weekly => {
            let days_ahead = 7 - i64::from(today.weekday().num_days_from_monday());
            today + ChronoDuration::days(days_ahead)
        }
        ResetPeriod::Monthly => {
            if today.month() == 12 {
                NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
            }
            .unwrap_or(today + ChronoDuration::days(31))
        }
        ResetPeriod::Yearly => NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
            .unwrap_or(today + ChronoDuration::days(365)),
    };

    Utc.from_utc_datetime(&boundary.and_hms_opt(0, 0, 0).expect("midnight exists"))
}

/// Lazily refill an expired window in place. Yearly plans never
/// auto-reset. Returns whether the account changed. The reset only moves
/// the window forward, never backward.
pub fn check_and_reset(account: &mut CreditAccount, now: DateTime<Utc>) -> bool {
    let limits = account.plan.limits();
    if limits.reset_period == ResetPeriod::Yearly {
        return false;
    }
    if account.credits_reset_date > now {
        return false;
    }

    account.credits = limits.max_credits;
    account.credits_reset_date = next_reset(limits.reset_period, now);
    debug!(
        "Reset credits for {} to {}, next window at {}",
        account.email, account.credits, account.credits_reset_date
    );
    true
}

/// Per-account quota gate. Mutations go through the account store's
/// serialized counter operations, never a read-then-write on the balance.
pub struct CreditLedger {
    store: Arc<dyn AccountStore>,
}

impl CreditLedger {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Load the account and apply the lazy reset, persisting it if the
    /// window had expired
    pub async fn prepare(&self, email: &str) -> Result<CreditAccount> {
        let mut account = self
            .store
            .get_by_email(email)
            .await?
            .ok_or_else(|| Error::AccountNotFound {
                email: email.to_string(),
            })?;

        if check_and_reset(&mut account, Utc::now()) {
            self.store
                .update_by_email(email, account.credits, account.credits_reset_date)
                .await?;
        }

        Ok(account)
    }

    /// Re-run the reset check, then atomically decrement one credit.
    /// Fails with `InsufficientCredits` on an empty balance, with no
    /// side effects.
    pub async fn consume(&self, email: &str) -> Result<u32> {
        self.prepare(email).await?;
        let remaining = self.store.debit_credit(email).await?;
        info!("Consumed one credit for {}, {} remaining", email, remaining);
        Ok(remaining)
    }

    /// Best-effort +1 after a downstream failure. Goes through the same
    /// serialized counter as `consume`.
    pub async fn refund(&self, email: &str) -> Result<u32> {
        let balance = self.store.refund_credit(email).await?;
        info!("Refunded one credit to {}, balance {}", email, balance);
        Ok(balance)
    }

    /// Reject input longer than the plan's character limit. Runs before
    /// any external call.
    pub fn check_word_limit(plan: PlanTier, text: &str) -> Result<()> {
        let limit = plan.limits().word_limit;
        let actual = text.chars().count();
        if actual > limit {
            return Err(Error::WordLimitExceeded { limit, actual });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::InMemoryAccountStore;
    use chrono::TimeZone;

    fn account(plan: PlanTier, credits: u32, reset: DateTime<Utc>) -> CreditAccount {
        CreditAccount {
            email: "user@example.com".to_string(),
            plan,
            credits,
            credits_reset_date: reset,
        }
    }

    #[test]
    fn plan_table() {
        let free = PlanTier::Free.limits();
        assert_eq!(free.max_credits, 3);
        assert_eq!(free.word_limit, 300);
        assert!(!free.has_advanced_databases);
        assert!(!free.has_chat_access);

        assert_eq!(PlanTier::Weekly.limits().max_credits, 35);
        assert_eq!(PlanTier::Monthly.limits().max_credits, 150);

        let yearly = PlanTier::Yearly.limits();
        assert_eq!(yearly.max_credits, 3000);
        assert_eq!(yearly.word_limit, 1000);
        assert!(yearly.has_advanced_databases);
    }

    #[test]
    fn daily_reset_moves_to_next_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap();
        let past = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let mut acct = account(PlanTier::Free, 0, past);

        assert!(check_and_reset(&mut acct, now));
        assert_eq!(acct.credits, 3);
        assert_eq!(
            acct.credits_reset_date,
            Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap()
        );
        assert!(acct.credits_reset_date > now);
    }

    #[test]
    fn future_window_is_untouched() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap();
        let future = Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap();
        let mut acct = account(PlanTier::Free, 1, future);

        assert!(!check_and_reset(&mut acct, now));
        assert_eq!(acct.credits, 1);
    }

    #[test]
    fn weekly_reset_lands_on_monday() {
        // 2024-03-15 is a Friday
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let next = next_reset(ResetPeriod::Weekly, now);
        assert_eq!(
            next,
            Utc.with_ymd_and_hms(2024, 3, 18, 0, 0, 0).unwrap()
        );
        assert_eq!(next.weekday(), chrono::Weekday::Mon);
    }

    #[test]
    fn weekly_reset_from_monday_is_next_monday() {
        let monday = Utc.with_ymd_and_hms(2024, 3, 18, 9, 0, 0).unwrap();
        let next = next_reset(ResetPeriod::Weekly, monday);
        assert_eq!(
            next,
            Utc.with_ymd_and_hms(2024, 3, 25, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn monthly_reset_rolls_the_year() {
        let december = Utc.with_ymd_and_hms(2024, 12, 20, 9, 0, 0).unwrap();
        assert_eq!(
            next_reset(ResetPeriod::Monthly, december),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn yearly_plan_never_auto_resets() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let long_past = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut acct = account(PlanTier::Yearly, 0, long_past);

        assert!(!check_and_reset(&mut acct, now));
        assert_eq!(acct.credits, 0);
    }

    #[test]
    fn word_limit_boundaries() {
        let at_limit = "x".repeat(300);
        assert!(CreditLedger::check_word_limit(PlanTier::Free, &at_limit).is_ok());

        let over = "x".repeat(301);
        assert!(matches!(
            CreditLedger::check_word_limit(PlanTier::Free, &over),
            Err(Error::WordLimitExceeded { limit: 300, actual: 301 })
        ));

        assert!(CreditLedger::check_word_limit(PlanTier::Monthly, &over).is_ok());
    }

    #[tokio::test]
    async fn consume_decrements_exactly_one() {
        let store = Arc::new(InMemoryAccountStore::default());
        store
            .insert(account(
                PlanTier::Monthly,
                2,
                Utc::now() + ChronoDuration::days(10),
            ))
            .await;
        let ledger = CreditLedger::new(store);

        assert_eq!(ledger.consume("user@example.com").await.unwrap(), 1);
        assert_eq!(ledger.consume("user@example.com").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn consume_on_empty_balance_fails_without_side_effects() {
        let store = Arc::new(InMemoryAccountStore::default());
        store
            .insert(account(
                PlanTier::Monthly,
                0,
                Utc::now() + ChronoDuration::days(10),
            ))
            .await;
        let ledger = CreditLedger::new(store.clone());

        assert!(matches!(
            ledger.consume("user@example.com").await,
            Err(Error::InsufficientCredits { .. })
        ));

        let account = store.get_by_email("user@example.com").await.unwrap().unwrap();
        assert_eq!(account.credits, 0);
    }

    #[tokio::test]
    async fn expired_window_refills_before_consume() {
        let store = Arc::new(InMemoryAccountStore::default());
        store
            .insert(account(
                PlanTier::Free,
                0,
                Utc::now() - ChronoDuration::days(1),
            ))
            .await;
        let ledger = CreditLedger::new(store);

        // The lazy reset refills to 3, then consume takes one
        assert_eq!(ledger.consume("user@example.com").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn refund_restores_one_credit() {
        let store = Arc::new(InMemoryAccountStore::default());
        store
            .insert(account(
                PlanTier::Monthly,
                5,
                Utc::now() + ChronoDuration::days(10),
            ))
            .await;
        let ledger = CreditLedger::new(store);

        ledger.consume("user@example.com").await.unwrap();
        assert_eq!(ledger.refund("user@example.com").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn unknown_account_is_reported() {
        let ledger = CreditLedger::new(Arc::new(InMemoryAccountStore::default()));
        assert!(matches!(
            ledger.consume("ghost@example.com").await,
            Err(Error::AccountNotFound { .. })
        ));
    }
}
