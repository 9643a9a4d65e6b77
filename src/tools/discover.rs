use crate::client::{Source, SourceDb, SearchOrchestrator};
use crate::credits::{CreditAccount, CreditLedger};
use crate::intent::{IntentClassifier, SearchDomain, SearchStrategy};
use crate::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Input for the discovery endpoint
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DiscoverInput {
    pub text: String,
    /// 1..=5 selects one protocol step; omitted runs the legacy
    /// single-shot pipeline
    pub step: Option<u8>,
}

/// One completed protocol step
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct StepResponse {
    pub step: u8,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<SearchStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_found: Option<usize>,
}

/// Legacy single-shot pipeline response
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct LegacyResponse {
    pub success: bool,
    pub strategy: SearchStrategy,
    pub sources: Vec<Source>,
    pub total_found: usize,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum DiscoverResponse {
    Step(StepResponse),
    Legacy(LegacyResponse),
}

/// The stateless step-indexed controller for the discovery flow. Each
/// call is an independent computation keyed only on its inputs; there is
/// no session object linking steps, and every step re-derives the search
/// strategy from the text.
pub struct DiscoverTool {
    classifier: IntentClassifier,
    orchestrator: Arc<SearchOrchestrator>,
    ledger: Arc<CreditLedger>,
}

impl DiscoverTool {
    pub fn new(
        classifier: IntentClassifier,
        orchestrator: Arc<SearchOrchestrator>,
        ledger: Arc<CreditLedger>,
    ) -> Self {
        Self {
            classifier,
            orchestrator,
            ledger,
        }
    }

    /// Run one protocol step (or the legacy pipeline) for an
    /// authenticated account. The word-limit gate runs before anything
    /// that touches the network; only step 1 and the legacy path pay a
    /// credit.
    #[instrument(skip(self, account, input), fields(email = %account.email, step = ?input.step))]
    pub async fn run(
        &self,
        account: &CreditAccount,
        input: &DiscoverInput,
    ) -> Result<DiscoverResponse> {
        CreditLedger::check_word_limit(account.plan, &input.text)?;

        match input.step {
            None => self.run_legacy(account, &input.text).await.map(DiscoverResponse::Legacy),
            Some(step @ 1..=5) => self
                .run_step(account, &input.text, step)
                .await
                .map(DiscoverResponse::Step),
            Some(step) => Err(Error::InvalidInput {
                field: "step".to_string(),
                reason: format!("Step must be between 1 and 5, got {step}"),
            }),
        }
    }

    async fn run_legacy(&self, account: &CreditAccount, text: &str) -> Result<LegacyResponse> {
        self.ledger.consume(&account.email).await?;

        let result = self.legacy_pipeline(account, text).await;
        if result.is_err() {
            self.try_refund(&account.email).await;
        }
        result
    }

    async fn legacy_pipeline(
        &self,
        account: &CreditAccount,
        text: &str,
    ) -> Result<LegacyResponse> {
        let strategy = self.classifier.classify(text).await;
        let advanced = account.plan.limits().has_advanced_databases;
        let outcome = self.orchestrator.search(&strategy, advanced).await;

        Ok(LegacyResponse {
            success: true,
            total_found: outcome.sources.len(),
            sources: outcome.sources,
            strategy,
        })
    }

    async fn run_step(
        &self,
        account: &CreditAccount,
        text: &str,
        step: u8,
    ) -> Result<StepResponse> {
        if step == 1 {
            self.ledger.consume(&account.email).await?;
            let strategy = self.classifier.classify(text).await;
            return Ok(completed(step, Some(strategy), None));
        }

        // Steps past the paid one: on failure the step-1 credit is
        // refunded best-effort so a caller retry does not pay twice
        let result = self.later_step(account, text, step).await;
        if result.is_err() {
            self.try_refund(&account.email).await;
        }
        result
    }

    async fn later_step(
        &self,
        account: &CreditAccount,
        text: &str,
        step: u8,
    ) -> Result<StepResponse> {
        // Stateless protocol: recompute the same strategy this step
        let strategy = self.classifier.classify(text).await;
        let advanced = account.plan.limits().has_advanced_databases;

        let response = match step {
            2 => {
                let sources = self.query_one(SourceDb::Crossref, &strategy).await;
                completed(step, None, Some(sources))
            }
            3 => {
                let wanted = strategy.search_type == SearchDomain::Medical
                    || strategy.recommended_adapters.contains(&SourceDb::Pubmed);
                let sources = if wanted && advanced {
                    self.query_one(SourceDb::Pubmed, &strategy).await
                } else {
                    info!("Skipping biomedical index: wanted={}, advanced={}", wanted, advanced);
                    Vec::new()
                };
                completed(step, None, Some(sources))
            }
            4 => {
                let sources = self.query_one(SourceDb::SemanticScholar, &strategy).await;
                completed(step, None, Some(sources))
            }
            5 => {
                let outcome = self.orchestrator.search(&strategy, advanced).await;
                completed(step, Some(strategy), Some(outcome.sources))
            }
            _ => unreachable!("validated by run()"),
        };

        Ok(response)
    }

    /// One adapter, failures degraded to an empty list
    async fn query_one(&self, db: SourceDb, strategy: &SearchStrategy) -> Vec<Source> {
        let Some(adapter) = self.orchestrator.adapter(db) else {
            warn!("No adapter registered for {}", db);
            return Vec::new();
        };

        match adapter.search(&strategy.keywords).await {
            Ok(sources) => sources,
            Err(e) => {
                warn!("{} step query failed, degrading to empty list: {}", db, e);
                Vec::new()
            }
        }
    }

    async fn try_refund(&self, email: &str) {
        if let Err(e) = self.ledger.refund(email).await {
            warn!("Best-effort credit refund for {} failed: {}", email, e);
        }
    }
}

fn completed(step: u8, strategy: Option<SearchStrategy>, sources: Option<Vec<Source>>) -> StepResponse {
    StepResponse {
        step,
        status: "completed".to_string(),
        total_found: sources.as_ref().map(Vec::len),
        strategy,
        sources,
    }
}
