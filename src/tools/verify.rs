use crate::citations::{extract_citations, Citation, VerificationEngine};
use crate::credits::{CreditAccount, CreditLedger};
use crate::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Input for the verification endpoint
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct VerifyInput {
    pub text: String,
}

/// Verification report for one request
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct VerifyReport {
    pub citations: Vec<Citation>,
    pub total_found: usize,
    pub verified: usize,
    /// Percentage of citations that verified, 0..=100
    pub verification_rate: u8,
}

/// Runs the verification flow: extract citations, then drive each one
/// through the verification engine sequentially, pausing between
/// citations to stay under upstream rate limits.
pub struct VerifyTool {
    engine: VerificationEngine,
    ledger: Arc<CreditLedger>,
    citation_delay: Duration,
}

impl VerifyTool {
    pub fn new(
        engine: VerificationEngine,
        ledger: Arc<CreditLedger>,
        citation_delay: Duration,
    ) -> Self {
        Self {
            engine,
            ledger,
            citation_delay,
        }
    }

    #[instrument(skip(self, account, input), fields(email = %account.email))]
    pub async fn run(&self, account: &CreditAccount, input: &VerifyInput) -> Result<VerifyReport> {
        CreditLedger::check_word_limit(account.plan, &input.text)?;
        self.ledger.consume(&account.email).await?;

        let raw_citations = extract_citations(&input.text);
        info!("Extracted {} citation(s)", raw_citations.len());

        let mut citations = Vec::with_capacity(raw_citations.len());
        for (index, raw) in raw_citations.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.citation_delay).await;
            }
            citations.push(self.engine.verify(raw).await);
        }

        let total_found = citations.len();
        let verified = citations.iter().filter(|c| c.verified).count();
        let verification_rate = rate(verified, total_found);

        info!(
            "Verification complete: {}/{} verified ({}%)",
            verified, total_found, verification_rate
        );

        Ok(VerifyReport {
            citations,
            total_found,
            verified,
            verification_rate,
        })
    }
}

/// `round(100 * verified / total)`, 0 when nothing was found
fn rate(verified: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let percentage = (100.0 * verified as f64 / total as f64).round() as u8;
    percentage
}
