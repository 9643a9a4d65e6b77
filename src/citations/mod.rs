pub mod extractor;
pub mod parser;
pub mod similarity;
pub mod verifier;

pub use extractor::extract_citations;
pub use parser::{CitationParser, ParsedCitation};
pub use verifier::VerificationEngine;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Verdict for one citation string. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Citation {
    pub id: String,
    pub raw_text: String,
    pub verified: bool,
    /// All similarities are percentages in 0..=100
    pub title_similarity: u8,
    pub authors_similarity: u8,
    pub date_similarity: u8,
    pub best_match: Option<BestMatch>,
}

/// The candidate publication a citation was scored against
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BestMatch {
    pub title: String,
    pub authors: String,
    pub date: Option<u32>,
    pub link: Option<String>,
}
