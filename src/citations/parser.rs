use crate::llm::{strip_code_fences, LanguageModel};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Structured fields extracted from one citation string. All fields are
/// nullable; the fallback keeps at least a truncated title so the
/// verification pipeline always has something to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCitation {
    pub title: Option<String>,
    pub authors: Option<String>,
    pub journal: Option<String>,
    pub year: Option<u32>,
}

impl ParsedCitation {
    /// Fallback when the model times out or returns garbage: the citation
    /// text truncated to 100 characters stands in for the title.
    pub fn fallback(citation: &str) -> Self {
        Self {
            title: Some(citation.trim().chars().take(100).collect()),
            authors: None,
            journal: None,
            year: None,
        }
    }
}

const SYSTEM_PROMPT: &str = "You extract bibliographic fields from one citation string. \
Respond with ONLY a JSON object, no prose: \
{\"title\": string or null, \"authors\": string or null, \
\"journal\": string or null, \"year\": number or null}";

/// Parses a citation string with the language model, racing a timeout.
pub struct CitationParser {
    model: Arc<dyn LanguageModel>,
    parse_timeout: Duration,
}

impl CitationParser {
    pub fn new(model: Arc<dyn LanguageModel>, parse_timeout: Duration) -> Self {
        Self {
            model,
            parse_timeout,
        }
    }

    /// Never fails: timeout or parse failure degrades to the fallback
    pub async fn parse(&self, citation: &str) -> ParsedCitation {
        let call = self.model.complete(SYSTEM_PROMPT, citation);

        let raw = match timeout(self.parse_timeout, call).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!("Citation parse model call failed: {}", e);
                return ParsedCitation::fallback(citation);
            }
            Err(_) => {
                warn!(
                    "Citation parse timed out after {:?}, using fallback",
                    self.parse_timeout
                );
                return ParsedCitation::fallback(citation);
            }
        };

        match Self::from_model_json(&raw) {
            Some(parsed) => parsed,
            None => {
                warn!("Model returned unparseable citation fields, using fallback");
                ParsedCitation::fallback(citation)
            }
        }
    }

    /// Lenient extraction: the year may arrive as a number or a string
    fn from_model_json(raw: &str) -> Option<ParsedCitation> {
        let value: serde_json::Value = serde_json::from_str(strip_code_fences(raw)).ok()?;
        let obj = value.as_object()?;

        let field = |name: &str| {
            obj.get(name)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let year = obj.get("year").and_then(|v| {
            v.as_u64()
                .and_then(|y| u32::try_from(y).ok())
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        });

        let parsed = ParsedCitation {
            title: field("title"),
            authors: field("authors"),
            journal: field("journal"),
            year,
        };
        debug!("Parsed citation fields: {:?}", parsed);
        Some(parsed)
    }
}
