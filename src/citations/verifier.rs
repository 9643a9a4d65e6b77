use crate::citations::parser::{CitationParser, ParsedCitation};
use crate::citations::similarity::{date_similarity, text_similarity};
use crate::citations::{BestMatch, Citation};
use crate::client::adapters::DatabaseAdapter;
use crate::client::Source;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Verdict rule: a citation counts as verified when the title overlap
/// exceeds 30 or the author overlap exceeds 50. Intentionally lenient; a
/// partial author match alone is enough.
const TITLE_THRESHOLD: u8 = 30;
const AUTHORS_THRESHOLD: u8 = 50;

/// Drives one citation through parse, candidate search, scoring and
/// verdict. Every path terminates in a [`Citation`]; failures produce an
/// unverified, zero-similarity verdict rather than an error.
pub struct VerificationEngine {
    parser: CitationParser,
    doi_registry: Arc<dyn DatabaseAdapter>,
    citation_graph: Arc<dyn DatabaseAdapter>,
    /// Outer bound on the whole candidate-search step
    search_timeout: Duration,
    /// Bound on each individual adapter lookup
    adapter_timeout: Duration,
}

impl VerificationEngine {
    pub fn new(
        parser: CitationParser,
        doi_registry: Arc<dyn DatabaseAdapter>,
        citation_graph: Arc<dyn DatabaseAdapter>,
        search_timeout: Duration,
    ) -> Self {
        Self {
            parser,
            doi_registry,
            citation_graph,
            search_timeout,
            adapter_timeout: Duration::from_secs(8),
        }
    }

    pub async fn verify(&self, raw_text: &str) -> Citation {
        // Parsing
        let parsed = self.parser.parse(raw_text).await;
        let query = build_query(&parsed);
        if query.is_empty() {
            debug!("Nothing searchable in citation, short-circuiting to unverified");
            return unverified(raw_text);
        }

        // Searching: DOI registry first, citation-graph engine second
        let candidate = match timeout(self.search_timeout, self.find_candidate(&query)).await {
            Ok(candidate) => candidate,
            Err(_) => {
                warn!("Candidate search timed out after {:?}", self.search_timeout);
                None
            }
        };
        let Some(candidate) = candidate else {
            info!("No candidate found for citation, marking unverified");
            return unverified(raw_text);
        };

        // Scored
        let title_similarity = text_similarity(
            parsed.title.as_deref().unwrap_or(""),
            &candidate.title,
        );
        let authors_similarity = text_similarity(
            parsed.authors.as_deref().unwrap_or(""),
            &candidate.authors,
        );
        let date_similarity = date_similarity(parsed.year, candidate.year);

        // Verdict
        let verified = is_verified(title_similarity, authors_similarity);
        info!(
            "Citation verdict: verified={} (title={}, authors={}, date={})",
            verified, title_similarity, authors_similarity, date_similarity
        );

        Citation {
            id: Uuid::new_v4().to_string(),
            raw_text: raw_text.to_string(),
            verified,
            title_similarity,
            authors_similarity,
            date_similarity,
            best_match: Some(BestMatch {
                link: candidate
                    .doi
                    .as_ref()
                    .map(|doi| format!("https://doi.org/{doi}")),
                title: candidate.title,
                authors: candidate.authors,
                date: candidate.year,
            }),
        }
    }

    /// DOI registry first; the citation-graph engine only as fallback.
    /// Adapter errors degrade to "no candidate" rather than propagating.
    async fn find_candidate(&self, query: &str) -> Option<Source> {
        for adapter in [&self.doi_registry, &self.citation_graph] {
            let lookup = timeout(self.adapter_timeout, adapter.best_match(query)).await;
            match lookup {
                Ok(Ok(Some(source))) => {
                    debug!("{} produced a candidate", adapter.db());
                    return Some(source);
                }
                Ok(Ok(None)) => {
                    debug!("{} had no candidate", adapter.db());
                }
                Ok(Err(e)) => {
                    warn!("{} candidate lookup failed: {}", adapter.db(), e);
                }
                Err(_) => {
                    warn!("{} candidate lookup timed out", adapter.db());
                }
            }
        }
        None
    }
}

/// The authoritative disjunctive threshold rule
pub fn is_verified(title_similarity: u8, authors_similarity: u8) -> bool {
    title_similarity > TITLE_THRESHOLD || authors_similarity > AUTHORS_THRESHOLD
}

/// Query string for candidate search: title, authors and year joined
fn build_query(parsed: &ParsedCitation) -> String {
    let mut parts = Vec::new();
    if let Some(title) = parsed.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        parts.push(title.to_string());
    }
    if let Some(authors) = parsed.authors.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        parts.push(authors.to_string());
    }
    if let Some(year) = parsed.year {
        parts.push(year.to_string());
    }
    parts.join(" ")
}

fn unverified(raw_text: &str) -> Citation {
    Citation {
        id: Uuid::new_v4().to_string(),
        raw_text: raw_text.to_string(),
        verified: false,
        title_similarity: 0,
        authors_similarity: 0,
        date_similarity: 0,
        best_match: None,
    }
}
