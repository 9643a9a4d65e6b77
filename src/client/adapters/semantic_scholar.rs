use super::traits::{AdapterError, DatabaseAdapter};
use crate::client::{format_authors, normalize_doi, Source, SourceDb};
use crate::config::AdaptersConfig;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const MAX_RESULTS: usize = 5;
const FIELDS: &str = "title,authors,year,venue,externalIds";

/// Semantic Scholar citation-graph engine adapter
pub struct SemanticScholarAdapter {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PaperSearchResponse {
    #[serde(default)]
    data: Vec<PaperRecord>,
}

#[derive(Debug, Deserialize)]
struct PaperRecord {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<PaperAuthor>,
    year: Option<u32>,
    venue: Option<String>,
    #[serde(rename = "externalIds")]
    external_ids: Option<ExternalIds>,
}

#[derive(Debug, Deserialize)]
struct PaperAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

impl SemanticScholarAdapter {
    pub fn new(config: &AdaptersConfig) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AdapterError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.semantic_scholar_base_url.clone(),
        })
    }

    fn convert_record(record: PaperRecord) -> Option<Source> {
        let title = record.title.filter(|t| !t.trim().is_empty())?;

        let names: Vec<String> = record
            .authors
            .into_iter()
            .filter_map(|a| a.name)
            .collect();

        Some(Source {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            authors: format_authors(&names),
            year: record.year,
            journal: record.venue.filter(|v| !v.trim().is_empty()),
            doi: record
                .external_ids
                .and_then(|ids| ids.doi)
                .as_deref()
                .and_then(normalize_doi),
            origin_adapter: SourceDb::SemanticScholar,
            verified: false,
        })
    }
}

#[async_trait]
impl DatabaseAdapter for SemanticScholarAdapter {
    fn db(&self) -> SourceDb {
        SourceDb::SemanticScholar
    }

    fn max_results(&self) -> usize {
        MAX_RESULTS
    }

    async fn search(&self, keywords: &[String]) -> Result<Vec<Source>, AdapterError> {
        let query = keywords.join(" ");
        let mut url = Url::parse(&format!("{}/paper/search", self.base_url))
            .map_err(|e| AdapterError::Other(format!("Invalid base URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("query", &query)
            .append_pair("limit", &MAX_RESULTS.to_string())
            .append_pair("fields", FIELDS);

        debug!("Semantic Scholar search URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AdapterError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(AdapterError::from_status(
                response.status(),
                "Semantic Scholar",
            ));
        }

        let parsed: PaperSearchResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(format!("Malformed Semantic Scholar payload: {e}")))?;

        let sources: Vec<Source> = parsed
            .data
            .into_iter()
            .filter_map(Self::convert_record)
            .take(MAX_RESULTS)
            .collect();

        info!(
            "Semantic Scholar returned {} sources for '{}'",
            sources.len(),
            query
        );
        Ok(sources)
    }
}
