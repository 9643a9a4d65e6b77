use super::traits::{AdapterError, DatabaseAdapter};
use crate::client::{format_authors, normalize_doi, Source, SourceDb};
use crate::config::AdaptersConfig;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const MAX_RESULTS: usize = 5;

/// CrossRef DOI registry adapter
pub struct CrossrefAdapter {
    client: reqwest::Client,
    base_url: String,
    contact_email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorksResponse {
    message: WorksMessage,
}

#[derive(Debug, Deserialize)]
struct WorksMessage {
    #[serde(default)]
    items: Vec<WorkItem>,
}

#[derive(Debug, Deserialize)]
struct WorkItem {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<WorkAuthor>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    issued: Option<DateParts>,
}

#[derive(Debug, Deserialize)]
struct WorkAuthor {
    given: Option<String>,
    family: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DateParts {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i64>>>,
}

impl CrossrefAdapter {
    pub fn new(config: &AdaptersConfig) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AdapterError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.crossref_base_url.clone(),
            contact_email: config.contact_email.clone(),
        })
    }

    fn build_search_url(&self, query: &str) -> Result<String, AdapterError> {
        let mut url = Url::parse(&format!("{}/works", self.base_url))
            .map_err(|e| AdapterError::Other(format!("Invalid base URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("query", query)
                .append_pair("rows", &MAX_RESULTS.to_string());
            // Polite-pool access gets a dedicated CrossRef server pool
            if let Some(email) = &self.contact_email {
                pairs.append_pair("mailto", email);
            }
        }

        Ok(url.to_string())
    }

    fn convert_item(item: WorkItem) -> Option<Source> {
        let title = item.title.into_iter().next()?;
        if title.trim().is_empty() {
            return None;
        }

        let names: Vec<String> = item
            .author
            .iter()
            .map(|a| match (&a.given, &a.family) {
                (Some(given), Some(family)) => format!("{given} {family}"),
                (None, Some(family)) => family.clone(),
                (Some(given), None) => given.clone(),
                (None, None) => String::new(),
            })
            .collect();

        let year = item
            .issued
            .and_then(|d| d.date_parts.into_iter().next())
            .and_then(|parts| parts.into_iter().next().flatten())
            .and_then(|y| u32::try_from(y).ok());

        Some(Source {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            authors: format_authors(&names),
            year,
            journal: item.container_title.into_iter().next(),
            doi: item.doi.as_deref().and_then(normalize_doi),
            origin_adapter: SourceDb::Crossref,
            verified: false,
        })
    }
}

#[async_trait]
impl DatabaseAdapter for CrossrefAdapter {
    fn db(&self) -> SourceDb {
        SourceDb::Crossref
    }

    fn max_results(&self) -> usize {
        MAX_RESULTS
    }

    async fn search(&self, keywords: &[String]) -> Result<Vec<Source>, AdapterError> {
        let query = keywords.join(" ");
        let url = self.build_search_url(&query)?;
        debug!("CrossRef search URL: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(AdapterError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(AdapterError::from_status(response.status(), "CrossRef"));
        }

        let parsed: WorksResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(format!("Malformed CrossRef payload: {e}")))?;

        let sources: Vec<Source> = parsed
            .message
            .items
            .into_iter()
            .filter_map(Self::convert_item)
            .take(MAX_RESULTS)
            .collect();

        info!("CrossRef returned {} sources for '{}'", sources.len(), query);
        Ok(sources)
    }
}
