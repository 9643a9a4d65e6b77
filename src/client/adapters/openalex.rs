use super::traits::{AdapterError, DatabaseAdapter};
use crate::client::{format_authors, normalize_doi, Source, SourceDb};
use crate::config::AdaptersConfig;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const MAX_RESULTS: usize = 5;

/// OpenAlex comprehensive open index adapter
pub struct OpenalexAdapter {
    client: reqwest::Client,
    base_url: String,
    contact_email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<WorkRecord>,
}

#[derive(Debug, Deserialize)]
struct WorkRecord {
    display_name: Option<String>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    publication_year: Option<u32>,
    primary_location: Option<PrimaryLocation>,
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    author: Option<AuthorRecord>,
}

#[derive(Debug, Deserialize)]
struct AuthorRecord {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrimaryLocation {
    source: Option<LocationSource>,
}

#[derive(Debug, Deserialize)]
struct LocationSource {
    display_name: Option<String>,
}

impl OpenalexAdapter {
    pub fn new(config: &AdaptersConfig) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AdapterError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.openalex_base_url.clone(),
            contact_email: config.contact_email.clone(),
        })
    }

    fn convert_record(record: WorkRecord) -> Option<Source> {
        let title = record.display_name.filter(|t| !t.trim().is_empty())?;

        let names: Vec<String> = record
            .authorships
            .into_iter()
            .filter_map(|a| a.author.and_then(|author| author.display_name))
            .collect();

        Some(Source {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            authors: format_authors(&names),
            year: record.publication_year,
            journal: record
                .primary_location
                .and_then(|loc| loc.source)
                .and_then(|src| src.display_name),
            // OpenAlex returns DOIs as full https://doi.org/ URLs
            doi: record.doi.as_deref().and_then(normalize_doi),
            origin_adapter: SourceDb::Openalex,
            verified: false,
        })
    }
}

#[async_trait]
impl DatabaseAdapter for OpenalexAdapter {
    fn db(&self) -> SourceDb {
        SourceDb::Openalex
    }

    fn max_results(&self) -> usize {
        MAX_RESULTS
    }

    async fn search(&self, keywords: &[String]) -> Result<Vec<Source>, AdapterError> {
        let query = keywords.join(" ");
        let mut url = Url::parse(&format!("{}/works", self.base_url))
            .map_err(|e| AdapterError::Other(format!("Invalid base URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("search", &query)
                .append_pair("per-page", &MAX_RESULTS.to_string());
            if let Some(email) = &self.contact_email {
                pairs.append_pair("mailto", email);
            }
        }

        debug!("OpenAlex search URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AdapterError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(AdapterError::from_status(response.status(), "OpenAlex"));
        }

        let parsed: WorksResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(format!("Malformed OpenAlex payload: {e}")))?;

        let sources: Vec<Source> = parsed
            .results
            .into_iter()
            .filter_map(Self::convert_record)
            .take(MAX_RESULTS)
            .collect();

        info!("OpenAlex returned {} sources for '{}'", sources.len(), query);
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_works_payload_and_strips_doi_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works"))
            .and(query_param("search", "climate models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "display_name": "Climate model evaluation",
                    "authorships": [
                        {"author": {"display_name": "Jane Smith"}},
                        {"author": {"display_name": "Ada Doe"}}
                    ],
                    "publication_year": 2019,
                    "primary_location": {"source": {"display_name": "Nature Climate Change"}},
                    "doi": "https://doi.org/10.1038/s41558-019-0001"
                }]
            })))
            .mount(&server)
            .await;

        let config = AdaptersConfig {
            openalex_base_url: server.uri(),
            ..AdaptersConfig::default()
        };
        let adapter = OpenalexAdapter::new(&config).unwrap();
        let sources = adapter
            .search(&["climate".to_string(), "models".to_string()])
            .await
            .unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].title, "Climate model evaluation");
        assert_eq!(sources[0].doi.as_deref(), Some("10.1038/s41558-019-0001"));
        assert_eq!(
            sources[0].journal.as_deref(),
            Some("Nature Climate Change")
        );
        assert_eq!(sources[0].origin_adapter, SourceDb::Openalex);
    }

    #[tokio::test]
    async fn network_failure_is_reported() {
        let config = AdaptersConfig {
            // Nothing listens here
            openalex_base_url: "http://127.0.0.1:1".to_string(),
            ..AdaptersConfig::default()
        };
        let adapter = OpenalexAdapter::new(&config).unwrap();
        let result = adapter.search(&["x".to_string()]).await;
        assert!(result.is_err());
    }
}
