use super::traits::{AdapterError, DatabaseAdapter};
use crate::client::{format_authors, normalize_doi, Source, SourceDb};
use crate::config::AdaptersConfig;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const MAX_RESULTS: usize = 3;

/// PubMed biomedical literature index adapter. Search is a two-step
/// E-utilities flow: esearch for PMIDs, esummary for the records.
pub struct PubmedAdapter {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EsummaryResponse {
    result: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SummaryRecord {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<SummaryAuthor>,
    fulljournalname: Option<String>,
    pubdate: Option<String>,
    elocationid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryAuthor {
    name: Option<String>,
}

impl PubmedAdapter {
    pub fn new(config: &AdaptersConfig) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AdapterError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.pubmed_base_url.clone(),
        })
    }

    fn endpoint(&self, name: &str) -> Result<Url, AdapterError> {
        Url::parse(&format!("{}/{name}", self.base_url))
            .map_err(|e| AdapterError::Other(format!("Invalid base URL: {e}")))
    }

    async fn fetch_ids(&self, query: &str) -> Result<Vec<String>, AdapterError> {
        let mut url = self.endpoint("esearch.fcgi")?;
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("term", query)
            .append_pair("retmode", "json")
            .append_pair("retmax", &MAX_RESULTS.to_string());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AdapterError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(AdapterError::from_status(response.status(), "PubMed"));
        }

        let parsed: EsearchResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(format!("Malformed esearch payload: {e}")))?;

        Ok(parsed.esearchresult.idlist)
    }

    async fn fetch_summaries(&self, ids: &[String]) -> Result<Vec<Source>, AdapterError> {
        let mut url = self.endpoint("esummary.fcgi")?;
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("id", &ids.join(","))
            .append_pair("retmode", "json");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AdapterError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(AdapterError::from_status(response.status(), "PubMed"));
        }

        let parsed: EsummaryResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(format!("Malformed esummary payload: {e}")))?;

        let mut sources = Vec::new();
        for id in ids {
            let Some(value) = parsed.result.get(id) else {
                continue;
            };
            let Ok(record) = serde_json::from_value::<SummaryRecord>(value.clone()) else {
                continue;
            };
            if let Some(source) = Self::convert_record(record) {
                sources.push(source);
            }
        }
        Ok(sources)
    }

    fn convert_record(record: SummaryRecord) -> Option<Source> {
        let title = record.title.filter(|t| !t.trim().is_empty())?;

        let names: Vec<String> = record
            .authors
            .into_iter()
            .filter_map(|a| a.name)
            .collect();

        // pubdate looks like "2020 Mar 15" or just "2020"
        let year = record
            .pubdate
            .as_deref()
            .and_then(|d| d.split_whitespace().next())
            .and_then(|y| y.parse::<u32>().ok());

        // elocationid carries the DOI as "doi: 10.xxxx/yyyy" when present
        let doi = record
            .elocationid
            .as_deref()
            .filter(|e| e.contains("10."))
            .map(|e| e.trim_start_matches("doi:").trim())
            .and_then(normalize_doi);

        Some(Source {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            authors: format_authors(&names),
            year,
            journal: record.fulljournalname,
            doi,
            origin_adapter: SourceDb::Pubmed,
            verified: false,
        })
    }
}

#[async_trait]
impl DatabaseAdapter for PubmedAdapter {
    fn db(&self) -> SourceDb {
        SourceDb::Pubmed
    }

    fn max_results(&self) -> usize {
        MAX_RESULTS
    }

    async fn search(&self, keywords: &[String]) -> Result<Vec<Source>, AdapterError> {
        let query = keywords.join(" ");
        debug!("PubMed search: {}", query);

        let ids = self.fetch_ids(&query).await?;
        if ids.is_empty() {
            info!("PubMed returned no PMIDs for '{}'", query);
            return Ok(Vec::new());
        }

        let sources = self.fetch_summaries(&ids).await?;
        info!("PubMed returned {} sources for '{}'", sources.len(), query);
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> AdaptersConfig {
        AdaptersConfig {
            pubmed_base_url: server.uri(),
            ..AdaptersConfig::default()
        }
    }

    #[tokio::test]
    async fn two_step_search_normalizes_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/esearch.fcgi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "esearchresult": {"idlist": ["12345"]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/esummary.fcgi"))
            .and(query_param("id", "12345"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {
                    "uids": ["12345"],
                    "12345": {
                        "title": "CRISPR screening of tumor suppressors",
                        "authors": [{"name": "Smith J"}, {"name": "Doe A"}],
                        "fulljournalname": "Cell",
                        "pubdate": "2021 Jun 4",
                        "elocationid": "doi: 10.1016/j.cell.2021.01.001"
                    }
                }
            })))
            .mount(&server)
            .await;

        let adapter = PubmedAdapter::new(&config_for(&server)).unwrap();
        let sources = adapter.search(&["crispr".to_string()]).await.unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].title, "CRISPR screening of tumor suppressors");
        assert_eq!(sources[0].authors, "Smith J, Doe A");
        assert_eq!(sources[0].year, Some(2021));
        assert_eq!(sources[0].doi.as_deref(), Some("10.1016/j.cell.2021.01.001"));
        assert_eq!(sources[0].origin_adapter, SourceDb::Pubmed);
    }

    #[tokio::test]
    async fn empty_id_list_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/esearch.fcgi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "esearchresult": {"idlist": []}
            })))
            .mount(&server)
            .await;

        let adapter = PubmedAdapter::new(&config_for(&server)).unwrap();
        let sources = adapter.search(&["nothing".to_string()]).await.unwrap();
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn rate_limit_maps_to_adapter_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/esearch.fcgi"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let adapter = PubmedAdapter::new(&config_for(&server)).unwrap();
        let result = adapter.search(&["x".to_string()]).await;
        assert!(matches!(result, Err(AdapterError::RateLimit)));
    }
}
