use super::traits::{AdapterError, DatabaseAdapter};
use crate::client::{format_authors, normalize_doi, Source, SourceDb};
use crate::config::AdaptersConfig;
use async_trait::async_trait;
use roxmltree::Document;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const MAX_RESULTS: usize = 3;

/// arXiv preprint repository adapter. The API speaks Atom XML.
pub struct ArxivAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivAdapter {
    pub fn new(config: &AdaptersConfig) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AdapterError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.arxiv_base_url.clone(),
        })
    }

    fn build_search_url(&self, query: &str) -> Result<String, AdapterError> {
        let mut url = Url::parse(&format!("{}/query", self.base_url))
            .map_err(|e| AdapterError::Other(format!("Invalid base URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("search_query", &format!("all:\"{query}\""))
            .append_pair("start", "0")
            .append_pair("max_results", &MAX_RESULTS.to_string())
            .append_pair("sortBy", "relevance")
            .append_pair("sortOrder", "descending");

        Ok(url.to_string())
    }

    fn parse_feed(&self, feed: &str) -> Result<Vec<Source>, AdapterError> {
        let doc = Document::parse(feed)
            .map_err(|e| AdapterError::Parse(format!("Failed to parse Atom XML: {e}")))?;

        let mut sources = Vec::new();

        for entry in doc.descendants().filter(|n| n.has_tag_name("entry")) {
            let mut title = None;
            let mut year = None;
            let mut doi = None;
            let mut names = Vec::new();

            for child in entry.children().filter(|n| n.is_element()) {
                match child.tag_name().name() {
                    "title" => {
                        if let Some(text) = child.text() {
                            title = Some(text.trim().replace('\n', " ").replace("  ", " "));
                        }
                    }
                    "published" => {
                        // Format: YYYY-MM-DDTHH:MM:SSZ
                        year = child
                            .text()
                            .and_then(|d| d.split('-').next())
                            .and_then(|y| y.parse::<u32>().ok());
                    }
                    "author" => {
                        for name_elem in child.descendants().filter(|n| n.has_tag_name("name")) {
                            if let Some(name) = name_elem.text() {
                                names.push(name.trim().to_string());
                            }
                        }
                    }
                    "doi" => {
                        doi = child.text().and_then(normalize_doi);
                    }
                    _ => {}
                }
            }

            let Some(title) = title.filter(|t| !t.is_empty()) else {
                continue;
            };

            sources.push(Source {
                id: Uuid::new_v4().to_string(),
                title,
                authors: format_authors(&names),
                year,
                journal: Some("arXiv".to_string()),
                doi,
                origin_adapter: SourceDb::Arxiv,
                verified: false,
            });

            if sources.len() >= MAX_RESULTS {
                break;
            }
        }

        debug!("Parsed {} entries from arXiv feed", sources.len());
        Ok(sources)
    }
}

#[async_trait]
impl DatabaseAdapter for ArxivAdapter {
    fn db(&self) -> SourceDb {
        SourceDb::Arxiv
    }

    fn max_results(&self) -> usize {
        MAX_RESULTS
    }

    async fn search(&self, keywords: &[String]) -> Result<Vec<Source>, AdapterError> {
        let query = keywords.join(" ");
        let url = self.build_search_url(&query)?;
        debug!("arXiv search URL: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(AdapterError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(AdapterError::from_status(response.status(), "arXiv"));
        }

        let feed = response
            .text()
            .await
            .map_err(|e| AdapterError::Network(format!("Failed to read response: {e}")))?;

        let sources = self.parse_feed(&feed)?;
        info!("arXiv returned {} sources for '{}'", sources.len(), query);
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <entry>
    <id>http://arxiv.org/abs/2101.00001v1</id>
    <title>Neural networks for protein structure</title>
    <published>2021-01-04T18:00:00Z</published>
    <author><name>Jane Smith</name></author>
    <author><name>Ada Doe</name></author>
    <arxiv:doi>10.48550/arXiv.2101.00001</arxiv:doi>
  </entry>
</feed>"#;

    #[tokio::test]
    async fn parses_atom_feed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        let config = AdaptersConfig {
            arxiv_base_url: server.uri(),
            ..AdaptersConfig::default()
        };
        let adapter = ArxivAdapter::new(&config).unwrap();
        let sources = adapter
            .search(&["protein".to_string(), "structure".to_string()])
            .await
            .unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].title, "Neural networks for protein structure");
        assert_eq!(sources[0].authors, "Jane Smith, Ada Doe");
        assert_eq!(sources[0].year, Some(2021));
        assert_eq!(sources[0].journal.as_deref(), Some("arXiv"));
        assert_eq!(sources[0].doi.as_deref(), Some("10.48550/arXiv.2101.00001"));
    }

    #[tokio::test]
    async fn malformed_xml_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not xml at all <"))
            .mount(&server)
            .await;

        let config = AdaptersConfig {
            arxiv_base_url: server.uri(),
            ..AdaptersConfig::default()
        };
        let adapter = ArxivAdapter::new(&config).unwrap();
        let result = adapter.search(&["x".to_string()]).await;
        assert!(matches!(result, Err(AdapterError::Parse(_))));
    }
}
