pub mod adapters;
pub mod meta_search;

pub use meta_search::{SearchOrchestrator, SearchOutcome};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A bibliographic record normalized from one upstream database.
/// Created per adapter call and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Source {
    pub id: String,
    pub title: String,
    /// Up to the first three author names, comma-joined
    pub authors: String,
    pub year: Option<u32>,
    pub journal: Option<String>,
    pub doi: Option<String>,
    /// Which adapter produced this record
    pub origin_adapter: SourceDb,
    pub verified: bool,
}

impl Source {
    /// Identity key for deduplication: DOI when present, otherwise the
    /// lowercased title truncated to 50 characters
    pub fn dedup_key(&self) -> String {
        match &self.doi {
            Some(doi) if !doi.is_empty() => doi.clone(),
            _ => {
                let lowered = self.title.to_lowercase();
                lowered.chars().take(50).collect()
            }
        }
    }
}

/// The five upstream bibliographic databases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceDb {
    /// CrossRef DOI registry
    Crossref,
    /// PubMed biomedical literature index
    Pubmed,
    /// Semantic Scholar citation-graph engine
    SemanticScholar,
    /// arXiv preprint repository
    Arxiv,
    /// OpenAlex comprehensive open index
    Openalex,
}

impl SourceDb {
    pub const ALL: [SourceDb; 5] = [
        SourceDb::Crossref,
        SourceDb::Pubmed,
        SourceDb::SemanticScholar,
        SourceDb::Arxiv,
        SourceDb::Openalex,
    ];

    /// Databases available to plans without advanced access
    pub const BASIC: [SourceDb; 3] = [
        SourceDb::Crossref,
        SourceDb::SemanticScholar,
        SourceDb::Openalex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceDb::Crossref => "crossref",
            SourceDb::Pubmed => "pubmed",
            SourceDb::SemanticScholar => "semantic_scholar",
            SourceDb::Arxiv => "arxiv",
            SourceDb::Openalex => "openalex",
        }
    }
}

impl fmt::Display for SourceDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceDb {
    type Err = ();

    /// Lenient parsing for model-produced database names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "crossref" | "cross_ref" => Ok(SourceDb::Crossref),
            "pubmed" | "pub_med" | "medline" => Ok(SourceDb::Pubmed),
            "semantic_scholar" | "semanticscholar" | "s2" => Ok(SourceDb::SemanticScholar),
            "arxiv" => Ok(SourceDb::Arxiv),
            "openalex" | "open_alex" => Ok(SourceDb::Openalex),
            _ => Err(()),
        }
    }
}

/// Strip URL and scheme prefixes down to the bare DOI
pub fn normalize_doi(raw: &str) -> Option<String> {
    let cleaned = raw
        .trim()
        .trim_start_matches("https://doi.org/")
        .trim_start_matches("http://doi.org/")
        .trim_start_matches("https://dx.doi.org/")
        .trim_start_matches("http://dx.doi.org/")
        .trim_start_matches("doi:")
        .trim();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Collapse an author list to at most the first three names, comma-joined
pub fn format_authors(names: &[String]) -> String {
    names
        .iter()
        .filter(|n| !n.trim().is_empty())
        .take(3)
        .map(|n| n.trim().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(title: &str, doi: Option<&str>) -> Source {
        Source {
            id: "test".to_string(),
            title: title.to_string(),
            authors: String::new(),
            year: None,
            journal: None,
            doi: doi.map(String::from),
            origin_adapter: SourceDb::Crossref,
            verified: false,
        }
    }

    #[test]
    fn dedup_key_prefers_doi() {
        let s = source("Some Title", Some("10.1038/nature12373"));
        assert_eq!(s.dedup_key(), "10.1038/nature12373");
    }

    #[test]
    fn dedup_key_falls_back_to_truncated_title() {
        let long_title = "A Very Long Title That Goes On And On About Protein Folding Dynamics";
        let s = source(long_title, None);
        let key = s.dedup_key();
        assert_eq!(key.chars().count(), 50);
        assert_eq!(key, long_title.to_lowercase().chars().take(50).collect::<String>());
    }

    #[test]
    fn doi_normalization() {
        assert_eq!(
            normalize_doi("https://doi.org/10.1038/nature12373"),
            Some("10.1038/nature12373".to_string())
        );
        assert_eq!(
            normalize_doi("doi:10.1/abc"),
            Some("10.1/abc".to_string())
        );
        assert_eq!(normalize_doi("  "), None);
    }

    #[test]
    fn authors_collapse_to_three() {
        let names = vec![
            "Smith, J.".to_string(),
            "Doe, A.".to_string(),
            "Lee, K.".to_string(),
            "Wong, P.".to_string(),
        ];
        assert_eq!(format_authors(&names), "Smith, J., Doe, A., Lee, K.");
        assert_eq!(format_authors(&[]), "");
    }

    #[test]
    fn source_db_parsing_is_lenient() {
        assert_eq!("CrossRef".parse::<SourceDb>(), Ok(SourceDb::Crossref));
        assert_eq!("Semantic Scholar".parse::<SourceDb>(), Ok(SourceDb::SemanticScholar));
        assert_eq!("openalex".parse::<SourceDb>(), Ok(SourceDb::Openalex));
        assert!("google".parse::<SourceDb>().is_err());
    }
}
