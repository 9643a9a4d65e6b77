use crate::client::SourceDb;
use crate::llm::{strip_code_fences, LanguageModel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Research domain a piece of text is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchDomain {
    Medical,
    Science,
    Technology,
    Social,
    General,
}

impl SearchDomain {
    /// Canned adapter recommendation per domain
    pub fn recommended_adapters(self) -> Vec<SourceDb> {
        match self {
            SearchDomain::Medical => vec![SourceDb::Pubmed, SourceDb::Crossref, SourceDb::Openalex],
            SearchDomain::Technology => vec![
                SourceDb::Arxiv,
                SourceDb::SemanticScholar,
                SourceDb::Crossref,
            ],
            SearchDomain::Science => vec![
                SourceDb::Crossref,
                SourceDb::SemanticScholar,
                SourceDb::Arxiv,
                SourceDb::Openalex,
            ],
            SearchDomain::Social => vec![
                SourceDb::Crossref,
                SourceDb::Openalex,
                SourceDb::SemanticScholar,
            ],
            SearchDomain::General => vec![
                SourceDb::Crossref,
                SourceDb::SemanticScholar,
                SourceDb::Openalex,
            ],
        }
    }
}

/// Search plan derived from the input text. Recomputed per discovery step.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchStrategy {
    /// One to five query keywords
    pub keywords: Vec<String>,
    pub search_type: SearchDomain,
    pub recommended_adapters: Vec<SourceDb>,
    pub reasoning: String,
}

/// Shape the language model is asked to produce
#[derive(Debug, Deserialize)]
struct ModelStrategy {
    #[serde(rename = "searchType")]
    search_type: SearchDomain,
    keywords: Vec<String>,
    #[serde(default)]
    databases: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

const SYSTEM_PROMPT: &str = "You classify academic text for bibliographic search. \
Respond with ONLY a JSON object, no prose: \
{\"searchType\": one of \"medical\"|\"science\"|\"technology\"|\"social\"|\"general\", \
\"keywords\": array of 1-5 short search keywords, \
\"databases\": array drawn from [\"crossref\",\"pubmed\",\"semantic_scholar\",\"arxiv\",\"openalex\"], \
\"reasoning\": one short sentence}";

// Fixed keyword sets for the heuristic fallback, tested in precedence order
const MEDICAL_TERMS: &[&str] = &[
    "clinical", "patient", "disease", "treatment", "therapy", "drug", "medicine", "diagnosis",
    "cancer", "vaccine", "symptom", "tumor",
];
const TECHNOLOGY_TERMS: &[&str] = &[
    "neural", "algorithm", "software", "computing", "machine learning", "artificial intelligence",
    "network", "robot", "computer", "deep learning",
];
const SCIENCE_TERMS: &[&str] = &[
    "physics", "chemistry", "biology", "quantum", "molecule", "experiment", "protein", "climate",
    "energy", "species", "evolution",
];
const SOCIAL_TERMS: &[&str] = &[
    "society", "social", "economic", "policy", "education", "culture", "political", "psychology",
    "behavior", "inequality",
];

/// Turns free text into a [`SearchStrategy`] via the language model,
/// falling back to a deterministic keyword heuristic when the model
/// call fails or returns something that is not valid JSON.
pub struct IntentClassifier {
    model: Arc<dyn LanguageModel>,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn classify(&self, text: &str) -> SearchStrategy {
        match self.classify_with_model(text).await {
            Some(strategy) => strategy,
            None => {
                debug!("Falling back to keyword heuristic classification");
                heuristic_strategy(text)
            }
        }
    }

    async fn classify_with_model(&self, text: &str) -> Option<SearchStrategy> {
        let raw = match self.model.complete(SYSTEM_PROMPT, text).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Intent classification model call failed: {}", e);
                return None;
            }
        };

        let parsed: ModelStrategy = match serde_json::from_str(strip_code_fences(&raw)) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Model returned non-JSON strategy: {}", e);
                return None;
            }
        };

        let keywords: Vec<String> = parsed
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .take(5)
            .collect();
        if keywords.is_empty() {
            warn!("Model strategy had no usable keywords");
            return None;
        }

        let mut adapters: Vec<SourceDb> = parsed
            .databases
            .iter()
            .filter_map(|name| SourceDb::from_str(name).ok())
            .collect();
        adapters.dedup();
        if adapters.is_empty() {
            adapters = parsed.search_type.recommended_adapters();
        }

        Some(SearchStrategy {
            keywords,
            search_type: parsed.search_type,
            recommended_adapters: adapters,
            reasoning: parsed.reasoning,
        })
    }
}

/// Deterministic classification: fixed keyword sets in fixed precedence
/// order (medical, technology, science, social, then general).
pub fn heuristic_strategy(text: &str) -> SearchStrategy {
    let lowered = text.to_lowercase();

    let domain = if contains_any(&lowered, MEDICAL_TERMS) {
        SearchDomain::Medical
    } else if contains_any(&lowered, TECHNOLOGY_TERMS) {
        SearchDomain::Technology
    } else if contains_any(&lowered, SCIENCE_TERMS) {
        SearchDomain::Science
    } else if contains_any(&lowered, SOCIAL_TERMS) {
        SearchDomain::Social
    } else {
        SearchDomain::General
    };

    SearchStrategy {
        keywords: heuristic_keywords(text),
        search_type: domain,
        recommended_adapters: domain.recommended_adapters(),
        reasoning: format!("Keyword heuristic classified the text as {domain:?}"),
    }
}

fn contains_any(lowered: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| lowered.contains(term))
}

/// First five words longer than three characters
fn heuristic_keywords(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 3)
        .take(5)
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;

    struct FixedModel(String);

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Err(Error::LanguageModel("unreachable endpoint".to_string()))
        }
    }

    #[test]
    fn heuristic_medical() {
        let strategy = heuristic_strategy("A clinical trial of a new cancer treatment");
        assert_eq!(strategy.search_type, SearchDomain::Medical);
        assert!(strategy.recommended_adapters.contains(&SourceDb::Pubmed));
    }

    #[test]
    fn heuristic_technology() {
        let strategy = heuristic_strategy("Neural networks predict protein folding");
        // "neural" wins before the science set is consulted
        assert_eq!(strategy.search_type, SearchDomain::Technology);
        assert!(strategy.recommended_adapters.contains(&SourceDb::Arxiv));
    }

    #[test]
    fn heuristic_science() {
        let strategy = heuristic_strategy("Quantum entanglement in photonic systems");
        assert_eq!(strategy.search_type, SearchDomain::Science);
    }

    #[test]
    fn heuristic_social() {
        let strategy = heuristic_strategy("Economic policy and educational outcomes");
        assert_eq!(strategy.search_type, SearchDomain::Social);
    }

    #[test]
    fn heuristic_no_match_is_general() {
        let strategy = heuristic_strategy("An ode to the old oak door");
        assert_eq!(strategy.search_type, SearchDomain::General);
        assert_eq!(
            strategy.recommended_adapters,
            SearchDomain::General.recommended_adapters()
        );
    }

    #[test]
    fn heuristic_medical_precedes_technology() {
        // Both sets match; medical is tested first
        let strategy = heuristic_strategy("Machine learning for cancer diagnosis");
        assert_eq!(strategy.search_type, SearchDomain::Medical);
    }

    #[test]
    fn heuristic_keywords_skip_short_words() {
        let keywords = heuristic_keywords("The of a neural network predicts protein folding fast now");
        assert_eq!(
            keywords,
            vec!["neural", "network", "predicts", "protein", "folding"]
        );
    }

    #[tokio::test]
    async fn model_strategy_is_used_when_valid() {
        let model = FixedModel(
            r#"{"searchType": "medical", "keywords": ["crispr", "oncology"],
                "databases": ["pubmed", "crossref"], "reasoning": "biomedical topic"}"#
                .to_string(),
        );
        let classifier = IntentClassifier::new(Arc::new(model));
        let strategy = classifier.classify("CRISPR in oncology").await;

        assert_eq!(strategy.search_type, SearchDomain::Medical);
        assert_eq!(strategy.keywords, vec!["crispr", "oncology"]);
        assert_eq!(
            strategy.recommended_adapters,
            vec![SourceDb::Pubmed, SourceDb::Crossref]
        );
    }

    #[tokio::test]
    async fn invalid_json_falls_back_to_heuristic() {
        let model = FixedModel("I think this is about medicine, probably?".to_string());
        let classifier = IntentClassifier::new(Arc::new(model));
        let strategy = classifier.classify("clinical trial outcomes").await;
        assert_eq!(strategy.search_type, SearchDomain::Medical);
        assert!(strategy.reasoning.contains("heuristic"));
    }

    #[tokio::test]
    async fn model_failure_falls_back_to_heuristic() {
        let classifier = IntentClassifier::new(Arc::new(FailingModel));
        let strategy = classifier.classify("quantum chemistry simulations").await;
        assert_eq!(strategy.search_type, SearchDomain::Science);
    }

    #[tokio::test]
    async fn fenced_model_output_is_accepted() {
        let model = FixedModel(
            "```json\n{\"searchType\": \"technology\", \"keywords\": [\"transformers\"]}\n```"
                .to_string(),
        );
        let classifier = IntentClassifier::new(Arc::new(model));
        let strategy = classifier.classify("transformer models").await;
        assert_eq!(strategy.search_type, SearchDomain::Technology);
        // No databases given: fall back to the domain's canned set
        assert_eq!(
            strategy.recommended_adapters,
            SearchDomain::Technology.recommended_adapters()
        );
    }
}
