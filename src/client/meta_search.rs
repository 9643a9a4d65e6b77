use crate::client::adapters::{
    ArxivAdapter, CrossrefAdapter, DatabaseAdapter, OpenalexAdapter, PubmedAdapter,
    SemanticScholarAdapter,
};
use crate::client::{Source, SourceDb};
use crate::config::AdaptersConfig;
use crate::intent::SearchStrategy;
use crate::{Error, Result};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Cap on the merged, deduplicated result list
const MAX_MERGED_RESULTS: usize = 10;

/// Result of one orchestrated multi-database search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Deduplicated sources, at most ten, in adapter invocation order
    pub sources: Vec<Source>,
    /// Databases that were actually queried
    pub queried: Vec<SourceDb>,
    /// Databases that failed or timed out (degraded to empty lists)
    pub failed: Vec<SourceDb>,
}

/// Fans one [`SearchStrategy`] out across the selected database adapters
/// concurrently, waits for all of them to settle, then merges, dedups and
/// truncates the results. Adapter failures never fail the overall search.
pub struct SearchOrchestrator {
    adapters: Vec<Arc<dyn DatabaseAdapter>>,
    adapter_timeout: Duration,
}

impl SearchOrchestrator {
    /// Fixed invocation order; merge order follows this
    pub fn new(adapters: Vec<Arc<dyn DatabaseAdapter>>, adapter_timeout: Duration) -> Self {
        Self {
            adapters,
            adapter_timeout,
        }
    }

    /// Build the orchestrator over the five real adapters
    pub fn from_config(config: &AdaptersConfig) -> Result<Self> {
        let adapters: Vec<Arc<dyn DatabaseAdapter>> = vec![
            Arc::new(CrossrefAdapter::new(config).map_err(Error::from)?),
            Arc::new(PubmedAdapter::new(config).map_err(Error::from)?),
            Arc::new(SemanticScholarAdapter::new(config).map_err(Error::from)?),
            Arc::new(ArxivAdapter::new(config).map_err(Error::from)?),
            Arc::new(OpenalexAdapter::new(config).map_err(Error::from)?),
        ];

        info!("Initialized search orchestrator with {} adapters", adapters.len());
        Ok(Self::new(adapters, config.timeout()))
    }

    /// Look up one adapter by database, for the single-adapter step calls
    pub fn adapter(&self, db: SourceDb) -> Option<Arc<dyn DatabaseAdapter>> {
        self.adapters.iter().find(|a| a.db() == db).cloned()
    }

    /// Adapter subset for a request: the strategy's recommendation
    /// intersected with what the caller's plan is entitled to
    pub fn select_adapters(
        &self,
        strategy: &SearchStrategy,
        plan_allows_advanced: bool,
    ) -> Vec<Arc<dyn DatabaseAdapter>> {
        let entitled: HashSet<SourceDb> = if plan_allows_advanced {
            SourceDb::ALL.into_iter().collect()
        } else {
            SourceDb::BASIC.into_iter().collect()
        };

        self.adapters
            .iter()
            .filter(|a| {
                strategy.recommended_adapters.contains(&a.db()) && entitled.contains(&a.db())
            })
            .cloned()
            .collect()
    }

    /// Run the fan-out search. Blocks until every selected adapter has
    /// settled; a slow adapter sets the floor latency for the response.
    pub async fn search(
        &self,
        strategy: &SearchStrategy,
        plan_allows_advanced: bool,
    ) -> SearchOutcome {
        let start = Instant::now();
        let selected = self.select_adapters(strategy, plan_allows_advanced);
        let queried: Vec<SourceDb> = selected.iter().map(|a| a.db()).collect();

        info!(
            "Searching {} databases for {:?}: {:?}",
            selected.len(),
            strategy.search_type,
            queried
        );

        let mut tasks = Vec::new();
        for adapter in selected {
            let keywords = strategy.keywords.clone();
            let adapter_timeout = self.adapter_timeout;
            tasks.push(tokio::spawn(async move {
                let db = adapter.db();
                match timeout(adapter_timeout, adapter.search(&keywords)).await {
                    Ok(Ok(sources)) => (db, Ok(sources)),
                    Ok(Err(e)) => (db, Err(e.to_string())),
                    Err(_) => (db, Err("timed out".to_string())),
                }
            }));
        }

        // Await in invocation order so the merge order is deterministic
        let mut merged = Vec::new();
        let mut failed = Vec::new();
        for task in tasks {
            match task.await {
                Ok((db, Ok(sources))) => {
                    debug!("{} returned {} sources", db, sources.len());
                    merged.extend(sources);
                }
                Ok((db, Err(reason))) => {
                    warn!("{} search failed, degrading to empty list: {}", db, reason);
                    failed.push(db);
                }
                Err(e) => {
                    warn!("Adapter task panicked, degrading to empty list: {}", e);
                }
            }
        }

        let sources = dedupe_sources(merged);
        info!(
            "Search settled in {:?}: {} deduplicated sources, {} failed databases",
            start.elapsed(),
            sources.len(),
            failed.len()
        );

        SearchOutcome {
            sources,
            queried,
            failed,
        }
    }

    /// Probe every adapter concurrently for the health endpoint
    pub async fn health(&self) -> Vec<(SourceDb, bool)> {
        let probes = self.adapters.iter().map(|adapter| {
            let adapter = adapter.clone();
            async move { (adapter.db(), adapter.health_check().await) }
        });
        join_all(probes).await
    }
}

/// First-seen-wins deduplication on the identity key (DOI, else
/// lowercased 50-char title prefix), truncated to the top ten
pub fn dedupe_sources(sources: Vec<Source>) -> Vec<Source> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for source in sources {
        if seen.insert(source.dedup_key()) {
            unique.push(source);
        }
        if unique.len() >= MAX_MERGED_RESULTS {
            break;
        }
    }

    unique
}
