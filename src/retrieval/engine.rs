//! Stage A: clearance-aware recall
//!
//! Embeds the query, over-fetches nearest neighbours from the store with
//! the tier pre-filter pushed down, then applies the ground-truth access
//! filter before handing survivors to stage B. The pre-filter only saves
//! work; the post-filter decides. Disabling the pre-filter must never
//! change what a caller can see, only what the store has to scan.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::errors::{EngineError, Result};
use crate::policy::{AccessLevel, AccessPolicy, Tier};
use crate::providers::{EmbeddingProvider, RerankProvider};
use crate::retrieval::rerank::{Candidate, Reranker, RerankOutcome};
use crate::routing::KnowledgeCollection;
use crate::store::{SearchFilter, VectorStore};

/// Retrieval tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Result count when the caller asks for zero.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    /// Stage A fetches `overfetch_factor * top_k` so filtering and
    /// reranking have slack to work with.
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,
    /// Push the tier filter into the store query.
    #[serde(default = "default_prefilter_enabled")]
    pub prefilter_enabled: bool,
    /// Score reported for results served in degraded mode.
    #[serde(default = "default_fallback_score")]
    pub fallback_score: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            overfetch_factor: default_overfetch_factor(),
            prefilter_enabled: default_prefilter_enabled(),
            fallback_score: default_fallback_score(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_overfetch_factor() -> usize {
    4
}

fn default_prefilter_enabled() -> bool {
    true
}

fn default_fallback_score() -> f64 {
    0.5
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_top_k == 0 {
            return Err(EngineError::Config("default_top_k must be positive".to_string()));
        }
        if self.overfetch_factor == 0 {
            return Err(EngineError::Config("overfetch_factor must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.fallback_score) {
            return Err(EngineError::Config(format!(
                "fallback_score {} outside [0, 1]",
                self.fallback_score
            )));
        }
        Ok(())
    }
}

/// What retrieval produced for one query.
#[derive(Debug)]
pub struct RetrievalOutput {
    pub outcome: RerankOutcome,
    /// Pools that were searched.
    pub collections: Vec<KnowledgeCollection>,
    /// Access-safe candidates found before truncation to top_k.
    pub total_candidates: usize,
}

/// Two-stage retrieval over one or more collections.
pub struct RetrievalEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Reranker,
    policy: Arc<AccessPolicy>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        rerank_provider: Arc<dyn RerankProvider>,
        policy: Arc<AccessPolicy>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        config.validate()?;
        let reranker = Reranker::new(rerank_provider, config.fallback_score);
        Ok(Self {
            store,
            embedder,
            reranker,
            policy,
            config,
        })
    }

    /// Retrieves from a single collection.
    pub async fn retrieve(
        &self,
        query: &str,
        caller_level: AccessLevel,
        top_k: usize,
        collection: KnowledgeCollection,
        tier_filter: Option<&[Tier]>,
    ) -> Result<RetrievalOutput> {
        self.retrieve_multi(query, caller_level, top_k, &[collection], tier_filter)
            .await
    }

    /// Retrieves from several collections, merging their candidate pools
    /// before the rerank stage.
    pub async fn retrieve_multi(
        &self,
        query: &str,
        caller_level: AccessLevel,
        top_k: usize,
        collections: &[KnowledgeCollection],
        tier_filter: Option<&[Tier]>,
    ) -> Result<RetrievalOutput> {
        let top_k = if top_k == 0 { self.config.default_top_k } else { top_k };

        // Tiers this caller may read, narrowed by any caller-side filter.
        let allowed = self.policy.allowed_tiers(caller_level);
        let effective: Vec<Tier> = match tier_filter {
            Some(requested) => allowed
                .iter()
                .copied()
                .filter(|tier| requested.contains(tier))
                .collect(),
            None => allowed,
        };
        if effective.is_empty() || collections.is_empty() {
            return Ok(RetrievalOutput {
                outcome: RerankOutcome::Reranked(Vec::new()),
                collections: collections.to_vec(),
                total_candidates: 0,
            });
        }

        let vectors = self.embedder.embed(&[query.to_string()]).await?;
        let vector = vectors.into_iter().next().ok_or_else(|| {
            EngineError::Embedding("embedding provider returned no vector for the query".to_string())
        })?;

        let fetch_limit = top_k.saturating_mul(self.config.overfetch_factor);
        let storage_filter = self
            .config
            .prefilter_enabled
            .then(|| SearchFilter::for_tiers(effective.clone()));

        let searches = collections.iter().map(|&collection| {
            let vector = &vector;
            let filter = storage_filter.as_ref();
            async move { self.store.query(collection, vector, fetch_limit, filter).await }
        });
        let pools = join_all(searches).await;

        let mut candidates: Vec<Candidate> = Vec::new();
        for (collection, pool) in collections.iter().zip(pools) {
            for chunk in pool? {
                candidates.push(Candidate {
                    chunk,
                    source: *collection,
                });
            }
        }
        let fetched = candidates.len();

        // Ground truth, applied identically whether or not the store
        // already filtered: effective tier set plus every topic gate.
        let accessible: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| {
                effective.contains(&candidate.chunk.metadata.tier)
                    && self.policy.can_access(caller_level, candidate)
            })
            .collect();
        debug!(
            fetched,
            accessible = accessible.len(),
            caller_level = %caller_level,
            "stage A candidates filtered"
        );

        let total_candidates = accessible.len();
        let outcome = self.reranker.rank(query, accessible, top_k).await;
        Ok(RetrievalOutput {
            outcome,
            collections: collections.to_vec(),
            total_candidates,
        })
    }
}
