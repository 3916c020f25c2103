//! Engine facade
//!
//! [`KnowledgeEngine`] wires configuration, providers, storage, ingestion
//! and retrieval into one object. Searches route to a collection, retrieve
//! under the caller's clearance and always come back as a
//! [`SearchResponse`], degraded rather than failed when a stage breaks.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use crate::config::EngineConfig;
use crate::errors::Result;
use crate::ingest::{Chunker, IngestPipeline, IngestReport, TierClassifier};
use crate::policy::{AccessLevel, AccessPolicy, Tier};
use crate::providers::{
    DocumentParser, DocumentSource, EmbeddingProvider, HttpEmbedding, HttpReranker,
    PlainTextParser, RerankProvider,
};
use crate::retrieval::{RankedResult, RetrievalEngine};
use crate::routing::{DomainRouter, KnowledgeCollection};
use crate::store::{QdrantStore, VectorStore};

/// Optional knobs for one search call.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Result count; 0 means the configured default.
    pub top_k: usize,
    /// Only serve these tiers (always intersected with clearance).
    pub tier_filter: Option<Vec<Tier>>,
    /// Search these collections instead of routing the query.
    pub collections: Option<Vec<KnowledgeCollection>>,
}

/// What one search returned.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<RankedResult>,
    /// Accessible candidates found before truncation to top_k.
    pub total_found: usize,
    /// Collections that were searched.
    pub collections: Vec<KnowledgeCollection>,
    /// True when results are in similarity order instead of reranked.
    pub degraded: bool,
    pub degraded_reason: Option<String>,
    pub execution_time_ms: u64,
}

impl SearchResponse {
    fn empty(collections: Vec<KnowledgeCollection>, reason: String, started: Instant) -> Self {
        Self {
            results: Vec::new(),
            total_found: 0,
            collections,
            degraded: true,
            degraded_reason: Some(reason),
            execution_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Per-collection point count.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub collection: KnowledgeCollection,
    pub points: u64,
}

/// Liveness of the engine's external collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub store_healthy: bool,
    pub store_error: Option<String>,
    pub embedder_healthy: bool,
    pub embedder_error: Option<String>,
}

impl HealthReport {
    pub fn healthy(&self) -> bool {
        self.store_healthy && self.embedder_healthy
    }
}

/// The assembled engine.
pub struct KnowledgeEngine {
    config: EngineConfig,
    router: Arc<DomainRouter>,
    policy: Arc<AccessPolicy>,
    pipeline: IngestPipeline,
    retrieval: RetrievalEngine,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl KnowledgeEngine {
    /// Connects to the configured external services and prepares the
    /// vector collections.
    pub async fn connect(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let providers = &config.providers;

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HttpEmbedding::new(
            &providers.embedding_url,
            &providers.embedding_model,
            providers.embedding_dimension,
            providers.timeout_ms,
        )?);
        let reranker: Arc<dyn RerankProvider> = Arc::new(HttpReranker::new(
            &providers.rerank_url,
            providers.rerank_model.as_deref(),
            providers.timeout_ms,
        )?);
        let store = QdrantStore::connect(&providers.qdrant_url, providers.timeout_ms)?;
        store.ensure_collections(providers.embedding_dimension).await?;

        Self::with_components(
            config,
            Arc::new(PlainTextParser::new()),
            embedder,
            reranker,
            Arc::new(store),
        )
    }

    /// Assembles the engine from caller-supplied collaborators. This is
    /// the seam for tests and for embedding the engine with custom
    /// parsers, models or storage.
    pub fn with_components(
        config: EngineConfig,
        parser: Arc<dyn DocumentParser>,
        embedder: Arc<dyn EmbeddingProvider>,
        rerank_provider: Arc<dyn RerankProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        config.validate()?;

        let policy = Arc::new(AccessPolicy::from_config(&config.policy)?);
        let router = Arc::new(DomainRouter::from_config(&config.router));
        let chunker = Chunker::from_config(&config.chunker)?;
        let classifier = TierClassifier::from_config(&config.classifier)?;

        let pipeline = IngestPipeline::new(
            parser,
            embedder.clone(),
            store.clone(),
            router.clone(),
            chunker,
            classifier,
            config.ingest.clone(),
        )?;
        let retrieval = RetrievalEngine::new(
            store.clone(),
            embedder.clone(),
            rerank_provider,
            policy.clone(),
            config.retrieval.clone(),
        )?;

        Ok(Self {
            config,
            router,
            policy,
            pipeline,
            retrieval,
            store,
            embedder,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Collection the router would send this query to.
    pub fn route(&self, query: &str) -> KnowledgeCollection {
        self.router.route(query)
    }

    /// Ingests one document, reporting the outcome instead of failing.
    pub async fn ingest(&self, source: DocumentSource) -> IngestReport {
        self.pipeline.ingest(source).await
    }

    /// Ingests a batch with bounded concurrency; reports come back in
    /// input order.
    pub async fn ingest_batch(&self, sources: Vec<DocumentSource>) -> Vec<IngestReport> {
        self.pipeline.ingest_batch(sources).await
    }

    /// Searches with defaults: routed collection, no tier filter.
    pub async fn search(
        &self,
        query: &str,
        caller_level: AccessLevel,
        top_k: usize,
    ) -> SearchResponse {
        self.search_with_options(
            query,
            caller_level,
            SearchOptions {
                top_k,
                ..SearchOptions::default()
            },
        )
        .await
    }

    /// Full search entry point. Infrastructure failures degrade to an
    /// empty response instead of surfacing as errors; access rules are
    /// enforced inside retrieval regardless of the options given.
    pub async fn search_with_options(
        &self,
        query: &str,
        caller_level: AccessLevel,
        options: SearchOptions,
    ) -> SearchResponse {
        let started = Instant::now();
        let collections = match &options.collections {
            Some(explicit) if !explicit.is_empty() => explicit.clone(),
            _ => vec![self.router.route(query)],
        };

        let output = match self
            .retrieval
            .retrieve_multi(
                query,
                caller_level,
                options.top_k,
                &collections,
                options.tier_filter.as_deref(),
            )
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "search failed, serving empty degraded response");
                return SearchResponse::empty(collections, e.to_string(), started);
            }
        };

        let degraded = output.outcome.is_degraded();
        let degraded_reason = output.outcome.degraded_reason().map(|r| r.to_string());
        SearchResponse {
            results: output.outcome.into_results(),
            total_found: output.total_candidates,
            collections: output.collections,
            degraded,
            degraded_reason,
            execution_time_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Point counts for every knowledge collection.
    pub async fn collection_stats(&self) -> Result<Vec<CollectionStats>> {
        let mut stats = Vec::with_capacity(KnowledgeCollection::ALL.len());
        for collection in KnowledgeCollection::ALL {
            let points = self.store.collection_size(collection).await?;
            stats.push(CollectionStats { collection, points });
        }
        Ok(stats)
    }

    /// Probes the store and the embedding provider.
    pub async fn health(&self) -> HealthReport {
        let store = self.store.healthcheck().await;
        let embedder = self.embedder.embed(&["healthcheck".to_string()]).await;
        HealthReport {
            store_healthy: store.is_ok(),
            store_error: store.err().map(|e| e.to_string()),
            embedder_healthy: embedder.is_ok(),
            embedder_error: embedder.err().map(|e| e.to_string()),
        }
    }
}
