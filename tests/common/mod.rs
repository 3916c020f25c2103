//! Shared test collaborators
//!
//! Deterministic in-process stand-ins for the embedding and rerank
//! services, plus engine builders wired to the in-memory store.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;

use lexvault::providers::{EmbeddingProvider, PlainTextParser, RerankProvider};
use lexvault::store::InMemoryStore;
use lexvault::{AccessLevel, EngineConfig, EngineError, KnowledgeEngine, Result};

/// Deterministic embedder: same text always maps to the same unit vector.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self { dimension: 8 }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; self.dimension];
                for (i, b) in text.bytes().enumerate() {
                    v[(i + b as usize) % self.dimension] += 1.0 + (b % 13) as f32;
                }
                let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for x in &mut v {
                        *x /= norm;
                    }
                }
                v
            })
            .collect())
    }
}

/// Scores candidates by how many query words they contain.
pub struct KeywordReranker;

#[async_trait]
impl RerankProvider for KeywordReranker {
    async fn rerank(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let needle = query.to_lowercase();
        let words: Vec<&str> = needle.split_whitespace().collect();
        Ok(texts
            .iter()
            .map(|text| {
                let hay = text.to_lowercase();
                let hits = words.iter().filter(|w| hay.contains(**w)).count();
                hits as f32 / words.len().max(1) as f32
            })
            .collect())
    }
}

/// Always fails, forcing the degraded retrieval path.
pub struct OfflineReranker;

#[async_trait]
impl RerankProvider for OfflineReranker {
    async fn rerank(&self, _query: &str, _texts: &[String]) -> Result<Vec<f32>> {
        Err(EngineError::Rerank("reranker offline".to_string()))
    }
}

/// Config tuned for short test documents and fast retries.
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.chunker.max_chunk_size = 200;
    config.chunker.overlap_size = 20;
    config.ingest.retry_base_delay_ms = 1;
    config
}

pub fn engine_over(store: Arc<InMemoryStore>) -> KnowledgeEngine {
    engine_with(store, test_config(), Arc::new(KeywordReranker))
}

pub fn degraded_engine_over(store: Arc<InMemoryStore>) -> KnowledgeEngine {
    engine_with(store, test_config(), Arc::new(OfflineReranker))
}

pub fn engine_with(
    store: Arc<InMemoryStore>,
    config: EngineConfig,
    reranker: Arc<dyn RerankProvider>,
) -> KnowledgeEngine {
    KnowledgeEngine::with_components(
        config,
        Arc::new(PlainTextParser::new()),
        Arc::new(HashEmbedder::new()),
        reranker,
        store,
    )
    .expect("engine assembly failed")
}

pub fn level(n: u8) -> AccessLevel {
    AccessLevel::new(n).expect("valid test access level")
}
