//! External collaborators
//!
//! Parsing, embedding and reranking live behind async trait seams so the
//! engine never depends on a concrete service. Components:
//! - Parser: source-to-text conversion
//! - Embedding: batch text-to-vector provider
//! - Reranker: pairwise relevance scorer
//! - Retry: bounded backoff shared by ingestion-side provider calls

pub mod embedding;
pub mod parser;
pub mod reranker;
pub mod retry;

pub use embedding::{EmbeddingProvider, HttpEmbedding};
pub use parser::{DocumentParser, DocumentSource, ParsedDocument, PlainTextParser, SourceOrigin};
pub use reranker::{HttpReranker, RerankProvider};
pub use retry::RetryManager;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};

/// Endpoints and limits for the external providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Ollama-compatible embed API.
    #[serde(default = "default_embedding_url")]
    pub embedding_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Vector width the store collections are created with.
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,
    /// Rerank endpoint.
    #[serde(default = "default_rerank_url")]
    pub rerank_url: String,
    /// Model name passed to the rerank endpoint, if it wants one.
    #[serde(default)]
    pub rerank_model: Option<String>,
    /// Qdrant gRPC endpoint.
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
    /// Deadline applied to every provider and store call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            embedding_url: default_embedding_url(),
            embedding_model: default_embedding_model(),
            embedding_dimension: default_embedding_dimension(),
            rerank_url: default_rerank_url(),
            rerank_model: None,
            qdrant_url: default_qdrant_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.embedding_url.trim().is_empty()
            || self.rerank_url.trim().is_empty()
            || self.qdrant_url.trim().is_empty()
        {
            return Err(EngineError::Config("provider URLs must not be empty".to_string()));
        }
        if self.embedding_dimension == 0 {
            return Err(EngineError::Config(
                "embedding_dimension must be positive".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(EngineError::Config("timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}

fn default_embedding_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_dimension() -> usize {
    768
}

fn default_rerank_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_qdrant_url() -> String {
    "http://127.0.0.1:6334".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ProviderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let config = ProviderConfig {
            embedding_dimension: 0,
            ..ProviderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_url_rejected() {
        let config = ProviderConfig {
            qdrant_url: " ".to_string(),
            ..ProviderConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
