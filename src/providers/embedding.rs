//! Embedding provider
//!
//! The engine embeds text through the [`EmbeddingProvider`] seam. The
//! production implementation speaks the Ollama embed API; tests substitute
//! deterministic in-process providers.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::errors::{EngineError, Result};

/// Batch text-to-vector seam.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Vector width this provider produces.
    fn dimension(&self) -> usize;

    /// Embeds a batch, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// HTTP embedding client for an Ollama-compatible endpoint.
pub struct HttpEmbedding {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
    timeout_ms: u64,
}

impl HttpEmbedding {
    /// Create a new embedding client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the embed API (default: http://127.0.0.1:11434)
    /// * `model` - Embedding model name
    /// * `dimension` - Expected vector width; responses are checked against it
    pub fn new(base_url: &str, model: &str, dimension: usize, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimension,
            timeout_ms,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> EngineError {
        if e.is_timeout() {
            EngineError::Timeout {
                duration_ms: self.timeout_ms,
            }
        } else {
            EngineError::Embedding(format!("embed request failed: {e}"))
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedding {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.model,
                "input": texts,
            }))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(EngineError::Embedding(format!(
                "embed API error: {}",
                response.status()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Embedding(format!("failed to parse embed response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EngineError::Embedding(format!(
                "embed API returned {} vectors for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        for vector in &parsed.embeddings {
            if vector.len() != self.dimension {
                return Err(EngineError::Embedding(format!(
                    "embed API returned width {} but model {} is configured for {}",
                    vector.len(),
                    self.model,
                    self.dimension
                )));
            }
        }
        Ok(parsed.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = HttpEmbedding::new("http://127.0.0.1:11434/", "nomic-embed-text", 768, 1000)
            .unwrap();
        assert_eq!(provider.base_url, "http://127.0.0.1:11434");
        assert_eq!(provider.dimension(), 768);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_network() {
        // Unroutable port: would error if a request were attempted.
        let provider = HttpEmbedding::new("http://127.0.0.1:1", "m", 4, 50).unwrap();
        let vectors = provider.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    #[ignore] // Integration test - requires Ollama
    async fn test_embed_against_live_endpoint() {
        let provider =
            HttpEmbedding::new("http://127.0.0.1:11434", "nomic-embed-text", 768, 30_000).unwrap();
        let vectors = provider
            .embed(&["residence permits".to_string(), "tax declarations".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 768);
    }
}
