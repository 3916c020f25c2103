//! Rerank provider
//!
//! Pairwise relevance scoring behind the [`RerankProvider`] seam. The
//! production implementation targets a text-embeddings-inference style
//! `/rerank` endpoint. Any failure here is recoverable: retrieval falls
//! back to similarity order instead of erroring.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::errors::{EngineError, Result};

/// Query-document relevance scorer.
#[async_trait]
pub trait RerankProvider: Send + Sync {
    /// Scores each text against the query, returning one score per text
    /// in input order. Scores are expected in [0, 1].
    async fn rerank(&self, query: &str, texts: &[String]) -> Result<Vec<f32>>;
}

#[derive(Debug, Deserialize)]
struct RerankEntry {
    index: usize,
    score: f32,
}

/// HTTP rerank client.
pub struct HttpReranker {
    client: Client,
    base_url: String,
    model: Option<String>,
    timeout_ms: u64,
}

impl HttpReranker {
    pub fn new(base_url: &str, model: Option<&str>, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.map(|m| m.to_string()),
            timeout_ms,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> EngineError {
        if e.is_timeout() {
            EngineError::Timeout {
                duration_ms: self.timeout_ms,
            }
        } else {
            EngineError::Rerank(format!("rerank request failed: {e}"))
        }
    }
}

#[async_trait]
impl RerankProvider for HttpReranker {
    async fn rerank(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut body = json!({
            "query": query,
            "texts": texts,
        });
        if let Some(model) = &self.model {
            body["model"] = json!(model);
        }

        let url = format!("{}/rerank", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(EngineError::Rerank(format!(
                "rerank API error: {}",
                response.status()
            )));
        }

        let entries: Vec<RerankEntry> = response
            .json()
            .await
            .map_err(|e| EngineError::Rerank(format!("failed to parse rerank response: {e}")))?;

        // Responses come back ordered by score; place each entry by index
        // and require full coverage so scores line up with inputs.
        let mut scores = vec![None; texts.len()];
        for entry in entries {
            let slot = scores.get_mut(entry.index).ok_or_else(|| {
                EngineError::Rerank(format!(
                    "rerank API returned index {} for {} inputs",
                    entry.index,
                    texts.len()
                ))
            })?;
            *slot = Some(entry.score);
        }
        scores
            .into_iter()
            .enumerate()
            .map(|(i, score)| {
                score.ok_or_else(|| {
                    EngineError::Rerank(format!("rerank API returned no score for input {i}"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_parsing() {
        let entries: Vec<RerankEntry> =
            serde_json::from_str(r#"[{"index":1,"score":0.9},{"index":0,"score":0.2}]"#).unwrap();
        assert_eq!(entries[0].index, 1);
        assert!((entries[1].score - 0.2).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_network() {
        let reranker = HttpReranker::new("http://127.0.0.1:1", None, 50).unwrap();
        let scores = reranker.rerank("q", &[]).await.unwrap();
        assert!(scores.is_empty());
    }

    #[tokio::test]
    #[ignore] // Integration test - requires a rerank endpoint
    async fn test_rerank_against_live_endpoint() {
        let reranker = HttpReranker::new("http://127.0.0.1:8080", None, 30_000).unwrap();
        let scores = reranker
            .rerank(
                "how to renew a residence permit",
                &[
                    "Residence permits are renewed at the migration office.".to_string(),
                    "The annual tax declaration deadline is in April.".to_string(),
                ],
            )
            .await
            .unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores[0] > scores[1]);
    }
}
