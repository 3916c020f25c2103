//! Stage B: precision reranking with graceful degradation
//!
//! Candidates that survived access filtering are scored pairwise against
//! the query. When the scorer misbehaves in any way the stage falls back
//! to similarity order and says so; a broken reranker may cost quality
//! but never an answer.

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::providers::RerankProvider;
use crate::routing::KnowledgeCollection;
use crate::store::{ChunkMetadata, HasMetadata, ScoredChunk};

/// A filtered stage-A hit tagged with the pool it came from.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chunk: ScoredChunk,
    pub source: KnowledgeCollection,
}

impl HasMetadata for Candidate {
    fn metadata(&self) -> &ChunkMetadata {
        &self.chunk.metadata
    }
}

/// One result as served to callers.
#[derive(Debug, Clone, Serialize)]
pub struct RankedResult {
    pub id: Uuid,
    pub text: String,
    /// Relevance in [0, 1]; the fallback constant when degraded.
    pub score: f64,
    /// Collection the chunk was retrieved from.
    pub source: KnowledgeCollection,
    pub metadata: ChunkMetadata,
}

impl HasMetadata for RankedResult {
    fn metadata(&self) -> &ChunkMetadata {
        &self.metadata
    }
}

/// Outcome of stage B: either properly reranked or degraded with a reason.
#[derive(Debug, Clone)]
pub enum RerankOutcome {
    Reranked(Vec<RankedResult>),
    Degraded {
        results: Vec<RankedResult>,
        reason: String,
    },
}

impl RerankOutcome {
    pub fn results(&self) -> &[RankedResult] {
        match self {
            RerankOutcome::Reranked(results) => results,
            RerankOutcome::Degraded { results, .. } => results,
        }
    }

    pub fn into_results(self) -> Vec<RankedResult> {
        match self {
            RerankOutcome::Reranked(results) => results,
            RerankOutcome::Degraded { results, .. } => results,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, RerankOutcome::Degraded { .. })
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            RerankOutcome::Reranked(_) => None,
            RerankOutcome::Degraded { reason, .. } => Some(reason),
        }
    }
}

/// Stage B executor.
pub struct Reranker {
    provider: Arc<dyn RerankProvider>,
    fallback_score: f64,
}

impl Reranker {
    pub fn new(provider: Arc<dyn RerankProvider>, fallback_score: f64) -> Self {
        Self {
            provider,
            fallback_score,
        }
    }

    /// Scores and orders candidates, keeping the best `top_k`.
    ///
    /// Never fails: provider errors and malformed score sets degrade to
    /// similarity order with the fallback score.
    pub async fn rank(&self, query: &str, candidates: Vec<Candidate>, top_k: usize) -> RerankOutcome {
        if candidates.is_empty() {
            return RerankOutcome::Reranked(Vec::new());
        }

        let texts: Vec<String> = candidates.iter().map(|c| c.chunk.text.clone()).collect();
        match self.provider.rerank(query, &texts).await {
            Ok(scores) if scores.len() == candidates.len() => {
                let mut results: Vec<RankedResult> = candidates
                    .into_iter()
                    .zip(scores)
                    .map(|(candidate, score)| to_result(candidate, sanitize_score(score)))
                    .collect();
                results.sort_by(|a, b| {
                    b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal)
                });
                results.truncate(top_k);
                RerankOutcome::Reranked(results)
            }
            Ok(scores) => {
                let reason = format!(
                    "rerank provider returned {} scores for {} candidates",
                    scores.len(),
                    candidates.len()
                );
                warn!(reason = %reason, "degrading to similarity order");
                RerankOutcome::Degraded {
                    results: self.similarity_order(candidates, top_k),
                    reason,
                }
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(error = %reason, "rerank failed, degrading to similarity order");
                RerankOutcome::Degraded {
                    results: self.similarity_order(candidates, top_k),
                    reason,
                }
            }
        }
    }

    fn similarity_order(&self, mut candidates: Vec<Candidate>, top_k: usize) -> Vec<RankedResult> {
        candidates.sort_by(|a, b| {
            b.chunk
                .similarity
                .partial_cmp(&a.chunk.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(top_k);
        candidates
            .into_iter()
            .map(|candidate| {
                let score = self.fallback_score;
                to_result(candidate, score)
            })
            .collect()
    }
}

fn sanitize_score(score: f32) -> f64 {
    if score.is_finite() {
        (score as f64).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn to_result(candidate: Candidate, score: f64) -> RankedResult {
    RankedResult {
        id: candidate.chunk.id,
        text: candidate.chunk.text,
        score,
        source: candidate.source,
        metadata: candidate.chunk.metadata,
    }
}
