//! Two-stage retrieval
//!
//! Stage A recalls broadly and cheaply from the vector store; stage B
//! reorders the survivors precisely. Access filtering sits between the
//! stages so reranking never sees content the caller cannot.
//!
//! Components:
//! - Engine: embed, over-fetch, filter, delegate to stage B
//! - Rerank: pairwise scoring with similarity-order degradation

pub mod engine;
pub mod rerank;

pub use engine::{RetrievalConfig, RetrievalEngine, RetrievalOutput};
pub use rerank::{Candidate, RankedResult, Reranker, RerankOutcome};
