//! Document ingestion
//!
//! Components:
//! - Chunker: boundary-aware text splitting with overlap
//! - Classifier: keyword-based tier assignment
//! - Pipeline: parse, classify, embed and store with per-document reports

pub mod chunker;
pub mod classifier;
pub mod pipeline;

pub use chunker::{ChunkSpan, Chunker, ChunkerConfig};
pub use classifier::{ClassifierConfig, TierBucket, TierClassifier};
pub use pipeline::{IngestConfig, IngestFailure, IngestPipeline, IngestReport};
