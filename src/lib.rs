//! LexVault v0.4.0 - Tiered Knowledge-Retrieval Engine
//!
//! A clearance-aware retrieval engine: documents are chunked, classified
//! into confidentiality tiers and stored per domain collection; queries
//! are routed, retrieved and reranked under the caller's access level so
//! above-clearance content is never served.
//!
//! # Architecture
//!
//! - **Ingestion**: parse, classify, chunk, embed and store with per-document reports
//! - **Policy**: tier clearance plus independent topic sensitivity gates
//! - **Retrieval**: two-stage recall-then-rerank with graceful degradation

pub mod config;
pub mod errors;
pub mod ingest;
pub mod policy;
pub mod providers;
pub mod retrieval;
pub mod routing;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use config::EngineConfig;
pub use errors::{EngineError, Result};
pub use ingest::{IngestFailure, IngestReport};
pub use policy::{AccessLevel, Tier};
pub use providers::DocumentSource;
pub use retrieval::RankedResult;
pub use routing::KnowledgeCollection;
pub use service::{KnowledgeEngine, SearchOptions, SearchResponse};
