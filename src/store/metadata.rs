//! Typed chunk metadata
//!
//! Every stored chunk carries one [`ChunkMetadata`] record. The access
//! fields (`tier`, `min_access_level`, `topics`) travel with the chunk into
//! the vector store payload, so filtering never needs a side lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{EngineError, Result};
use crate::policy::{AccessLevel, Tier};
use crate::routing::KnowledgeCollection;

/// Metadata attached to a single stored chunk.
///
/// `min_access_level` is derived from `tier` at construction and checked
/// again whenever a record is decoded from storage, so a forged or stale
/// payload cannot smuggle a too-low requirement past the filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Stable identifier of the source document.
    pub document_id: String,
    /// Human-readable document title.
    pub title: String,
    /// Position of this chunk within the document, 0-based.
    pub chunk_index: usize,
    /// Number of chunks the document produced at ingestion time.
    pub total_chunks: usize,
    /// Confidentiality tier of the source document.
    pub tier: Tier,
    /// Cached clearance requirement, always `tier.min_access_level()`.
    min_access_level: AccessLevel,
    /// Curator-assigned topic tags, normalized to lowercase.
    pub topics: BTreeSet<String>,
    /// BCP-47 style language tag of the source text.
    pub language: String,
    /// Collection the chunk was stored under.
    pub collection: KnowledgeCollection,
    /// When the chunk was written.
    pub ingested_at: DateTime<Utc>,
}

impl ChunkMetadata {
    /// Builds a consistent record; topic tags are lowercased and deduplicated.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        document_id: impl Into<String>,
        title: impl Into<String>,
        chunk_index: usize,
        total_chunks: usize,
        tier: Tier,
        topics: impl IntoIterator<Item = String>,
        language: impl Into<String>,
        collection: KnowledgeCollection,
    ) -> Self {
        let topics = topics
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            document_id: document_id.into(),
            title: title.into(),
            chunk_index,
            total_chunks,
            tier,
            min_access_level: tier.min_access_level(),
            topics,
            language: language.into(),
            collection,
            ingested_at: Utc::now(),
        }
    }

    /// Clearance required to read this chunk.
    pub fn min_access_level(&self) -> AccessLevel {
        self.min_access_level
    }

    /// Rejects records whose stored fields contradict each other.
    ///
    /// Called on every decode from the vector store payload.
    pub fn validate(&self) -> Result<()> {
        if self.document_id.trim().is_empty() {
            return Err(EngineError::VectorStore(
                "chunk metadata missing document_id".to_string(),
            ));
        }
        if self.min_access_level != self.tier.min_access_level() {
            return Err(EngineError::VectorStore(format!(
                "chunk {}#{} stores min_access_level {} but tier {} requires {}",
                self.document_id,
                self.chunk_index,
                self.min_access_level,
                self.tier,
                self.tier.min_access_level()
            )));
        }
        if self.chunk_index >= self.total_chunks {
            return Err(EngineError::VectorStore(format!(
                "chunk {}#{} out of range (total {})",
                self.document_id, self.chunk_index, self.total_chunks
            )));
        }
        Ok(())
    }
}

/// Anything that carries chunk metadata and can therefore be access-filtered.
pub trait HasMetadata {
    fn metadata(&self) -> &ChunkMetadata;
}

impl HasMetadata for ChunkMetadata {
    fn metadata(&self) -> &ChunkMetadata {
        self
    }
}
