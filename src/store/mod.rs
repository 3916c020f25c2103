//! Vector storage
//!
//! The engine talks to storage through the [`VectorStore`] trait only.
//! Components:
//! - Metadata: the typed payload attached to every chunk
//! - Qdrant Store: production backend over named collections
//! - In-Memory Store: exact-scan backend for tests and small deployments

pub mod memory;
pub mod metadata;
pub mod qdrant;

pub use memory::InMemoryStore;
pub use metadata::{ChunkMetadata, HasMetadata};
pub use qdrant::QdrantStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::Result;
use crate::policy::Tier;
use crate::routing::KnowledgeCollection;

// Fixed namespace for deterministic chunk point ids.
const CHUNK_ID_NAMESPACE: Uuid = Uuid::from_u128(0x7c9e_4f21_a85d_4b7e_9f03_d2c6_51e8_a94b);

/// Deterministic point id for a chunk: same document and position always
/// map to the same id, so re-ingestion overwrites instead of duplicating.
pub fn chunk_point_id(document_id: &str, chunk_index: usize) -> Uuid {
    let name = format!("{document_id}:{chunk_index}");
    Uuid::new_v5(&CHUNK_ID_NAMESPACE, name.as_bytes())
}

/// A chunk ready to be written: id, text, embedding and metadata.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: Uuid,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

impl ChunkRecord {
    /// Builds a record whose id is derived from the metadata identity.
    pub fn new(text: impl Into<String>, vector: Vec<f32>, metadata: ChunkMetadata) -> Self {
        let id = chunk_point_id(&metadata.document_id, metadata.chunk_index);
        Self {
            id,
            text: text.into(),
            vector,
            metadata,
        }
    }
}

impl HasMetadata for ChunkRecord {
    fn metadata(&self) -> &ChunkMetadata {
        &self.metadata
    }
}

/// A nearest-neighbour hit returned by a store.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: Uuid,
    pub text: String,
    /// Cosine similarity to the query vector.
    pub similarity: f32,
    pub metadata: ChunkMetadata,
}

impl HasMetadata for ScoredChunk {
    fn metadata(&self) -> &ChunkMetadata {
        &self.metadata
    }
}

/// Storage-side filter pushed into a search. Absent fields do not
/// constrain; this is the recall optimization, never the access authority.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Restrict hits to these tiers.
    pub tiers: Option<Vec<Tier>>,
    /// Restrict hits to one source document.
    pub document_id: Option<String>,
}

impl SearchFilter {
    pub fn for_tiers(tiers: Vec<Tier>) -> Self {
        Self {
            tiers: Some(tiers),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_none() && self.document_id.is_none()
    }
}

/// Storage backend seam. Implementations must keep upserts atomic per
/// call: either every record lands or the call errors.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Writes or overwrites the given records in one collection.
    async fn upsert(&self, collection: KnowledgeCollection, records: Vec<ChunkRecord>) -> Result<()>;

    /// Nearest-neighbour search, best match first.
    async fn query(
        &self,
        collection: KnowledgeCollection,
        vector: &[f32],
        limit: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredChunk>>;

    /// Deletes all chunks of `document_id` with `chunk_index >= from_index`.
    /// Used to drop the stale tail when a re-ingested document shrinks.
    async fn remove_chunks_from(
        &self,
        collection: KnowledgeCollection,
        document_id: &str,
        from_index: usize,
    ) -> Result<()>;

    /// Number of chunks currently stored for one document.
    async fn document_chunk_count(
        &self,
        collection: KnowledgeCollection,
        document_id: &str,
    ) -> Result<u64>;

    /// Total points in one collection.
    async fn collection_size(&self, collection: KnowledgeCollection) -> Result<u64>;

    /// Cheap liveness probe against the backend.
    async fn healthcheck(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_point_id_is_deterministic() {
        let a = chunk_point_id("doc-9", 4);
        let b = chunk_point_id("doc-9", 4);
        assert_eq!(a, b);
    }

    #[test]
    fn test_chunk_point_id_distinguishes_position_and_document() {
        let base = chunk_point_id("doc-9", 4);
        assert_ne!(base, chunk_point_id("doc-9", 5));
        assert_ne!(base, chunk_point_id("doc-8", 4));
    }

    #[test]
    fn test_record_id_follows_metadata() {
        let meta = ChunkMetadata::new(
            "doc-1",
            "t",
            2,
            5,
            Tier::Public,
            Vec::new(),
            "en",
            KnowledgeCollection::Reference,
        );
        let record = ChunkRecord::new("body", vec![0.0; 4], meta);
        assert_eq!(record.id, chunk_point_id("doc-1", 2));
    }
}
