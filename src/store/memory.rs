//! In-memory vector store
//!
//! Exact cosine scan over a per-collection map. Backs tests and small
//! single-process deployments; behaviour mirrors the Qdrant backend so the
//! two are interchangeable behind [`VectorStore`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::errors::{EngineError, Result};
use crate::routing::KnowledgeCollection;
use crate::store::{ChunkRecord, ScoredChunk, SearchFilter, VectorStore};

#[derive(Debug, Clone)]
struct StoredPoint {
    text: String,
    vector: Vec<f32>,
    metadata: crate::store::ChunkMetadata,
}

/// Process-local store keyed by collection, then point id.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<KnowledgeCollection, HashMap<Uuid, StoredPoint>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<KnowledgeCollection, HashMap<Uuid, StoredPoint>>>>
    {
        self.collections
            .read()
            .map_err(|_| EngineError::VectorStore("store lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<KnowledgeCollection, HashMap<Uuid, StoredPoint>>>>
    {
        self.collections
            .write()
            .map_err(|_| EngineError::VectorStore("store lock poisoned".to_string()))
    }
}

/// Cosine similarity; mismatched or zero-magnitude vectors score 0.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn matches_filter(point: &StoredPoint, filter: Option<&SearchFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    if let Some(tiers) = &filter.tiers {
        if !tiers.contains(&point.metadata.tier) {
            return false;
        }
    }
    if let Some(document_id) = &filter.document_id {
        if &point.metadata.document_id != document_id {
            return false;
        }
    }
    true
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert(&self, collection: KnowledgeCollection, records: Vec<ChunkRecord>) -> Result<()> {
        for record in &records {
            record.metadata.validate()?;
        }
        let mut guard = self.write()?;
        let points = guard.entry(collection).or_default();
        for record in records {
            points.insert(
                record.id,
                StoredPoint {
                    text: record.text,
                    vector: record.vector,
                    metadata: record.metadata,
                },
            );
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: KnowledgeCollection,
        vector: &[f32],
        limit: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        let guard = self.read()?;
        let mut hits: Vec<ScoredChunk> = guard
            .get(&collection)
            .into_iter()
            .flat_map(|points| points.iter())
            .filter(|(_, point)| matches_filter(point, filter))
            .map(|(id, point)| ScoredChunk {
                id: *id,
                text: point.text.clone(),
                similarity: cosine_similarity(vector, &point.vector),
                metadata: point.metadata.clone(),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn remove_chunks_from(
        &self,
        collection: KnowledgeCollection,
        document_id: &str,
        from_index: usize,
    ) -> Result<()> {
        let mut guard = self.write()?;
        if let Some(points) = guard.get_mut(&collection) {
            points.retain(|_, point| {
                !(point.metadata.document_id == document_id
                    && point.metadata.chunk_index >= from_index)
            });
        }
        Ok(())
    }

    async fn document_chunk_count(
        &self,
        collection: KnowledgeCollection,
        document_id: &str,
    ) -> Result<u64> {
        let guard = self.read()?;
        let count = guard
            .get(&collection)
            .map(|points| {
                points
                    .values()
                    .filter(|point| point.metadata.document_id == document_id)
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn collection_size(&self, collection: KnowledgeCollection) -> Result<u64> {
        let guard = self.read()?;
        Ok(guard.get(&collection).map(|points| points.len()).unwrap_or(0) as u64)
    }

    async fn healthcheck(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Tier;
    use crate::store::ChunkMetadata;

    fn record(doc: &str, index: usize, total: usize, tier: Tier, vector: Vec<f32>) -> ChunkRecord {
        let metadata = ChunkMetadata::new(
            doc,
            "title",
            index,
            total,
            tier,
            Vec::new(),
            "en",
            KnowledgeCollection::Legal,
        );
        ChunkRecord::new(format!("{doc} chunk {index}"), vector, metadata)
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity() {
        let store = InMemoryStore::new();
        store
            .upsert(
                KnowledgeCollection::Legal,
                vec![
                    record("a", 0, 1, Tier::Public, vec![1.0, 0.0]),
                    record("b", 0, 1, Tier::Public, vec![0.0, 1.0]),
                    record("c", 0, 1, Tier::Public, vec![0.7, 0.7]),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .query(KnowledgeCollection::Legal, &[1.0, 0.0], 10, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].metadata.document_id, "a");
        assert_eq!(hits[1].metadata.document_id, "c");
        assert!(hits[0].similarity >= hits[1].similarity);
    }

    #[tokio::test]
    async fn test_tier_filter_restricts_hits() {
        let store = InMemoryStore::new();
        store
            .upsert(
                KnowledgeCollection::Legal,
                vec![
                    record("pub", 0, 1, Tier::Public, vec![1.0, 0.0]),
                    record("sec", 0, 1, Tier::Secret, vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let filter = SearchFilter::for_tiers(vec![Tier::Public]);
        let hits = store
            .query(KnowledgeCollection::Legal, &[1.0, 0.0], 10, Some(&filter))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.tier, Tier::Public);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_position() {
        let store = InMemoryStore::new();
        store
            .upsert(
                KnowledgeCollection::Legal,
                vec![record("doc", 0, 1, Tier::Public, vec![1.0, 0.0])],
            )
            .await
            .unwrap();
        store
            .upsert(
                KnowledgeCollection::Legal,
                vec![record("doc", 0, 1, Tier::Public, vec![0.0, 1.0])],
            )
            .await
            .unwrap();

        assert_eq!(
            store
                .document_chunk_count(KnowledgeCollection::Legal, "doc")
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_remove_stale_tail() {
        let store = InMemoryStore::new();
        let records = (0..4)
            .map(|i| record("doc", i, 4, Tier::Public, vec![1.0, 0.0]))
            .collect();
        store.upsert(KnowledgeCollection::Legal, records).await.unwrap();

        store
            .remove_chunks_from(KnowledgeCollection::Legal, "doc", 2)
            .await
            .unwrap();
        assert_eq!(
            store
                .document_chunk_count(KnowledgeCollection::Legal, "doc")
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_collection_isolation() {
        let store = InMemoryStore::new();
        store
            .upsert(
                KnowledgeCollection::Legal,
                vec![record("doc", 0, 1, Tier::Public, vec![1.0])],
            )
            .await
            .unwrap();

        assert_eq!(store.collection_size(KnowledgeCollection::Legal).await.unwrap(), 1);
        assert_eq!(store.collection_size(KnowledgeCollection::Tax).await.unwrap(), 0);
        let hits = store
            .query(KnowledgeCollection::Tax, &[1.0], 10, None)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        let aligned = cosine_similarity(&[0.5, 0.5], &[1.0, 1.0]);
        assert!((aligned - 1.0).abs() < 1e-6);
    }
}
