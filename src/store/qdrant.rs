//! Qdrant-backed vector store
//!
//! One Qdrant collection per knowledge collection, cosine distance, chunk
//! metadata flattened into the point payload. Every call is bounded by the
//! configured timeout so a stalled backend degrades instead of hanging the
//! engine.

use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        condition::ConditionOneOf, point_id::PointIdOptions, points_selector::PointsSelectorOneOf,
        r#match::MatchValue, value::Kind, vectors_config::Config,
        with_payload_selector::SelectorOptions, Condition, CountPoints, CreateCollection, Distance,
        FieldCondition, Filter, ListValue, Match, PointStruct, PointsSelector, Range, RepeatedStrings,
        SearchPoints, Value as QdrantValue, VectorParams, VectorsConfig, WithPayloadSelector,
    },
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::errors::{EngineError, Result};
use crate::routing::KnowledgeCollection;
use crate::store::{ChunkMetadata, ChunkRecord, ScoredChunk, SearchFilter, VectorStore};

// Payload key reserved for the chunk body next to the metadata fields.
const TEXT_KEY: &str = "text";

/// Vector store backed by a remote Qdrant instance.
pub struct QdrantStore {
    client: QdrantClient,
    timeout: Duration,
}

impl QdrantStore {
    /// Connects to Qdrant at `url`.
    pub fn connect(url: &str, timeout_ms: u64) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| EngineError::VectorStore(format!("failed to create Qdrant client: {e}")))?;
        Ok(Self {
            client,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Creates any missing knowledge collections with the given vector size.
    pub async fn ensure_collections(&self, dimension: usize) -> Result<()> {
        let existing = self
            .bounded("list collections", self.client.list_collections())
            .await?;
        for collection in KnowledgeCollection::ALL {
            let name = collection.as_str();
            if existing.collections.iter().any(|c| c.name == name) {
                continue;
            }
            self.bounded(
                "create collection",
                self.client.create_collection(&CreateCollection {
                    collection_name: name.to_string(),
                    vectors_config: Some(VectorsConfig {
                        config: Some(Config::Params(VectorParams {
                            size: dimension as u64,
                            distance: Distance::Cosine.into(),
                            ..Default::default()
                        })),
                    }),
                    ..Default::default()
                }),
            )
            .await?;
        }
        Ok(())
    }

    /// Runs one client call under the store timeout.
    async fn bounded<T, E, Fut>(&self, context: &str, fut: Fut) -> Result<T>
    where
        E: std::fmt::Display,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(EngineError::VectorStore(format!("{context}: {e}"))),
            Err(_) => Err(EngineError::Timeout {
                duration_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait::async_trait]
impl VectorStore for QdrantStore {
    async fn upsert(&self, collection: KnowledgeCollection, records: Vec<ChunkRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut points = Vec::with_capacity(records.len());
        for record in records {
            record.metadata.validate()?;
            let payload = metadata_to_payload(&record.metadata, &record.text)?;
            points.push(PointStruct::new(record.id.to_string(), record.vector, payload));
        }
        self.bounded(
            "upsert points",
            self.client
                .upsert_points_blocking(collection.as_str(), None, points, None),
        )
        .await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: KnowledgeCollection,
        vector: &[f32],
        limit: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        let search_result = self
            .bounded(
                "search points",
                self.client.search_points(&SearchPoints {
                    collection_name: collection.as_str().to_string(),
                    vector: vector.to_vec(),
                    limit: limit as u64,
                    with_payload: Some(WithPayloadSelector {
                        selector_options: Some(SelectorOptions::Enable(true)),
                    }),
                    filter: filter.and_then(build_filter),
                    ..Default::default()
                }),
            )
            .await?;

        let mut hits = Vec::with_capacity(search_result.result.len());
        for point in search_result.result {
            let id = match point
                .id
                .as_ref()
                .and_then(point_id_to_uuid)
            {
                Some(id) => id,
                None => {
                    warn!(collection = %collection, "dropping hit with non-uuid point id");
                    continue;
                }
            };
            // A payload that fails validation is dropped rather than served;
            // losing a hit is safe, mislabelling one is not.
            match payload_to_metadata(&point.payload) {
                Ok((text, metadata)) => hits.push(ScoredChunk {
                    id,
                    text,
                    similarity: point.score,
                    metadata,
                }),
                Err(e) => warn!(collection = %collection, error = %e, "dropping hit with bad payload"),
            }
        }
        Ok(hits)
    }

    async fn remove_chunks_from(
        &self,
        collection: KnowledgeCollection,
        document_id: &str,
        from_index: usize,
    ) -> Result<()> {
        let filter = Filter {
            must: vec![
                keyword_condition("document_id", document_id),
                Condition {
                    condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                        key: "chunk_index".to_string(),
                        range: Some(Range {
                            gte: Some(from_index as f64),
                            ..Default::default()
                        }),
                        ..Default::default()
                    })),
                },
            ],
            ..Default::default()
        };
        self.bounded(
            "delete points",
            self.client.delete_points(
                collection.as_str(),
                None,
                &PointsSelector {
                    points_selector_one_of: Some(PointsSelectorOneOf::Filter(filter)),
                },
                None,
            ),
        )
        .await?;
        Ok(())
    }

    async fn document_chunk_count(
        &self,
        collection: KnowledgeCollection,
        document_id: &str,
    ) -> Result<u64> {
        let response = self
            .bounded(
                "count points",
                self.client.count(&CountPoints {
                    collection_name: collection.as_str().to_string(),
                    filter: Some(Filter {
                        must: vec![keyword_condition("document_id", document_id)],
                        ..Default::default()
                    }),
                    exact: Some(true),
                    ..Default::default()
                }),
            )
            .await?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn collection_size(&self, collection: KnowledgeCollection) -> Result<u64> {
        let info = self
            .bounded("collection info", self.client.collection_info(collection.as_str()))
            .await?;
        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }

    async fn healthcheck(&self) -> Result<()> {
        self.bounded("health check", self.client.health_check()).await?;
        Ok(())
    }
}

fn keyword_condition(key: &str, value: &str) -> Condition {
    Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: key.to_string(),
            r#match: Some(Match {
                match_value: Some(MatchValue::Keyword(value.to_string())),
            }),
            ..Default::default()
        })),
    }
}

fn build_filter(filter: &SearchFilter) -> Option<Filter> {
    let mut must: Vec<Condition> = Vec::new();
    if let Some(tiers) = &filter.tiers {
        let strings: Vec<String> = tiers.iter().map(|t| t.as_str().to_string()).collect();
        must.push(Condition {
            condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                key: "tier".to_string(),
                r#match: Some(Match {
                    match_value: Some(MatchValue::Keywords(RepeatedStrings { strings })),
                }),
                ..Default::default()
            })),
        });
    }
    if let Some(document_id) = &filter.document_id {
        must.push(keyword_condition("document_id", document_id));
    }
    if must.is_empty() {
        None
    } else {
        Some(Filter {
            must,
            ..Default::default()
        })
    }
}

// Payload codec: ChunkMetadata <-> Qdrant payload map, text stored beside it.

fn metadata_to_payload(
    metadata: &ChunkMetadata,
    text: &str,
) -> Result<HashMap<String, QdrantValue>> {
    let json = serde_json::to_value(metadata)?;
    let JsonValue::Object(fields) = json else {
        return Err(EngineError::VectorStore(
            "chunk metadata did not serialize to an object".to_string(),
        ));
    };
    let mut payload = HashMap::with_capacity(fields.len() + 1);
    for (key, value) in fields {
        payload.insert(key, json_to_qdrant_value(value));
    }
    payload.insert(TEXT_KEY.to_string(), QdrantValue::from(text.to_string()));
    Ok(payload)
}

fn payload_to_metadata(payload: &HashMap<String, QdrantValue>) -> Result<(String, ChunkMetadata)> {
    let text = payload
        .get(TEXT_KEY)
        .and_then(qdrant_value_to_string)
        .ok_or_else(|| EngineError::VectorStore("point payload missing chunk text".to_string()))?;

    let mut fields = serde_json::Map::new();
    for (key, value) in payload {
        if key == TEXT_KEY {
            continue;
        }
        if let Some(json) = qdrant_to_json_value(value) {
            fields.insert(key.clone(), json);
        }
    }
    let metadata: ChunkMetadata = serde_json::from_value(JsonValue::Object(fields))?;
    metadata.validate()?;
    Ok((text, metadata))
}

fn json_to_qdrant_value(json: JsonValue) -> QdrantValue {
    match json {
        JsonValue::String(s) => QdrantValue::from(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                QdrantValue::from(i)
            } else if let Some(f) = n.as_f64() {
                QdrantValue::from(f)
            } else {
                QdrantValue::from(0)
            }
        }
        JsonValue::Bool(b) => QdrantValue::from(b),
        JsonValue::Array(items) => QdrantValue {
            kind: Some(Kind::ListValue(ListValue {
                values: items.into_iter().map(json_to_qdrant_value).collect(),
            })),
        },
        _ => QdrantValue::from(""),
    }
}

fn qdrant_to_json_value(value: &QdrantValue) -> Option<JsonValue> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(JsonValue::String(s.clone())),
        Kind::IntegerValue(i) => Some(JsonValue::Number((*i).into())),
        Kind::DoubleValue(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
        Kind::BoolValue(b) => Some(JsonValue::Bool(*b)),
        Kind::ListValue(list) => Some(JsonValue::Array(
            list.values.iter().filter_map(qdrant_to_json_value).collect(),
        )),
        _ => None,
    })
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    })
}

fn point_id_to_uuid(point_id: &qdrant_client::qdrant::PointId) -> Option<Uuid> {
    match &point_id.point_id_options {
        Some(PointIdOptions::Uuid(u)) => Uuid::parse_str(u).ok(),
        _ => None,
    }
}
