//! Ingestion pipeline
//!
//! Takes a document source through parse, identity resolution, tier
//! classification, collection assignment, chunking, embedding and storage.
//! Every document yields an [`IngestReport`]; one bad document never sinks
//! a batch. Chunk ids are deterministic, so re-ingesting a document
//! overwrites it in place.

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{EngineError, Result};
use crate::ingest::chunker::Chunker;
use crate::ingest::classifier::TierClassifier;
use crate::policy::Tier;
use crate::providers::{DocumentParser, DocumentSource, EmbeddingProvider, RetryManager, SourceOrigin};
use crate::routing::{DomainRouter, KnowledgeCollection};
use crate::store::{ChunkMetadata, ChunkRecord, VectorStore};

// Characters of content handed to the tier classifier and the router.
const CONTENT_SAMPLE_CHARS: usize = 2000;

/// Batch and retry behaviour of ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Documents processed concurrently in a batch.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    /// Attempts per transient provider failure, including the first.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    /// Base backoff delay between attempts.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_concurrency: default_batch_concurrency(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

fn default_batch_concurrency() -> usize {
    4
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

impl IngestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_concurrency == 0 {
            return Err(EngineError::Config("batch_concurrency must be positive".to_string()));
        }
        if self.retry_max_attempts == 0 {
            return Err(EngineError::Config("retry_max_attempts must be positive".to_string()));
        }
        Ok(())
    }
}

/// Which stage a document failed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IngestFailure {
    Parse(String),
    Embedding(String),
    Store(String),
}

/// Per-document ingestion outcome.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub title: String,
    pub success: bool,
    pub chunks_created: usize,
    /// Assigned tier; absent when the document failed before classification.
    pub tier: Option<Tier>,
    /// Target collection; absent when the document failed before assignment.
    pub collection: Option<KnowledgeCollection>,
    pub error: Option<IngestFailure>,
}

impl IngestReport {
    fn success(
        document_id: String,
        title: String,
        chunks_created: usize,
        tier: Tier,
        collection: KnowledgeCollection,
    ) -> Self {
        Self {
            document_id,
            title,
            success: true,
            chunks_created,
            tier: Some(tier),
            collection: Some(collection),
            error: None,
        }
    }

    fn failure(
        document_id: String,
        title: String,
        tier: Option<Tier>,
        collection: Option<KnowledgeCollection>,
        error: IngestFailure,
    ) -> Self {
        Self {
            document_id,
            title,
            success: false,
            chunks_created: 0,
            tier,
            collection,
            error: Some(error),
        }
    }
}

// Identity fields settled from source hints and parsed content.
struct ResolvedDocument {
    id: String,
    title: String,
    author: Option<String>,
    language: String,
}

/// Parse-to-storage orchestrator.
pub struct IngestPipeline {
    parser: Arc<dyn DocumentParser>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    router: Arc<DomainRouter>,
    chunker: Chunker,
    classifier: TierClassifier,
    retry: RetryManager,
    config: IngestConfig,
}

impl IngestPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        parser: Arc<dyn DocumentParser>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        router: Arc<DomainRouter>,
        chunker: Chunker,
        classifier: TierClassifier,
        config: IngestConfig,
    ) -> Result<Self> {
        config.validate()?;
        let retry = RetryManager::with_config(config.retry_max_attempts, config.retry_base_delay_ms);
        Ok(Self {
            parser,
            embedder,
            store,
            router,
            chunker,
            classifier,
            retry,
            config,
        })
    }

    /// Ingests one document. Always returns a report; failures are carried
    /// inside it rather than thrown.
    pub async fn ingest(&self, source: DocumentSource) -> IngestReport {
        let parsed = match self.parser.parse(&source).await {
            Ok(parsed) => parsed,
            Err(e) => {
                let (id, title) = fallback_identity(&source);
                warn!(document_id = %id, error = %e, "document failed to parse");
                return IngestReport::failure(
                    id,
                    title,
                    source.tier,
                    source.collection,
                    IngestFailure::Parse(e.to_string()),
                );
            }
        };

        let document = resolve_document(&source, parsed.title_hint.as_deref());
        let sample: String = parsed.text.chars().take(CONTENT_SAMPLE_CHARS).collect();

        // Curator tags beat the classifier and the router.
        let tier = source.tier.unwrap_or_else(|| {
            self.classifier
                .classify(&document.title, document.author.as_deref(), &sample)
        });
        let collection = source
            .collection
            .unwrap_or_else(|| self.router.route(&format!("{}\n{sample}", document.title)));

        let spans = self.chunker.chunk(&parsed.text);
        if spans.is_empty() {
            return IngestReport::failure(
                document.id,
                document.title,
                Some(tier),
                Some(collection),
                IngestFailure::Parse("document produced no chunks".to_string()),
            );
        }

        let texts: Vec<String> = spans.iter().map(|span| span.text.clone()).collect();
        let vectors = match self
            .retry
            .execute_with_retry(|| self.embedder.embed(&texts))
            .await
        {
            Ok(vectors) if vectors.len() == spans.len() => vectors,
            Ok(vectors) => {
                return IngestReport::failure(
                    document.id,
                    document.title,
                    Some(tier),
                    Some(collection),
                    IngestFailure::Embedding(format!(
                        "provider returned {} vectors for {} chunks",
                        vectors.len(),
                        spans.len()
                    )),
                );
            }
            Err(e) => {
                warn!(document_id = %document.id, error = %e, "embedding failed");
                return IngestReport::failure(
                    document.id,
                    document.title,
                    Some(tier),
                    Some(collection),
                    IngestFailure::Embedding(e.to_string()),
                );
            }
        };

        let total_chunks = spans.len();
        let records: Vec<ChunkRecord> = spans
            .into_iter()
            .zip(vectors)
            .map(|(span, vector)| {
                let metadata = ChunkMetadata::new(
                    document.id.clone(),
                    document.title.clone(),
                    span.index,
                    total_chunks,
                    tier,
                    source.topics.iter().cloned(),
                    document.language.clone(),
                    collection,
                );
                ChunkRecord::new(span.text, vector, metadata)
            })
            .collect();

        if let Err(e) = self
            .retry
            .execute_with_retry(|| self.store.upsert(collection, records.clone()))
            .await
        {
            warn!(document_id = %document.id, error = %e, "storage upsert failed");
            return IngestReport::failure(
                document.id,
                document.title,
                Some(tier),
                Some(collection),
                IngestFailure::Store(e.to_string()),
            );
        }

        // Re-ingestion of a shrunken document leaves stale chunks past the
        // new tail; removal is best effort because the fresh content is
        // already safely stored.
        if let Err(e) = self
            .store
            .remove_chunks_from(collection, &document.id, total_chunks)
            .await
        {
            warn!(document_id = %document.id, error = %e, "stale chunk cleanup failed");
        }

        info!(
            document_id = %document.id,
            chunks = total_chunks,
            tier = %tier,
            collection = %collection,
            "document ingested"
        );
        IngestReport::success(document.id, document.title, total_chunks, tier, collection)
    }

    /// Ingests many documents with bounded concurrency. Reports come back
    /// in input order, one per source, failures included.
    pub async fn ingest_batch(&self, sources: Vec<DocumentSource>) -> Vec<IngestReport> {
        stream::iter(sources.into_iter().map(|source| self.ingest(source)))
            .buffered(self.config.batch_concurrency)
            .collect()
            .await
    }
}

fn resolve_document(source: &DocumentSource, title_hint: Option<&str>) -> ResolvedDocument {
    let stem = match &source.origin {
        SourceOrigin::Path(path) => file_stem(path),
        SourceOrigin::Inline(_) => None,
    };
    let title = source
        .title
        .clone()
        .or_else(|| title_hint.map(|t| t.to_string()))
        .or_else(|| stem.clone())
        .unwrap_or_else(|| "Untitled".to_string());
    let id = source
        .id
        .clone()
        .or(stem)
        .map(|raw| slug(&raw))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    ResolvedDocument {
        id,
        title,
        author: source.author.clone(),
        language: source.language.clone().unwrap_or_else(|| "en".to_string()),
    }
}

// Best-effort identity for reports on documents that never parsed.
fn fallback_identity(source: &DocumentSource) -> (String, String) {
    let stem = match &source.origin {
        SourceOrigin::Path(path) => file_stem(path),
        SourceOrigin::Inline(_) => None,
    };
    let title = source
        .title
        .clone()
        .or_else(|| stem.clone())
        .unwrap_or_else(|| "Untitled".to_string());
    let id = source
        .id
        .clone()
        .or(stem)
        .map(|raw| slug(&raw))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    (id, title)
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

/// Normalizes an identifier: lowercase alphanumerics with single dashes.
fn slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_dash = true;
    for c in raw.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
