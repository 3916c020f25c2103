//! Integration tests for the ingestion pipeline through the public API.
//!
//! Runs the full parse, classify, chunk, embed, store flow against the
//! in-memory store, then reads results back through search.

mod common;

use std::sync::Arc;

use common::{degraded_engine_over, engine_over, level};
use lexvault::store::InMemoryStore;
use lexvault::{DocumentSource, IngestFailure, KnowledgeCollection, SearchOptions, Tier};

fn visa_options() -> SearchOptions {
    SearchOptions {
        collections: Some(vec![KnowledgeCollection::Visa]),
        ..SearchOptions::default()
    }
}

#[tokio::test]
async fn test_ingest_then_search_roundtrip() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(store);

    let report = engine
        .ingest(
            DocumentSource::inline(
                "renewal-guide",
                "Residence permit renewal",
                "Renewal applications must reach the migration office thirty \
                 days before the permit expires. Late filings pay a penalty.",
            )
            .with_collection(KnowledgeCollection::Visa),
        )
        .await;
    assert!(report.success, "ingest failed: {:?}", report.error);
    assert!(report.chunks_created >= 1);

    let response = engine
        .search_with_options("penalty for late renewal", level(0), visa_options())
        .await;
    assert!(!response.degraded);
    assert!(!response.results.is_empty());
    assert_eq!(response.results[0].metadata.document_id, "renewal-guide");
    assert!(response.results[0].text.contains("penalty"));
}

#[tokio::test]
async fn test_batch_reports_keep_input_order_and_isolate_failures() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(store);

    let sources = vec![
        DocumentSource::inline("first", "First", "A perfectly fine document.")
            .with_collection(KnowledgeCollection::Reference),
        DocumentSource::inline("broken", "Broken", "   \n  ")
            .with_collection(KnowledgeCollection::Reference),
        DocumentSource::inline("third", "Third", "Another fine document.")
            .with_collection(KnowledgeCollection::Reference),
    ];
    let reports = engine.ingest_batch(sources).await;

    assert_eq!(reports.len(), 3);
    assert_eq!(
        reports.iter().map(|r| r.document_id.as_str()).collect::<Vec<_>>(),
        vec!["first", "broken", "third"]
    );
    assert!(reports[0].success);
    assert!(matches!(reports[1].error, Some(IngestFailure::Parse(_))));
    assert!(reports[2].success);
}

#[tokio::test]
async fn test_reingest_same_document_overwrites_instead_of_duplicating() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(store);

    let source = || {
        DocumentSource::inline("stable-id", "Fee schedule", "Fees are due quarterly.")
            .with_collection(KnowledgeCollection::Tax)
    };
    let first = engine.ingest(source()).await;
    let second = engine.ingest(source()).await;
    assert!(first.success && second.success);

    let stats = engine.collection_stats().await.unwrap();
    let tax = stats
        .iter()
        .find(|s| s.collection == KnowledgeCollection::Tax)
        .unwrap();
    assert_eq!(tax.points, first.chunks_created as u64);
}

#[tokio::test]
async fn test_reingest_shrunken_document_removes_stale_chunks() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(store);

    let long_body = "Each paragraph covers one levy in detail. ".repeat(30);
    let first = engine
        .ingest(
            DocumentSource::inline("levies", "Levy handbook", &long_body)
                .with_collection(KnowledgeCollection::Tax),
        )
        .await;
    assert!(first.chunks_created > 1);

    let second = engine
        .ingest(
            DocumentSource::inline("levies", "Levy handbook", "One levy only.")
                .with_collection(KnowledgeCollection::Tax),
        )
        .await;
    assert!(second.success);

    let stats = engine.collection_stats().await.unwrap();
    let tax = stats
        .iter()
        .find(|s| s.collection == KnowledgeCollection::Tax)
        .unwrap();
    assert_eq!(tax.points, second.chunks_created as u64);
}

#[tokio::test]
async fn test_query_routing_picks_the_domain_collection() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(store);

    engine
        .ingest(
            DocumentSource::inline("vat-rates", "VAT rates", "Standard VAT rate is twenty percent.")
                .with_collection(KnowledgeCollection::Tax),
        )
        .await;
    engine
        .ingest(
            DocumentSource::inline("permits", "Permits", "Work permit rules for foreigners.")
                .with_collection(KnowledgeCollection::Visa),
        )
        .await;

    assert_eq!(engine.route("How is VAT calculated?"), KnowledgeCollection::Tax);

    let response = engine.search("How is VAT calculated?", level(0), 5).await;
    assert_eq!(response.collections, vec![KnowledgeCollection::Tax]);
    assert!(response
        .results
        .iter()
        .all(|r| r.metadata.collection == KnowledgeCollection::Tax));
}

#[tokio::test]
async fn test_classifier_tier_flows_through_to_search() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(store);

    // Untagged document whose text trips the confidential bucket.
    let report = engine
        .ingest(
            DocumentSource::inline(
                "strategy-memo",
                "Appeal memo",
                "Our litigation strategy depends on the forum.",
            )
            .with_collection(KnowledgeCollection::Legal),
        )
        .await;
    assert_eq!(report.tier, Some(Tier::Confidential));

    let legal = SearchOptions {
        collections: Some(vec![KnowledgeCollection::Legal]),
        ..SearchOptions::default()
    };
    let low = engine
        .search_with_options("litigation strategy", level(1), legal.clone())
        .await;
    assert!(low.results.is_empty());

    let cleared = engine
        .search_with_options("litigation strategy", level(2), legal)
        .await;
    assert_eq!(cleared.results.len(), 1);
}

#[tokio::test]
async fn test_search_survives_broken_reranker() {
    let store = Arc::new(InMemoryStore::new());
    let seeder = engine_over(store.clone());
    seeder
        .ingest(
            DocumentSource::inline("doc", "Doc", "Plain reference text.")
                .with_collection(KnowledgeCollection::Reference),
        )
        .await;

    let engine = degraded_engine_over(store);
    let response = engine
        .search_with_options(
            "reference",
            level(0),
            SearchOptions {
                collections: Some(vec![KnowledgeCollection::Reference]),
                ..SearchOptions::default()
            },
        )
        .await;

    assert!(response.degraded);
    assert!(response.degraded_reason.is_some());
    assert_eq!(response.results.len(), 1);
    let fallback = engine.config().retrieval.fallback_score;
    assert!((response.results[0].score - fallback).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_health_report_with_working_collaborators() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(store);

    let health = engine.health().await;
    assert!(health.healthy());
    assert!(health.store_error.is_none());
    assert!(health.embedder_error.is_none());
}

#[tokio::test]
async fn test_file_ingestion_uses_stem_and_heading() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(store);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Company Registry Act.md");
    tokio::fs::write(&path, "# Company Registry Act\n\nArticles of incorporation must be filed.")
        .await
        .unwrap();

    let report = engine
        .ingest(DocumentSource::from_path(&path).with_collection(KnowledgeCollection::Company))
        .await;
    assert!(report.success);
    assert_eq!(report.document_id, "company-registry-act");
    assert_eq!(report.title, "Company Registry Act");
}
