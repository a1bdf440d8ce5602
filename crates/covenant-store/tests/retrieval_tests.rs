//! Integration tests for covenant-store
//!
//! These tests embed contract passages with the deterministic embedder, store
//! them, and verify retrieval and snapshot persistence.

use covenant_domain::traits::{Embedder, VectorStore};
use covenant_domain::{collection_name_for, Chunk};
use covenant_store::{HashEmbedder, MemoryStore, MemoryStoreConfig};
use tempfile::TempDir;

const PASSAGES: &[&str] = &[
    "The Provider shall ensure system uptime of at least 99.9% measured monthly.",
    "Severity 1 incidents must receive a response within 30 minutes.",
    "Invoices are payable within thirty days of receipt.",
    "Scheduled maintenance windows are excluded from uptime calculations.",
];

async fn populate(store: &MemoryStore, embedder: &HashEmbedder, collection: &str, doc: &str) {
    let texts: Vec<String> = PASSAGES.iter().map(|p| p.to_string()).collect();
    let vectors = embedder.embed(&texts).await.unwrap();
    let chunks = texts
        .into_iter()
        .zip(vectors)
        .enumerate()
        .map(|(i, (text, vector))| Chunk::new(text, vector, doc).with_metadata("chunk_index", i))
        .collect();
    store
        .ensure_collection(collection, embedder.dimension())
        .await
        .unwrap();
    assert_eq!(store.insert(collection, chunks).await.unwrap(), PASSAGES.len());
}

#[tokio::test]
async fn test_vector_retrieval_finds_relevant_passage() {
    let embedder = HashEmbedder::new(256);
    let store = MemoryStore::default();
    let collection = collection_name_for("acme-hosting");
    populate(&store, &embedder, &collection, "contract-1").await;

    let query = embedder
        .embed_query("What is the incident response time for severity 1?")
        .await
        .unwrap();
    let hits = store
        .search_by_vector(&collection, &query, &["contract-1".to_string()], 3)
        .await
        .unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits[0].content.contains("Severity 1"));
}

#[tokio::test]
async fn test_full_text_complements_vector_search() {
    let embedder = HashEmbedder::new(256);
    let store = MemoryStore::default();
    let collection = collection_name_for("acme");
    populate(&store, &embedder, &collection, "contract-1").await;

    let hits = store
        .search_full_text(&collection, "uptime", &["contract-1".to_string()], 4)
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.content.to_lowercase().contains("uptime")));
}

#[tokio::test]
async fn test_documents_are_isolated_within_collection() {
    let embedder = HashEmbedder::new(128);
    let store = MemoryStore::default();
    populate(&store, &embedder, "_vendor", "contract-1").await;
    populate(&store, &embedder, "_vendor", "contract-2").await;

    let query = embedder.embed_query("uptime").await.unwrap();
    let hits = store
        .search_by_vector("_vendor", &query, &["contract-2".to_string()], 10)
        .await
        .unwrap();
    assert_eq!(hits.len(), PASSAGES.len());
    assert!(hits
        .iter()
        .all(|h| h.metadata["document_id"] == "contract-2"));
}

#[tokio::test]
async fn test_snapshot_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = MemoryStoreConfig {
        snapshot_path: Some(dir.path().join("store").join("snapshot.json")),
        ..MemoryStoreConfig::default()
    };
    let embedder = HashEmbedder::new(64);

    {
        let store = MemoryStore::open(config.clone()).unwrap();
        populate(&store, &embedder, "_acme", "contract-1").await;
    }

    let reopened = MemoryStore::open(config).unwrap();
    assert_eq!(reopened.collection_names().unwrap(), vec!["_acme".to_string()]);
    assert_eq!(reopened.chunk_count("_acme").unwrap(), PASSAGES.len());

    let hits = reopened
        .search_full_text("_acme", "invoices payable", &[], 1)
        .await
        .unwrap();
    assert_eq!(hits[0].metadata["chunk_index"], 2);
}
