//! Integration tests for cursors and batched writes
//!
//! Tests for:
//! - exhaustive iteration under both pagination strategies
//! - the offset pagination cap
//! - bulk request counts for batches

use doc_buckets::models::page::WriteOp;
use doc_buckets::{
    Bucket, ClientConfig, Document, DocumentStore, MemoryStore, Query, SearchClient, StoreError,
};
use futures::TryStreamExt;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

async fn seeded(config: ClientConfig, count: usize) -> (Arc<MemoryStore>, SearchClient, Bucket) {
    let store = Arc::new(MemoryStore::new());
    let chunk = (0..count)
        .map(|i| WriteOp::new(Some(format!("{i:06}")), json!({"n": i, "even": i % 2 == 0})))
        .collect::<Vec<_>>();
    for part in chunk.chunks(1_000) {
        store.bulk_write("events", "event", part.to_vec()).await.unwrap();
    }
    let client = SearchClient::new(store.clone(), config).unwrap();
    let bucket = client.bucket("events", "event").unwrap();
    (store, client, bucket)
}

// ============================================================================
// Cursor exhaustiveness
// ============================================================================

#[tokio::test]
async fn test_offset_cursor_yields_each_document_once() {
    for page_size in [1, 7, 10, 64, 100] {
        let (_, client, bucket) = seeded(ClientConfig::default(), 64).await;
        let hits = client
            .search(&bucket)
            .search_paged(Query::MatchAll, page_size)
            .await
            .unwrap()
            .collect_all()
            .await
            .unwrap();
        let ids: BTreeSet<_> = hits.iter().map(|hit| hit.id.as_str()).collect();
        assert_eq!(hits.len(), 64, "page size {page_size}");
        assert_eq!(ids.len(), 64, "page size {page_size}");
    }
}

#[tokio::test]
async fn test_scroll_cursor_yields_each_document_once() {
    let (store, client, bucket) = seeded(ClientConfig::default(), 95).await;
    let mut cursor = client
        .search(&bucket)
        .scroll_paged(Query::MatchAll, 20)
        .await
        .unwrap();
    assert_eq!(cursor.total(), Some(95));

    let mut ids = BTreeSet::new();
    while cursor.has_next() {
        assert!(ids.insert(cursor.next().await.unwrap().id));
    }
    assert_eq!(ids.len(), 95);
    assert_eq!(store.call_count("scroll"), 4);
    assert_eq!(store.open_scrolls(), 0);

    let err = cursor.next().await.unwrap_err();
    assert!(matches!(err, StoreError::IllegalState(_)));
}

#[tokio::test]
async fn test_offset_cursor_stops_at_result_window() {
    let (store, client, bucket) = seeded(ClientConfig::default(), 10_050).await;
    let search = client.search(&bucket);
    assert_eq!(search.count().await.unwrap(), 10_050);

    let hits = search
        .search_paged(Query::MatchAll, 1_000)
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(hits.len(), 10_000);
    assert_eq!(store.call_count("search"), 10);

    // scroll cursors are not capped
    let scrolled = search
        .scroll_paged(Query::MatchAll, 1_000)
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(scrolled.len(), 10_050);
}

#[tokio::test]
async fn test_configured_cap_and_filters_apply() {
    let config = ClientConfig::default().with_max_results(15).with_page_size(4);
    let (_, client, bucket) = seeded(config, 40).await;
    let search = client.search(&bucket);

    let capped = search.search(Query::MatchAll).await.unwrap().collect_all().await.unwrap();
    assert_eq!(capped.len(), 15);

    let even = search
        .search(Query::term("even", true))
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(even.len(), 15);
    assert!(even.iter().all(|hit| hit.source["even"] == json!(true)));
}

#[tokio::test]
async fn test_document_stream() {
    let (_, client, bucket) = seeded(ClientConfig::default(), 12).await;
    let docs: Vec<Document> = client
        .search(&bucket)
        .scroll_documents(Query::term("even", false))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(docs.len(), 6);
    assert!(docs.iter().all(|doc| doc.version == 1 && doc.id.is_some()));
}

// ============================================================================
// Batch flushing
// ============================================================================

#[tokio::test]
async fn test_batch_issues_ceil_n_over_s_requests() {
    for (size, count, expected) in [(100usize, 250usize, 3usize), (7, 50, 8), (10, 9, 1)] {
        let store = Arc::new(MemoryStore::new());
        let client = SearchClient::new(store.clone(), ClientConfig::default()).unwrap();
        let bucket = client.bucket("sink", "item").unwrap();

        client
            .indexer(&bucket)
            .batch_scope(size, async |batch| {
                for i in 0..count {
                    batch.add_json(Some(format!("i{i}")), r#"{"ok": true}"#).await?;
                }
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(store.call_count("bulk_write"), expected, "size {size}, count {count}");
        assert_eq!(
            store.count("sink", &Query::MatchAll, None).await.unwrap(),
            count as u64
        );
    }
}

#[tokio::test]
async fn test_batch_with_configured_size() {
    let store = Arc::new(MemoryStore::new());
    let config = ClientConfig::default().with_batch_size(3);
    let client = SearchClient::new(store.clone(), config).unwrap();
    let bucket = client.bucket("sink", "item").unwrap();

    let mut batch = client.indexer(&bucket).batch().unwrap();
    for i in 0..4 {
        batch.add(Document::new(format!("i{i}"), json!({}))).await.unwrap();
    }
    assert_eq!(batch.flushes(), 1);
    assert_eq!(batch.pending(), 1);
    assert_eq!(batch.finish().await.unwrap(), 4);
    assert_eq!(store.call_count("bulk_write"), 2);
}
