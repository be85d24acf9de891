//! Write access to one bucket.

use crate::config::ClientConfig;
use crate::errors::StoreResult;
use crate::json::Json;
use crate::models::bucket::{Bucket, Location};
use crate::models::document::Document;
use crate::models::page::WriteOp;
use crate::services::batch::{IndexBatch, check_bulk};
use crate::store::DocumentStore;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct Indexer {
    store: Arc<dyn DocumentStore>,
    bucket: Bucket,
    config: ClientConfig,
    json: Json,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        location: &impl Location,
        config: ClientConfig,
        json: Json,
    ) -> Self {
        Self {
            store,
            bucket: location.to_bucket(),
            config,
            json,
        }
    }

    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    /// Index a JSON source; returns the document id.
    pub async fn index_json(&self, id: Option<&str>, text: &str) -> StoreResult<String> {
        let source = self.json.parse_source(text)?;
        self.write(WriteOp::new(id.map(str::to_string), source)).await
    }

    pub async fn index_object<T: Serialize + ?Sized>(
        &self,
        id: Option<&str>,
        value: &T,
    ) -> StoreResult<String> {
        let source = self.json.to_value(value)?;
        self.write(WriteOp::new(id.map(str::to_string), source)).await
    }

    /// Index a document; a non-zero version must match the stored one.
    pub async fn index_document(&self, document: Document) -> StoreResult<String> {
        let op = WriteOp {
            id: document.id,
            version: (document.version > 0).then_some(document.version),
            category: None,
            source: document.source,
        };
        self.write(op).await
    }

    async fn write(&self, op: WriteOp) -> StoreResult<String> {
        let ack = self
            .store
            .index(self.bucket.location(), self.bucket.category(), op)
            .await?;
        debug!(location = %self.bucket.location(), id = %ack.id, version = ack.version, "Indexed document");
        Ok(ack.id)
    }

    /// Merge `partial` into the stored source; returns the new version.
    pub async fn update_doc(
        &self,
        id: &str,
        partial: Value,
        version: Option<u64>,
    ) -> StoreResult<u64> {
        let ack = self
            .store
            .update(self.bucket.location(), id, partial, version)
            .await?;
        Ok(ack.version)
    }

    pub async fn update_field<V: Serialize>(
        &self,
        id: &str,
        field: &str,
        value: V,
        version: Option<u64>,
    ) -> StoreResult<u64> {
        let mut partial = Map::new();
        partial.insert(field.to_string(), self.json.to_value(&value)?);
        self.update_doc(id, Value::Object(partial), version).await
    }

    /// Returns whether a document was removed.
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.store.delete(self.bucket.location(), id).await
    }

    /// Write `documents` in one bulk request.
    pub async fn bulk_index(&self, documents: Vec<Document>) -> StoreResult<usize> {
        let ops = documents
            .into_iter()
            .map(|document| WriteOp {
                id: document.id,
                version: (document.version > 0).then_some(document.version),
                category: None,
                source: document.source,
            })
            .collect::<Vec<_>>();
        self.bulk(ops).await
    }

    pub async fn bulk_index_json<I, S>(&self, sources: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ops = sources
            .into_iter()
            .map(|text| -> StoreResult<WriteOp> {
                Ok(WriteOp::new(None, self.json.parse_source(text.as_ref())?))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        self.bulk(ops).await
    }

    async fn bulk(&self, ops: Vec<WriteOp>) -> StoreResult<usize> {
        if ops.is_empty() {
            return Ok(0);
        }
        let count = ops.len();
        let response = self
            .store
            .bulk_write(self.bucket.location(), self.bucket.category(), ops)
            .await?;
        check_bulk(&response)?;
        Ok(count)
    }

    /// A batch with the configured size.
    pub fn batch(&self) -> StoreResult<IndexBatch> {
        self.batch_with_size(self.config.batch_size)
    }

    pub fn batch_with_size(&self, size: usize) -> StoreResult<IndexBatch> {
        IndexBatch::new(
            self.store.clone(),
            self.bucket.location(),
            self.bucket.category(),
            self.json,
            size,
        )
    }

    /// Run `body` against a fresh batch and flush what remains when it
    /// returns, whether it succeeded or not.
    pub async fn batch_scope<R, F>(&self, size: usize, body: F) -> StoreResult<R>
    where
        F: AsyncFnOnce(&mut IndexBatch) -> StoreResult<R>,
    {
        let mut batch = self.batch_with_size(size)?;
        let outcome = body(&mut batch).await;
        batch.close(outcome).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::models::query::Query;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    fn indexer(store: &Arc<MemoryStore>) -> Indexer {
        let bucket = Bucket::new("notes", "note").unwrap();
        Indexer::new(store.clone(), &bucket, ClientConfig::default(), Json::new())
    }

    #[derive(Serialize)]
    struct Note {
        title: &'static str,
    }

    #[tokio::test]
    async fn writes_assign_ids_when_missing() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer(&store);
        let generated = indexer.index_object(None, &Note { title: "x" }).await.unwrap();
        assert_eq!(generated.len(), 32);
        let given = indexer.index_json(Some("n1"), r#"{"title": "y"}"#).await.unwrap();
        assert_eq!(given, "n1");
        assert!(indexer.index_json(None, "[]").await.is_err());
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer(&store);
        indexer.index_json(Some("n1"), r#"{"title": "a"}"#).await.unwrap();
        let version = indexer.update_field("n1", "title", "b", Some(1)).await.unwrap();
        assert_eq!(version, 2);

        let err = indexer
            .update_doc("n1", json!({"title": "c"}), Some(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { expected: 1, actual: 2, .. }));

        let err = indexer
            .index_document(Document::new("n1", json!({})).with_version(1))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn delete_reports_absence() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer(&store);
        indexer.index_json(Some("n1"), "{}").await.unwrap();
        assert!(indexer.delete("n1").await.unwrap());
        assert!(!indexer.delete("n1").await.unwrap());
    }

    #[tokio::test]
    async fn bulk_json_goes_out_in_one_request() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer(&store);
        let written = indexer
            .bulk_index_json([r#"{"a": 1}"#, r#"{"a": 2}"#, r#"{"a": 3}"#])
            .await
            .unwrap();
        assert_eq!(written, 3);
        assert_eq!(store.call_count("bulk_write"), 1);
        assert_eq!(indexer.bulk_index(Vec::new()).await.unwrap(), 0);
        assert_eq!(store.call_count("bulk_write"), 1);
    }

    #[tokio::test]
    async fn scope_flushes_remainder_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer(&store);
        let added = indexer
            .batch_scope(4, async |batch| {
                for i in 0..10 {
                    batch.add(Document::new(format!("n{i}"), json!({"i": i}))).await?;
                }
                Ok(batch.pending())
            })
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(store.call_count("bulk_write"), 3);
        assert_eq!(store.count("notes", &Query::MatchAll, None).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn scope_flushes_on_error_too() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer(&store);
        let result: StoreResult<()> = indexer
            .batch_scope(100, async |batch| {
                batch.add(Document::new("n1", json!({}))).await?;
                Err(StoreError::illegal_state("stop"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.call_count("bulk_write"), 1);
        assert!(store.get("notes", "n1").await.unwrap().is_some());
    }
}
