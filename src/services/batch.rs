//! Buffered bulk writes.
//!
//! Documents accumulate in an [`IndexBatch`] and go to the store as one bulk
//! request whenever the buffer reaches its size threshold. The remainder is
//! written by [`IndexBatch::finish`] or [`IndexBatch::close`]; use
//! `Indexer::batch_scope` to get that guarantee without bookkeeping.

use crate::errors::{StoreError, StoreResult};
use crate::json::Json;
use crate::models::document::{Document, Hit};
use crate::models::page::{BulkResponse, WriteOp};
use crate::store::DocumentStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turn a bulk response with failed items into one aggregate error.
pub fn check_bulk(response: &BulkResponse) -> StoreResult<()> {
    if response.has_failures() {
        return Err(StoreError::operation(
            "bulk_write",
            format!(
                "Could not index all documents. Error message is: {}",
                response.failure_message()
            ),
        ));
    }
    Ok(())
}

pub struct IndexBatch {
    store: Arc<dyn DocumentStore>,
    target: String,
    category: String,
    json: Json,
    size: usize,
    buffer: Vec<WriteOp>,
    flushes: usize,
    written: u64,
}

impl IndexBatch {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        target: impl Into<String>,
        category: impl Into<String>,
        json: Json,
        size: usize,
    ) -> StoreResult<Self> {
        if size == 0 {
            return Err(StoreError::config("batch size must be positive"));
        }
        Ok(Self {
            store,
            target: target.into(),
            category: category.into(),
            json,
            size,
            buffer: Vec::with_capacity(size),
            flushes: 0,
            written: 0,
        })
    }

    /// Queue a document. A non-zero version becomes the expected version.
    pub async fn add(&mut self, document: Document) -> StoreResult<()> {
        let op = WriteOp {
            id: document.id,
            version: (document.version > 0).then_some(document.version),
            category: None,
            source: document.source,
        };
        self.push(op).await
    }

    pub async fn add_json(&mut self, id: Option<String>, text: &str) -> StoreResult<()> {
        let source = self.json.parse_source(text)?;
        self.push(WriteOp::new(id, source)).await
    }

    pub async fn add_object<T: Serialize + ?Sized>(
        &mut self,
        id: Option<String>,
        value: &T,
    ) -> StoreResult<()> {
        let source = self.json.to_value(value)?;
        self.push(WriteOp::new(id, source)).await
    }

    /// Queue a copy of a hit. Keeps its id and category, drops its version.
    pub async fn add_hit(&mut self, hit: Hit) -> StoreResult<()> {
        let op = WriteOp {
            id: Some(hit.id),
            version: None,
            category: Some(hit.category),
            source: hit.source,
        };
        self.push(op).await
    }

    pub async fn push(&mut self, op: WriteOp) -> StoreResult<()> {
        self.buffer.push(op);
        if self.buffer.len() >= self.size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Documents waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Bulk requests issued so far.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Documents acknowledged by the store so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Write the buffer as one bulk request. No-op when empty.
    pub async fn flush(&mut self) -> StoreResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let ops = std::mem::take(&mut self.buffer);
        let count = ops.len();
        self.flushes += 1;
        debug!(location = %self.target, count, flush = self.flushes, "Flushing batch");
        let response = self.store.bulk_write(&self.target, &self.category, ops).await?;
        self.written += response
            .items
            .iter()
            .filter(|item| item.error.is_none())
            .count() as u64;
        check_bulk(&response)
    }

    /// Flush the remainder and consume the batch.
    pub async fn finish(mut self) -> StoreResult<u64> {
        self.flush().await?;
        Ok(self.written)
    }

    /// Flush the remainder whatever `outcome` is, then return `outcome`.
    ///
    /// If `outcome` is already an error, a failing flush is logged and the
    /// original error wins.
    pub async fn close<R>(mut self, outcome: StoreResult<R>) -> StoreResult<R> {
        let flushed = self.flush().await;
        match (outcome, flushed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(flush_err)) => {
                warn!(error = %flush_err, "Final flush failed after an earlier error");
                Err(err)
            }
        }
    }
}

impl Drop for IndexBatch {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            warn!(
                location = %self.target,
                pending = self.buffer.len(),
                "Batch dropped with unflushed documents"
            );
        }
    }
}
