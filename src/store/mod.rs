//! The document store seam.
//!
//! Everything the lifecycle protocol and the retrieval engine need from the
//! underlying search cluster is expressed by [`DocumentStore`]. Two
//! implementations ship with the crate:
//! - [`memory::MemoryStore`]: in-process, instrumented for tests
//! - [`sqlite::SqliteStore`]: durable, backed by SQLite through `sqlx`

use crate::errors::{StoreError, StoreResult};
use crate::models::document::Document;
use crate::models::index::{AliasAction, IndexInfo, IndexSettings, ShardStats};
use crate::models::page::{
    BulkResponse, ScrollPage, ScrollRequest, SearchPage, SearchRequest, WriteAck, WriteOp,
};
use crate::models::query::Query;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

pub mod memory;
pub mod sqlite;

/// Largest `from + size` a paged search may address.
pub const MAX_RESULT_WINDOW: u64 = 10_000;

/// Shard count used when a create call does not specify one.
pub const DEFAULT_SHARDS: u32 = 5;

const MAX_INDEX_NAME_LEN: usize = 255;

/// Abstraction over the clustered document store.
///
/// A `target` argument may name a physical index or an alias:
/// - reads fan out over every index the alias points at, honouring each
///   pointer's filter
/// - writes through an alias require exactly one target
/// - writing to an unknown name creates the index with default settings
///
/// `update_aliases` applies its whole action list atomically; concurrent
/// readers observe either the state before or the state after.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a physical index. Fails if the name is taken by an index or an alias.
    async fn create_index(&self, name: &str, shards: Option<u32>) -> StoreResult<bool>;

    /// Make recent writes visible and report per-shard success.
    async fn refresh_index(&self, name: &str) -> StoreResult<ShardStats>;

    async fn delete_index(&self, name: &str) -> StoreResult<bool>;

    /// True if `name` denotes an index **or** an alias.
    async fn exists(&self, name: &str) -> StoreResult<bool>;

    async fn alias_exists(&self, name: &str) -> StoreResult<bool>;

    async fn index_settings(&self, name: &str) -> StoreResult<Option<IndexSettings>>;

    /// Physical indices whose name starts with `prefix`, ordered by name.
    async fn list_indices(&self, prefix: &str) -> StoreResult<Vec<IndexInfo>>;

    async fn update_aliases(&self, actions: Vec<AliasAction>) -> StoreResult<bool>;

    /// Indices the alias currently points at; empty when the alias does not exist.
    async fn alias_targets(&self, alias: &str) -> StoreResult<BTreeSet<String>>;

    async fn get(&self, target: &str, id: &str) -> StoreResult<Option<Document>>;

    async fn index(&self, target: &str, category: &str, op: WriteOp) -> StoreResult<WriteAck>;

    /// Merge `patch` into the stored source.
    async fn update(
        &self,
        target: &str,
        id: &str,
        patch: Value,
        expected_version: Option<u64>,
    ) -> StoreResult<WriteAck>;

    async fn delete(&self, target: &str, id: &str) -> StoreResult<bool>;

    /// Write many documents at once. Per-item failures are reported in the
    /// response, not as an `Err`.
    async fn bulk_write(
        &self,
        target: &str,
        category: &str,
        ops: Vec<WriteOp>,
    ) -> StoreResult<BulkResponse>;

    async fn search(&self, target: &str, request: SearchRequest) -> StoreResult<SearchPage>;

    async fn count(&self, target: &str, query: &Query, category: Option<&str>)
    -> StoreResult<u64>;

    async fn open_scroll(&self, target: &str, request: ScrollRequest) -> StoreResult<ScrollPage>;

    /// Fetch the next page and renew the cursor for another `keep_alive`.
    async fn scroll(&self, token: &str, keep_alive: Duration) -> StoreResult<ScrollPage>;

    /// Release a cursor early. Unknown tokens are ignored.
    async fn clear_scroll(&self, token: &str) -> StoreResult<()>;
}

/// Validate an index or alias name.
///
/// Enforces the store's naming rules:
/// - 1–255 bytes, lowercase
/// - no whitespace and none of `\ / * ? " < > | , #`
/// - cannot start with `-`, `_` or `+`, cannot be `.` or `..`
pub fn ensure_index_name_safe(name: &str) -> StoreResult<()> {
    let invalid = |reason: &str| {
        Err(StoreError::operation(
            "validate_name",
            format!("invalid index name `{name}`: {reason}"),
        ))
    };

    if name.is_empty() || name.len() > MAX_INDEX_NAME_LEN {
        return invalid("must be between 1 and 255 bytes");
    }
    if name == "." || name == ".." {
        return invalid("must not be `.` or `..`");
    }
    if name.starts_with(['-', '_', '+']) {
        return invalid("must not start with `-`, `_` or `+`");
    }
    if name.chars().any(|c| c.is_uppercase()) {
        return invalid("must be lowercase");
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '\\' | '/' | '*' | '?' | '"' | '<' | '>' | '|' | ',' | '#'))
    {
        return invalid("contains a forbidden character");
    }
    Ok(())
}

/// Reject sources the store cannot map.
pub fn validate_source(source: &Value) -> StoreResult<()> {
    let Some(object) = source.as_object() else {
        return Err(StoreError::operation(
            "map_document",
            "document source must be a JSON object",
        ));
    };
    if object.contains_key("_id") {
        return Err(StoreError::operation(
            "map_document",
            "field [_id] is a metadata field and cannot be added inside a document",
        ));
    }
    Ok(())
}

/// Reject paged searches beyond the result window.
pub fn check_result_window(from: u64, size: u64) -> StoreResult<()> {
    if from.saturating_add(size) > MAX_RESULT_WINDOW {
        return Err(StoreError::operation(
            "search",
            format!(
                "result window is too large, from + size must be less than or equal to [{MAX_RESULT_WINDOW}] but was [{}]",
                from.saturating_add(size)
            ),
        ));
    }
    Ok(())
}

/// Recursively merge `patch` into `target`; objects merge, everything else replaces.
pub fn merge_patch(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(changes)) => {
            for (key, value) in changes {
                match existing.get_mut(&key) {
                    Some(slot) if slot.is_object() && value.is_object() => merge_patch(slot, value),
                    _ => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Check an expected version against the stored one.
pub fn check_version(
    index: &str,
    id: &str,
    expected: Option<u64>,
    actual: u64,
) -> StoreResult<()> {
    match expected {
        Some(expected) if expected != actual => Err(StoreError::VersionConflict {
            index: index.to_string(),
            id: id.to_string(),
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

/// Store-assigned document id.
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Instant a cursor opened or renewed now with `keep_alive` expires at.
pub fn cursor_expiry(keep_alive: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(keep_alive)
        .ok()
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub(crate) fn scroll_missing(token: &str) -> StoreError {
    StoreError::operation(
        "scroll",
        format!("no search context found for scroll id [{token}]"),
    )
}
