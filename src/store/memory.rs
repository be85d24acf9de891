//! In-memory document store.
//!
//! Behaves like the clustered store for everything the lifecycle and
//! retrieval layers rely on (alias resolution, atomic alias updates,
//! versioning, result window, point-in-time scroll cursors) and records
//! enough about each call for tests to assert on it.

use super::{
    DEFAULT_SHARDS, DocumentStore, check_result_window, check_version, cursor_expiry,
    ensure_index_name_safe, generate_id, merge_patch, scroll_missing, validate_source,
};
use crate::errors::{StoreError, StoreResult};
use crate::models::document::{Document, Hit};
use crate::models::index::{AliasAction, IndexInfo, IndexSettings, ShardStats};
use crate::models::page::{
    BulkItem, BulkResponse, ScrollPage, ScrollRequest, SearchPage, SearchRequest, WriteAck,
    WriteOp,
};
use crate::models::query::Query;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredDoc {
    category: String,
    version: u64,
    source: Value,
}

#[derive(Debug)]
struct IndexState {
    shards: u32,
    docs: BTreeMap<String, StoredDoc>,
}

#[derive(Debug)]
struct ScrollState {
    hits: Vec<Hit>,
    position: usize,
    size: usize,
    expires_at: DateTime<Utc>,
}

/// alias -> (index -> filter)
type AliasTable = BTreeMap<String, BTreeMap<String, Option<Query>>>;

#[derive(Default)]
struct State {
    indices: BTreeMap<String, IndexState>,
    aliases: AliasTable,
    scrolls: HashMap<String, ScrollState>,
    calls: HashMap<&'static str, usize>,
    alias_history: Vec<(String, BTreeSet<String>)>,
    failures: HashMap<&'static str, String>,
    rejected_ids: HashSet<String>,
    failing_refresh: bool,
}

/// In-memory [`DocumentStore`].
///
/// # Example
///
/// ```rust,ignore
/// let store = Arc::new(MemoryStore::new());
/// store.create_index("people", Some(1)).await?;
/// assert_eq!(store.call_count("create_index"), 1);
/// ```
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of times the named trait operation was invoked.
    pub fn call_count(&self, operation: &str) -> usize {
        self.state().calls.get(operation).copied().unwrap_or(0)
    }

    /// Target set of `alias` after every alias update that touched it.
    pub fn alias_history(&self, alias: &str) -> Vec<BTreeSet<String>> {
        self.state()
            .alias_history
            .iter()
            .filter(|(name, _)| name == alias)
            .map(|(_, targets)| targets.clone())
            .collect()
    }

    /// Make the next call of `operation` fail with `message`.
    pub fn fail_next(&self, operation: &'static str, message: impl Into<String>) {
        self.state().failures.insert(operation, message.into());
    }

    /// Reject every bulk item carrying this id.
    pub fn reject_document(&self, id: impl Into<String>) {
        self.state().rejected_ids.insert(id.into());
    }

    /// Make refreshes report zero successful shards.
    pub fn set_failing_refresh(&self, failing: bool) {
        self.state().failing_refresh = failing;
    }

    pub fn index_names(&self) -> Vec<String> {
        self.state().indices.keys().cloned().collect()
    }

    /// Scroll cursors that have not been cleared.
    pub fn open_scrolls(&self) -> usize {
        self.state().scrolls.len()
    }
}

impl State {
    fn enter(&mut self, operation: &'static str) -> StoreResult<()> {
        *self.calls.entry(operation).or_default() += 1;
        match self.failures.remove(operation) {
            Some(message) => Err(StoreError::operation(operation, message)),
            None => Ok(()),
        }
    }

    fn create(&mut self, name: &str, shards: Option<u32>) -> StoreResult<()> {
        ensure_index_name_safe(name)?;
        if self.indices.contains_key(name) {
            return Err(StoreError::operation(
                "create_index",
                format!("index [{name}] already exists"),
            ));
        }
        if self.aliases.contains_key(name) {
            return Err(StoreError::operation(
                "create_index",
                format!("[{name}] already exists as alias"),
            ));
        }
        self.indices.insert(
            name.to_string(),
            IndexState {
                shards: shards.filter(|s| *s > 0).unwrap_or(DEFAULT_SHARDS),
                docs: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Indices (with alias filters) a read against `target` covers.
    fn read_targets(&self, target: &str) -> StoreResult<Vec<(String, Option<Query>)>> {
        if self.indices.contains_key(target) {
            return Ok(vec![(target.to_string(), None)]);
        }
        match self.aliases.get(target) {
            Some(targets) => Ok(targets
                .iter()
                .map(|(index, filter)| (index.clone(), filter.clone()))
                .collect()),
            None => Err(StoreError::IndexNotFound(target.to_string())),
        }
    }

    /// The single index a write against `target` lands in.
    fn write_target(&mut self, target: &str, operation: &str) -> StoreResult<String> {
        if self.indices.contains_key(target) {
            return Ok(target.to_string());
        }
        if let Some(targets) = self.aliases.get(target) {
            return match targets.keys().collect::<Vec<_>>().as_slice() {
                [index] => Ok((*index).clone()),
                _ => Err(StoreError::operation(
                    operation,
                    format!(
                        "alias [{target}] has {} indices, writes need exactly one",
                        targets.len()
                    ),
                )),
            };
        }
        self.create(target, None)?;
        Ok(target.to_string())
    }

    fn lookup_target(&self, target: &str) -> Option<String> {
        if self.indices.contains_key(target) {
            return Some(target.to_string());
        }
        let targets = self.aliases.get(target)?;
        match targets.keys().collect::<Vec<_>>().as_slice() {
            [index] => Some((*index).clone()),
            _ => None,
        }
    }

    fn collect_hits(&self, target: &str, query: &Query, category: Option<&str>) -> StoreResult<Vec<Hit>> {
        let mut hits = Vec::new();
        for (index, filter) in self.read_targets(target)? {
            let Some(state) = self.indices.get(&index) else {
                continue;
            };
            for (id, doc) in &state.docs {
                if category.is_some_and(|c| c != doc.category) {
                    continue;
                }
                if filter.as_ref().is_some_and(|f| !f.matches(&doc.source)) {
                    continue;
                }
                if !query.matches(&doc.source) {
                    continue;
                }
                hits.push(Hit {
                    index: index.clone(),
                    id: id.clone(),
                    version: doc.version,
                    category: doc.category.clone(),
                    source: doc.source.clone(),
                });
            }
        }
        Ok(hits)
    }

    fn put(&mut self, index: &str, category: &str, op: WriteOp) -> StoreResult<WriteAck> {
        validate_source(&op.source)?;
        let state = self
            .indices
            .get_mut(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        let id = op.id.unwrap_or_else(generate_id);
        let current = state.docs.get(&id).map(|doc| doc.version).unwrap_or(0);
        check_version(index, &id, op.version, current)?;
        let version = current + 1;
        state.docs.insert(
            id.clone(),
            StoredDoc {
                category: op.category.unwrap_or_else(|| category.to_string()),
                version,
                source: op.source,
            },
        );
        Ok(WriteAck { id, version })
    }

    fn apply_aliases(&mut self, actions: &[AliasAction]) -> StoreResult<()> {
        let mut next = self.aliases.clone();
        for action in actions {
            ensure_index_name_safe(action.alias())?;
            if self.indices.contains_key(action.alias()) {
                return Err(StoreError::operation(
                    "update_aliases",
                    format!("an index exists with the same name as the alias [{}]", action.alias()),
                ));
            }
            match action {
                AliasAction::Add { alias, index, filter } => {
                    if !self.indices.contains_key(index) {
                        return Err(StoreError::IndexNotFound(index.clone()));
                    }
                    next.entry(alias.clone())
                        .or_default()
                        .insert(index.clone(), filter.clone());
                }
                AliasAction::Remove { alias, index } => {
                    let removed = next
                        .get_mut(alias)
                        .and_then(|targets| targets.remove(index));
                    if removed.is_none() {
                        return Err(StoreError::operation(
                            "update_aliases",
                            format!("aliases [{alias}] missing on index [{index}]"),
                        ));
                    }
                }
            }
        }
        next.retain(|_, targets| !targets.is_empty());
        self.aliases = next;

        let touched = actions
            .iter()
            .map(|action| action.alias().to_string())
            .collect::<BTreeSet<_>>();
        for alias in touched {
            let targets = self
                .aliases
                .get(&alias)
                .map(|targets| targets.keys().cloned().collect())
                .unwrap_or_default();
            self.alias_history.push((alias, targets));
        }
        Ok(())
    }

    /// Drop scroll contexts whose keep-alive has lapsed.
    fn sweep_scrolls(&mut self) {
        let now = Utc::now();
        self.scrolls.retain(|_, scroll| scroll.expires_at >= now);
    }

    fn next_scroll_page(&mut self, token: &str, keep_alive: Duration) -> StoreResult<ScrollPage> {
        let mut scroll = self
            .scrolls
            .remove(token)
            .ok_or_else(|| scroll_missing(token))?;
        if scroll.expires_at < Utc::now() {
            return Err(scroll_missing(token));
        }
        let end = (scroll.position + scroll.size).min(scroll.hits.len());
        let hits = scroll.hits[scroll.position..end].to_vec();
        let total = scroll.hits.len() as u64;
        scroll.position = end;
        scroll.expires_at = cursor_expiry(keep_alive);

        let token = generate_id();
        self.scrolls.insert(token.clone(), scroll);
        Ok(ScrollPage { token, hits, total })
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_index(&self, name: &str, shards: Option<u32>) -> StoreResult<bool> {
        let mut state = self.state();
        state.enter("create_index")?;
        state.create(name, shards)?;
        Ok(true)
    }

    async fn refresh_index(&self, name: &str) -> StoreResult<ShardStats> {
        let mut state = self.state();
        state.enter("refresh_index")?;
        let shards = state
            .indices
            .get(name)
            .map(|index| index.shards)
            .ok_or_else(|| StoreError::IndexNotFound(name.to_string()))?;
        if state.failing_refresh {
            return Ok(ShardStats {
                successful: 0,
                failed: shards,
            });
        }
        Ok(ShardStats {
            successful: shards,
            failed: 0,
        })
    }

    async fn delete_index(&self, name: &str) -> StoreResult<bool> {
        let mut state = self.state();
        state.enter("delete_index")?;
        if state.indices.remove(name).is_none() {
            return Err(StoreError::IndexNotFound(name.to_string()));
        }
        for targets in state.aliases.values_mut() {
            targets.remove(name);
        }
        state.aliases.retain(|_, targets| !targets.is_empty());
        Ok(true)
    }

    async fn exists(&self, name: &str) -> StoreResult<bool> {
        let mut state = self.state();
        state.enter("exists")?;
        Ok(state.indices.contains_key(name) || state.aliases.contains_key(name))
    }

    async fn alias_exists(&self, name: &str) -> StoreResult<bool> {
        let mut state = self.state();
        state.enter("alias_exists")?;
        Ok(state.aliases.contains_key(name))
    }

    async fn index_settings(&self, name: &str) -> StoreResult<Option<IndexSettings>> {
        let mut state = self.state();
        state.enter("index_settings")?;
        Ok(state
            .indices
            .get(name)
            .map(|index| IndexSettings { shards: index.shards }))
    }

    async fn list_indices(&self, prefix: &str) -> StoreResult<Vec<IndexInfo>> {
        let mut state = self.state();
        state.enter("list_indices")?;
        Ok(state
            .indices
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, index)| IndexInfo {
                name: name.clone(),
                shards: index.shards,
                doc_count: index.docs.len() as u64,
            })
            .collect())
    }

    async fn update_aliases(&self, actions: Vec<AliasAction>) -> StoreResult<bool> {
        let mut state = self.state();
        state.enter("update_aliases")?;
        state.apply_aliases(&actions)?;
        Ok(true)
    }

    async fn alias_targets(&self, alias: &str) -> StoreResult<BTreeSet<String>> {
        let mut state = self.state();
        state.enter("alias_targets")?;
        Ok(state
            .aliases
            .get(alias)
            .map(|targets| targets.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, target: &str, id: &str) -> StoreResult<Option<Document>> {
        let mut state = self.state();
        state.enter("get")?;
        let Some(index) = state.lookup_target(target) else {
            return Ok(None);
        };
        Ok(state
            .indices
            .get(&index)
            .and_then(|index| index.docs.get(id))
            .map(|doc| Document {
                id: Some(id.to_string()),
                version: doc.version,
                source: doc.source.clone(),
            }))
    }

    async fn index(&self, target: &str, category: &str, op: WriteOp) -> StoreResult<WriteAck> {
        let mut state = self.state();
        state.enter("index")?;
        let index = state.write_target(target, "index")?;
        state.put(&index, category, op)
    }

    async fn update(
        &self,
        target: &str,
        id: &str,
        patch: Value,
        expected_version: Option<u64>,
    ) -> StoreResult<WriteAck> {
        let mut state = self.state();
        state.enter("update")?;
        let index = state
            .lookup_target(target)
            .ok_or_else(|| StoreError::IndexNotFound(target.to_string()))?;
        let doc = state
            .indices
            .get_mut(&index)
            .and_then(|state| state.docs.get_mut(id))
            .ok_or_else(|| {
                StoreError::operation("update", format!("[{index}][{id}]: document missing"))
            })?;
        check_version(&index, id, expected_version, doc.version)?;
        let mut source = doc.source.clone();
        merge_patch(&mut source, patch);
        validate_source(&source)?;
        doc.source = source;
        doc.version += 1;
        Ok(WriteAck {
            id: id.to_string(),
            version: doc.version,
        })
    }

    async fn delete(&self, target: &str, id: &str) -> StoreResult<bool> {
        let mut state = self.state();
        state.enter("delete")?;
        let Some(index) = state.lookup_target(target) else {
            return Ok(false);
        };
        Ok(state
            .indices
            .get_mut(&index)
            .and_then(|index| index.docs.remove(id))
            .is_some())
    }

    async fn bulk_write(
        &self,
        target: &str,
        category: &str,
        ops: Vec<WriteOp>,
    ) -> StoreResult<BulkResponse> {
        let mut state = self.state();
        state.enter("bulk_write")?;
        let index = state.write_target(target, "bulk_write")?;
        let mut response = BulkResponse::default();
        for op in ops {
            let requested = op.id.clone();
            if requested
                .as_ref()
                .is_some_and(|id| state.rejected_ids.contains(id))
            {
                response.items.push(BulkItem {
                    id: requested,
                    version: None,
                    error: Some("rejected by store".to_string()),
                });
                continue;
            }
            let item = match state.put(&index, category, op) {
                Ok(ack) => BulkItem {
                    id: Some(ack.id),
                    version: Some(ack.version),
                    error: None,
                },
                Err(err) => BulkItem {
                    id: requested,
                    version: None,
                    error: Some(err.to_string()),
                },
            };
            response.items.push(item);
        }
        Ok(response)
    }

    async fn search(&self, target: &str, request: SearchRequest) -> StoreResult<SearchPage> {
        let mut state = self.state();
        state.enter("search")?;
        check_result_window(request.from, request.size)?;
        let hits = state.collect_hits(target, &request.query, request.category.as_deref())?;
        let total = hits.len() as u64;
        let hits = hits
            .into_iter()
            .skip(request.from as usize)
            .take(request.size as usize)
            .collect();
        Ok(SearchPage { hits, total })
    }

    async fn count(
        &self,
        target: &str,
        query: &Query,
        category: Option<&str>,
    ) -> StoreResult<u64> {
        let mut state = self.state();
        state.enter("count")?;
        Ok(state.collect_hits(target, query, category)?.len() as u64)
    }

    async fn open_scroll(&self, target: &str, request: ScrollRequest) -> StoreResult<ScrollPage> {
        let mut state = self.state();
        state.enter("open_scroll")?;
        if request.size == 0 {
            return Err(StoreError::operation("open_scroll", "scroll size must be positive"));
        }
        state.sweep_scrolls();
        let hits = state.collect_hits(target, &request.query, request.category.as_deref())?;
        let token = generate_id();
        state.scrolls.insert(
            token.clone(),
            ScrollState {
                hits,
                position: 0,
                size: request.size as usize,
                expires_at: cursor_expiry(request.keep_alive),
            },
        );
        state.next_scroll_page(&token, request.keep_alive)
    }

    async fn scroll(&self, token: &str, keep_alive: Duration) -> StoreResult<ScrollPage> {
        let mut state = self.state();
        state.enter("scroll")?;
        state.sweep_scrolls();
        state.next_scroll_page(token, keep_alive)
    }

    async fn clear_scroll(&self, token: &str) -> StoreResult<()> {
        let mut state = self.state();
        state.enter("clear_scroll")?;
        state.scrolls.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(id: &str, source: Value) -> WriteOp {
        WriteOp::new(Some(id.to_string()), source)
    }

    #[tokio::test]
    async fn alias_reads_apply_filters() {
        let store = MemoryStore::new();
        store.create_index("orders", Some(1)).await.unwrap();
        store
            .bulk_write(
                "orders",
                "order",
                vec![op("1", json!({"region": "eu"})), op("2", json!({"region": "us"}))],
            )
            .await
            .unwrap();
        store
            .update_aliases(vec![AliasAction::Add {
                alias: "orders-eu".into(),
                index: "orders".into(),
                filter: Some(Query::term("region", "eu")),
            }])
            .await
            .unwrap();

        assert_eq!(store.count("orders-eu", &Query::MatchAll, None).await.unwrap(), 1);
        assert_eq!(store.count("orders", &Query::MatchAll, None).await.unwrap(), 2);
        assert!(store.exists("orders-eu").await.unwrap());
        assert!(store.alias_exists("orders-eu").await.unwrap());
        assert!(!store.alias_exists("orders").await.unwrap());
    }

    #[tokio::test]
    async fn alias_update_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.create_index("a", None).await.unwrap();
        store
            .update_aliases(vec![AliasAction::add("live", "a")])
            .await
            .unwrap();

        // second action references a missing index, so the first must not apply
        let err = store
            .update_aliases(vec![
                AliasAction::remove("live", "a"),
                AliasAction::add("live", "missing"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IndexNotFound(_)));
        assert_eq!(
            store.alias_targets("live").await.unwrap(),
            BTreeSet::from(["a".to_string()])
        );
    }

    #[tokio::test]
    async fn versions_increment_and_conflict() {
        let store = MemoryStore::new();
        let first = store.index("people", "person", op("p1", json!({"n": 1}))).await.unwrap();
        assert_eq!(first.version, 1);
        let second = store.index("people", "person", op("p1", json!({"n": 2}))).await.unwrap();
        assert_eq!(second.version, 2);

        let stale = WriteOp {
            version: Some(1),
            ..op("p1", json!({"n": 3}))
        };
        let err = store.index("people", "person", stale).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn scroll_token_rotates_and_expires_on_clear() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .index("logs", "line", op(&format!("{i}"), json!({"i": i})))
                .await
                .unwrap();
        }
        let request = ScrollRequest {
            query: Query::MatchAll,
            category: None,
            size: 2,
            keep_alive: Duration::from_secs(60),
        };
        let first = store.open_scroll("logs", request).await.unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.hits.len(), 2);

        let second = store.scroll(&first.token, Duration::from_secs(60)).await.unwrap();
        assert_ne!(second.token, first.token);
        assert!(store.scroll(&first.token, Duration::from_secs(60)).await.is_err());

        store.clear_scroll(&second.token).await.unwrap();
        assert_eq!(store.open_scrolls(), 0);
    }

    #[tokio::test]
    async fn lapsed_scrolls_are_swept_on_next_open() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store
                .index("logs", "line", op(&format!("{i}"), json!({"i": i})))
                .await
                .unwrap();
        }
        let request = |keep_alive| ScrollRequest {
            query: Query::MatchAll,
            category: None,
            size: 1,
            keep_alive,
        };
        let mut stale = Vec::new();
        for _ in 0..5 {
            let page = store
                .open_scroll("logs", request(Duration::from_millis(1)))
                .await
                .unwrap();
            stale.push(page.token);
        }
        assert_eq!(store.open_scrolls(), 5);

        tokio::time::sleep(Duration::from_millis(50)).await;
        store
            .open_scroll("logs", request(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(store.open_scrolls(), 1);
        assert!(store.scroll(&stale[0], Duration::from_secs(60)).await.is_err());
    }

    #[tokio::test]
    async fn deleting_an_index_drops_its_alias_pointers() {
        let store = MemoryStore::new();
        store.create_index("a", None).await.unwrap();
        store.update_aliases(vec![AliasAction::add("live", "a")]).await.unwrap();
        store.delete_index("a").await.unwrap();
        assert!(!store.alias_exists("live").await.unwrap());
        assert!(store.alias_targets("live").await.unwrap().is_empty());
    }
}
