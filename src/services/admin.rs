//! Store topology: indices, aliases and the copy pipeline.
//!
//! [`Admin`] is the only component that creates or removes indices and
//! moves aliases. It holds no state beyond its store handle and can be
//! cloned freely.

use crate::config::ClientConfig;
use crate::errors::{StoreError, StoreResult, check_ack};
use crate::json::Json;
use crate::models::bucket::{Bucket, DEFAULT_CATEGORY, Location};
use crate::models::index::{AliasAction, IndexInfo};
use crate::models::query::Query;
use crate::services::batch::IndexBatch;
use crate::services::search::scroll_index;
use crate::services::versioned::VersionedBucket;
use crate::store::DocumentStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct Admin {
    store: Arc<dyn DocumentStore>,
    config: ClientConfig,
    json: Json,
}

impl Admin {
    pub fn new(store: Arc<dyn DocumentStore>, config: ClientConfig, json: Json) -> Self {
        Self {
            store,
            config,
            json,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Plain bucket factory.
    pub fn bucket(&self, location: &str, category: &str) -> StoreResult<Bucket> {
        Bucket::new(location, category)
    }

    /// Versioned bucket over `location`, using the configured generation scheme.
    pub fn versioned<L: Location>(&self, location: L) -> VersionedBucket<L> {
        VersionedBucket::new(location, self.clone())
    }

    /// Create a physical index unless one already exists.
    ///
    /// The new index is refreshed right away and the call fails if no shard
    /// reports success.
    pub async fn create_index(&self, name: &str, shards: Option<u32>) -> StoreResult<()> {
        if self.index_exists(name).await? {
            info!(index = name, "Index already exists, skipping creation");
            return Ok(());
        }
        let acknowledged = self
            .store
            .create_index(name, self.config.shards(shards))
            .await?;
        check_ack("create_index", acknowledged)?;
        self.refresh_index(name).await?;
        info!(index = name, "Created index");
        Ok(())
    }

    /// Refresh an index; fails unless at least one shard succeeded.
    pub async fn refresh_index(&self, name: &str) -> StoreResult<()> {
        let stats = self.store.refresh_index(name).await?;
        if stats.successful < 1 {
            return Err(StoreError::operation(
                "refresh_index",
                format!("Index fail in {} shards", stats.failed),
            ));
        }
        Ok(())
    }

    /// True only for a physical index; alias names do not count.
    pub async fn index_exists(&self, name: &str) -> StoreResult<bool> {
        Ok(self.store.exists(name).await? && !self.store.alias_exists(name).await?)
    }

    pub async fn alias_exists(&self, name: &str) -> StoreResult<bool> {
        self.store.alias_exists(name).await
    }

    /// Shard count of a physical index, `None` if it does not exist.
    pub async fn index_shards(&self, name: &str) -> StoreResult<Option<u32>> {
        Ok(self
            .store
            .index_settings(name)
            .await?
            .map(|settings| settings.shards))
    }

    pub async fn list_indices(&self, prefix: &str) -> StoreResult<Vec<IndexInfo>> {
        self.store.list_indices(prefix).await
    }

    pub async fn remove_index(&self, name: &str) -> StoreResult<()> {
        let acknowledged = self.store.delete_index(name).await?;
        check_ack("delete_index", acknowledged)?;
        info!(index = name, "Removed index");
        Ok(())
    }

    /// Point `name` at every index in `indices` in one alias update.
    pub async fn create_alias<S: AsRef<str>>(
        &self,
        name: &str,
        filter: Option<Query>,
        indices: &[S],
    ) -> StoreResult<()> {
        if indices.is_empty() {
            return Err(StoreError::config(format!(
                "alias `{name}` needs at least one index"
            )));
        }
        let actions = indices
            .iter()
            .map(|index| AliasAction::Add {
                alias: name.to_string(),
                index: index.as_ref().to_string(),
                filter: filter.clone(),
            })
            .collect();
        let acknowledged = self.store.update_aliases(actions).await?;
        check_ack("update_aliases", acknowledged)?;
        info!(alias = name, indices = indices.len(), "Created alias");
        Ok(())
    }

    /// Swap `name` from `from` to `to` in a single alias update.
    pub async fn move_alias(&self, name: &str, from: &str, to: &str) -> StoreResult<()> {
        let actions = vec![AliasAction::remove(name, from), AliasAction::add(name, to)];
        let acknowledged = self.store.update_aliases(actions).await?;
        check_ack("update_aliases", acknowledged)?;
        info!(alias = name, from, to, "Moved alias");
        Ok(())
    }

    /// Drop every pointer of `name`. No-op if it has none.
    pub async fn remove_alias(&self, name: &str) -> StoreResult<()> {
        let targets = self.indices_for_alias(name).await?;
        if targets.is_empty() {
            return Ok(());
        }
        let actions = targets
            .iter()
            .map(|index| AliasAction::remove(name, index.as_str()))
            .collect();
        let acknowledged = self.store.update_aliases(actions).await?;
        check_ack("update_aliases", acknowledged)?;
        info!(alias = name, "Removed alias");
        Ok(())
    }

    pub async fn indices_for_alias(&self, name: &str) -> StoreResult<BTreeSet<String>> {
        self.store.alias_targets(name).await
    }

    /// Copy every document of `source` into `target`; returns the count.
    ///
    /// Ids and categories are kept, versions start over. Chunks already
    /// written stay written when a later one fails.
    pub async fn copy_data(&self, source: &str, target: &str) -> StoreResult<u64> {
        let mut cursor = scroll_index(
            self.store.clone(),
            source,
            self.config.scroll_page_size,
            self.config.scroll_keep_alive,
        )
        .await?;
        let mut batch = IndexBatch::new(
            self.store.clone(),
            target,
            DEFAULT_CATEGORY,
            self.json,
            self.config.batch_size,
        )?;
        let outcome = async {
            let mut copied = 0u64;
            while cursor.advance().await? {
                batch.add_hit(cursor.next().await?).await?;
                copied += 1;
            }
            Ok::<u64, StoreError>(copied)
        }
        .await;
        let copied = batch.close(outcome).await?;
        info!(from = source, to = target, copied, "Copied index data");
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::page::WriteOp;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    fn admin(store: &Arc<MemoryStore>) -> Admin {
        Admin::new(store.clone(), ClientConfig::default(), Json::new())
    }

    #[tokio::test]
    async fn create_index_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let admin = admin(&store);
        admin.create_index("people", Some(2)).await.unwrap();
        admin.create_index("people", Some(2)).await.unwrap();
        assert_eq!(store.call_count("create_index"), 1);
        assert!(admin.index_exists("people").await.unwrap());
        assert_eq!(admin.index_shards("people").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn failed_refresh_fails_creation() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing_refresh(true);
        let err = admin(&store).create_index("people", Some(3)).await.unwrap_err();
        assert!(
            matches!(err, StoreError::StoreOperation { ref message, .. } if message == "Index fail in 3 shards")
        );
    }

    #[tokio::test]
    async fn alias_names_are_not_indices() {
        let store = Arc::new(MemoryStore::new());
        let admin = admin(&store);
        admin.create_index("people_v1", None).await.unwrap();
        admin.create_alias("people", None, &["people_v1"]).await.unwrap();
        assert!(!admin.index_exists("people").await.unwrap());
        assert!(admin.alias_exists("people").await.unwrap());
        assert_eq!(admin.index_shards("people_v1").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn move_alias_is_one_store_call() {
        let store = Arc::new(MemoryStore::new());
        let admin = admin(&store);
        admin.create_index("a", None).await.unwrap();
        admin.create_index("b", None).await.unwrap();
        admin.create_alias("live", None, &["a"]).await.unwrap();
        admin.move_alias("live", "a", "b").await.unwrap();

        assert_eq!(store.call_count("update_aliases"), 2);
        let history = store.alias_history("live");
        assert!(history.iter().all(|targets| targets.len() == 1));
        assert_eq!(
            admin.indices_for_alias("live").await.unwrap(),
            BTreeSet::from(["b".to_string()])
        );
    }

    #[tokio::test]
    async fn remove_alias_without_targets_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let admin = admin(&store);
        admin.remove_alias("ghost").await.unwrap();
        assert_eq!(store.call_count("update_aliases"), 0);

        admin.create_index("a", None).await.unwrap();
        admin.create_index("b", None).await.unwrap();
        admin.create_alias("both", None, &["a", "b"]).await.unwrap();
        admin.remove_alias("both").await.unwrap();
        assert!(!admin.alias_exists("both").await.unwrap());
    }

    #[tokio::test]
    async fn filtered_alias_exposes_a_partition() {
        let store = Arc::new(MemoryStore::new());
        let admin = admin(&store);
        admin.create_index("orders", None).await.unwrap();
        store
            .bulk_write(
                "orders",
                "order",
                vec![
                    WriteOp::new(Some("1".into()), json!({"region": "eu"})),
                    WriteOp::new(Some("2".into()), json!({"region": "us"})),
                ],
            )
            .await
            .unwrap();
        admin
            .create_alias("orders-eu", Some(Query::term("region", "eu")), &["orders"])
            .await
            .unwrap();
        assert_eq!(store.count("orders-eu", &Query::MatchAll, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn copy_keeps_ids_and_resets_versions() {
        let store = Arc::new(MemoryStore::new());
        let admin = Admin::new(
            store.clone(),
            ClientConfig::default().with_batch_size(7).with_scroll_page_size(4),
            Json::new(),
        );
        let ops = (0..20)
            .map(|i| WriteOp::new(Some(format!("d{i}")), json!({"i": i})))
            .collect::<Vec<_>>();
        store.bulk_write("src", "thing", ops.clone()).await.unwrap();
        store.bulk_write("src", "thing", ops).await.unwrap();
        admin.create_index("dst", None).await.unwrap();

        assert_eq!(admin.copy_data("src", "dst").await.unwrap(), 20);
        assert_eq!(store.call_count("bulk_write"), 2 + 3);
        let doc = store.get("dst", "d3").await.unwrap().unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.source, json!({"i": 3}));
        assert_eq!(store.count("dst", &Query::MatchAll, Some("thing")).await.unwrap(), 20);
        assert_eq!(store.open_scrolls(), 0);
    }

    #[tokio::test]
    async fn copy_propagates_partial_failure() {
        let store = Arc::new(MemoryStore::new());
        let admin = admin(&store);
        store
            .bulk_write(
                "src",
                "thing",
                vec![
                    WriteOp::new(Some("ok".into()), json!({})),
                    WriteOp::new(Some("bad".into()), json!({})),
                ],
            )
            .await
            .unwrap();
        store.reject_document("bad");
        let err = admin.copy_data("src", "dst").await.unwrap_err();
        assert!(matches!(err, StoreError::StoreOperation { .. }));
        assert!(store.get("dst", "ok").await.unwrap().is_some());
    }
}
