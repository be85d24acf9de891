//! Read access to one bucket.

use crate::config::ClientConfig;
use crate::errors::StoreResult;
use crate::json::Json;
use crate::models::bucket::{Bucket, Location};
use crate::models::document::{Document, Hit, TypedDocument};
use crate::models::query::Query;
use crate::services::cursor::{Cursor, OffsetPages, ScrollCursor, ScrollPages, SearchCursor};
use crate::store::DocumentStore;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Unfiltered scroll over a whole index or alias, every category included.
pub async fn scroll_index(
    store: Arc<dyn DocumentStore>,
    index: &str,
    page_size: u64,
    keep_alive: Duration,
) -> StoreResult<ScrollCursor> {
    let source = ScrollPages::new(store, index, Query::MatchAll, None, page_size, keep_alive)?;
    Cursor::open(source).await
}

/// Reads scoped to a bucket's location and category.
#[derive(Clone)]
pub struct Search {
    store: Arc<dyn DocumentStore>,
    bucket: Bucket,
    config: ClientConfig,
    json: Json,
}

impl Search {
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

    pub async fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        self.store.get(self.bucket.location(), id).await
    }

    /// Source of a document as a JSON value.
    pub async fn get_json(&self, id: &str) -> StoreResult<Option<Value>> {
        Ok(self.get(id).await?.map(|doc| doc.source))
    }

    /// Source of a document serialized as text.
    pub async fn get_str(&self, id: &str) -> StoreResult<Option<String>> {
        self.get_json(id)
            .await?
            .map(|source| self.json.to_string(&source))
            .transpose()
    }

    pub async fn get_as<T: DeserializeOwned>(
        &self,
        id: &str,
    ) -> StoreResult<Option<TypedDocument<T>>> {
        let Some(doc) = self.get(id).await? else {
            return Ok(None);
        };
        Ok(Some(TypedDocument {
            id: id.to_string(),
            version: doc.version,
            source: self.json.from_value(doc.source)?,
        }))
    }

    /// Documents of this bucket's category.
    pub async fn count(&self) -> StoreResult<u64> {
        self.count_matching(&Query::MatchAll).await
    }

    pub async fn count_matching(&self, query: &Query) -> StoreResult<u64> {
        self.store
            .count(self.bucket.location(), query, Some(self.bucket.category()))
            .await
    }

    /// Offset-paginated cursor with the configured page size.
    pub async fn search(&self, query: Query) -> StoreResult<SearchCursor> {
        self.search_paged(query, self.config.page_size).await
    }

    pub async fn search_paged(&self, query: Query, page_size: u64) -> StoreResult<SearchCursor> {
        let source = OffsetPages::new(
            self.store.clone(),
            self.bucket.location(),
            query,
            Some(self.bucket.category().to_string()),
            page_size,
            self.config.max_results,
        )?;
        Cursor::open(source).await
    }

    /// Scroll cursor with the configured page size and keep-alive.
    pub async fn scroll(&self, query: Query) -> StoreResult<ScrollCursor> {
        self.scroll_paged(query, self.config.scroll_page_size).await
    }

    pub async fn scroll_paged(&self, query: Query, page_size: u64) -> StoreResult<ScrollCursor> {
        let source = ScrollPages::new(
            self.store.clone(),
            self.bucket.location(),
            query,
            Some(self.bucket.category().to_string()),
            page_size,
            self.config.scroll_keep_alive,
        )?;
        Cursor::open(source).await
    }

    /// Scroll decoding every source into `T`.
    pub async fn scroll_as<T>(
        &self,
        query: Query,
    ) -> StoreResult<BoxStream<'static, StoreResult<TypedDocument<T>>>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        Ok(self.scroll(query).await?.map_stream(Hit::decode::<T>).boxed())
    }

    pub async fn scroll_documents(
        &self,
        query: Query,
    ) -> StoreResult<BoxStream<'static, StoreResult<Document>>> {
        Ok(self
            .scroll(query)
            .await?
            .map_stream(|hit| Ok(hit.into_document()))
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::page::WriteOp;
    use crate::store::memory::MemoryStore;
    use futures::TryStreamExt;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Person {
        name: String,
    }

    async fn people() -> (Arc<MemoryStore>, Search) {
        let store = Arc::new(MemoryStore::new());
        store
            .bulk_write(
                "people",
                "person",
                vec![
                    WriteOp::new(Some("ann".into()), json!({"name": "Ann", "team": "a"})),
                    WriteOp::new(Some("bob".into()), json!({"name": "Bob", "team": "b"})),
                ],
            )
            .await
            .unwrap();
        store
            .bulk_write(
                "people",
                "robot",
                vec![WriteOp::new(Some("r2".into()), json!({"name": "R2"}))],
            )
            .await
            .unwrap();
        let bucket = Bucket::new("people", "person").unwrap();
        let search = Search::new(store.clone(), &bucket, ClientConfig::default(), Json::new());
        (store, search)
    }

    #[tokio::test]
    async fn missing_documents_are_none() {
        let (_, search) = people().await;
        assert!(search.get("nobody").await.unwrap().is_none());
        assert!(search.get_as::<Person>("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn typed_and_text_reads() {
        let (_, search) = people().await;
        let ann = search.get_as::<Person>("ann").await.unwrap().unwrap();
        assert_eq!(ann.source, Person { name: "Ann".into() });
        assert_eq!(ann.version, 1);
        let text = search.get_str("bob").await.unwrap().unwrap();
        assert!(text.contains("\"Bob\""));
    }

    #[tokio::test]
    async fn counts_are_scoped_to_category() {
        let (store, search) = people().await;
        assert_eq!(search.count().await.unwrap(), 2);
        assert_eq!(search.count_matching(&Query::term("team", "b")).await.unwrap(), 1);
        assert_eq!(store.count("people", &Query::MatchAll, None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn typed_scroll_decodes_every_hit() {
        let (_, search) = people().await;
        let people: Vec<TypedDocument<Person>> = search
            .scroll_as::<Person>(Query::MatchAll)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let names: Vec<_> = people.into_iter().map(|p| p.source.name).collect();
        assert_eq!(names, vec!["Ann", "Bob"]);
    }

    #[tokio::test]
    async fn index_scroll_ignores_category() {
        let (store, _) = people().await;
        let hits = scroll_index(store, "people", 2, Duration::from_secs(60))
            .await
            .unwrap()
            .collect_all()
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
    }
}
