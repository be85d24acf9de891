//! Lazy, forward-only iteration over query results.
//!
//! A [`Cursor`] hides server-side pagination behind `has_next`/`next`. Pages
//! come from a [`PageSource`]; two strategies exist:
//! - [`OffsetPages`] re-runs the query with a growing `from`, capped at
//!   `max_results`
//! - [`ScrollPages`] walks a server-side scroll cursor, uncapped
//!
//! The cursor itself is an explicit state machine driven by
//! [`Cursor::advance`]. A cursor is single-owner; it is `Send` but not meant
//! to be shared.

use crate::errors::{StoreError, StoreResult};
use crate::models::document::Hit;
use crate::models::page::{ScrollRequest, SearchRequest};
use crate::models::query::Query;
use crate::store::DocumentStore;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt, stream};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One page of hits plus the total the store reported with it.
#[derive(Debug, Default)]
pub struct Page {
    pub hits: Vec<Hit>,
    pub total: u64,
}

/// Fetches successive pages for a [`Cursor`].
#[async_trait]
pub trait PageSource: Send {
    /// Fetch the page starting at `offset` hits into the result set.
    async fn fetch(&mut self, offset: u64) -> StoreResult<Page>;

    /// Hard limit on the number of hits this source can address.
    fn cap(&self) -> Option<u64> {
        None
    }

    /// Release server-side resources. Called once, when the cursor is done.
    async fn release(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

/// Offset (`from`/`size`) pagination.
pub struct OffsetPages {
    store: Arc<dyn DocumentStore>,
    target: String,
    query: Query,
    category: Option<String>,
    page_size: u64,
    max_results: u64,
}

impl OffsetPages {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        target: impl Into<String>,
        query: Query,
        category: Option<String>,
        page_size: u64,
        max_results: u64,
    ) -> StoreResult<Self> {
        if page_size == 0 {
            return Err(StoreError::config("page size must be positive"));
        }
        Ok(Self {
            store,
            target: target.into(),
            query,
            category,
            page_size,
            max_results,
        })
    }
}

#[async_trait]
impl PageSource for OffsetPages {
    async fn fetch(&mut self, offset: u64) -> StoreResult<Page> {
        // never ask past the cap, the store rejects oversized windows
        let size = self
            .page_size
            .min(self.max_results.saturating_sub(offset));
        let request = SearchRequest {
            query: self.query.clone(),
            category: self.category.clone(),
            from: offset,
            size,
        };
        debug!(location = %self.target, from = offset, size, "Fetching search page");
        let page = self.store.search(&self.target, request).await?;
        Ok(Page {
            hits: page.hits,
            total: page.total,
        })
    }

    fn cap(&self) -> Option<u64> {
        Some(self.max_results)
    }
}

/// Scroll-cursor pagination.
///
/// The store may hand back a new token with every page; the latest one is
/// always used for the next fetch and for the final clear.
pub struct ScrollPages {
    store: Arc<dyn DocumentStore>,
    target: String,
    query: Query,
    category: Option<String>,
    page_size: u64,
    keep_alive: Duration,
    token: Option<String>,
}

impl ScrollPages {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        target: impl Into<String>,
        query: Query,
        category: Option<String>,
        page_size: u64,
        keep_alive: Duration,
    ) -> StoreResult<Self> {
        if page_size == 0 {
            return Err(StoreError::config("scroll page size must be positive"));
        }
        Ok(Self {
            store,
            target: target.into(),
            query,
            category,
            page_size,
            keep_alive,
            token: None,
        })
    }
}

#[async_trait]
impl PageSource for ScrollPages {
    async fn fetch(&mut self, offset: u64) -> StoreResult<Page> {
        let page = match &self.token {
            None => {
                debug!(location = %self.target, size = self.page_size, "Opening scroll");
                let request = ScrollRequest {
                    query: self.query.clone(),
                    category: self.category.clone(),
                    size: self.page_size,
                    keep_alive: self.keep_alive,
                };
                self.store.open_scroll(&self.target, request).await?
            }
            Some(token) => {
                debug!(location = %self.target, offset, "Renewing scroll");
                self.store.scroll(token, self.keep_alive).await?
            }
        };
        self.token = Some(page.token);
        Ok(Page {
            hits: page.hits,
            total: page.total,
        })
    }

    async fn release(&mut self) -> StoreResult<()> {
        if let Some(token) = self.token.take() {
            self.store.clear_scroll(&token).await?;
        }
        Ok(())
    }
}

/// Where a cursor stands between calls.
#[derive(Debug)]
pub enum CursorState {
    /// Nothing fetched yet.
    Idle,
    /// A page is buffered; it may already be drained.
    Buffered(std::vec::IntoIter<Hit>),
    Exhausted,
}

pub struct Cursor<P> {
    source: P,
    state: CursorState,
    consumed: u64,
    total: Option<u64>,
}

pub type SearchCursor = Cursor<OffsetPages>;
pub type ScrollCursor = Cursor<ScrollPages>;

impl<P: PageSource> Cursor<P> {
    /// A cursor that fetches nothing until first used. Callers go through
    /// [`Cursor::open`] so `has_next` is accurate from the start.
    fn new(source: P) -> Self {
        Self {
            source,
            state: CursorState::Idle,
            consumed: 0,
            total: None,
        }
    }

    /// Build a cursor and fetch its first page.
    pub async fn open(source: P) -> StoreResult<Self> {
        let mut cursor = Self::new(source);
        cursor.advance().await?;
        Ok(cursor)
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// Hits handed out so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Total reported by the first page; `None` before it is fetched.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Number of hits this cursor will yield once `total` is known.
    fn limit(&self) -> u64 {
        let total = self.total.unwrap_or(u64::MAX);
        self.source.cap().map_or(total, |cap| total.min(cap))
    }

    pub fn has_next(&self) -> bool {
        match self.state {
            CursorState::Exhausted => false,
            _ => self.consumed < self.limit(),
        }
    }

    /// Move to a state where a hit is buffered, or to `Exhausted`.
    ///
    /// Fetches a page only when the buffer is drained and hits remain.
    /// Returns whether a hit is available.
    pub async fn advance(&mut self) -> StoreResult<bool> {
        if matches!(self.state, CursorState::Exhausted) {
            return Ok(false);
        }
        if self.consumed >= self.limit() {
            self.exhaust().await?;
            return Ok(false);
        }
        if let CursorState::Buffered(hits) = &self.state {
            if !hits.as_slice().is_empty() {
                return Ok(true);
            }
        }

        let page = self.source.fetch(self.consumed).await?;
        let total = *self.total.get_or_insert(page.total);
        if page.hits.is_empty() {
            if self.consumed < total {
                warn!(
                    consumed = self.consumed,
                    total, "Result set shrank while iterating"
                );
            }
            self.exhaust().await?;
            return Ok(false);
        }
        debug!(hits = page.hits.len(), consumed = self.consumed, total, "Buffered page");
        self.state = CursorState::Buffered(page.hits.into_iter());
        if self.consumed >= self.limit() {
            self.exhaust().await?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Return the next hit, fetching a page first if the buffer is drained.
    pub async fn next(&mut self) -> StoreResult<Hit> {
        if !self.advance().await? {
            return Err(StoreError::illegal_state("No next element"));
        }
        let hit = match &mut self.state {
            CursorState::Buffered(hits) => hits.next(),
            _ => None,
        };
        let Some(hit) = hit else {
            return Err(StoreError::illegal_state("No next element"));
        };
        self.consumed += 1;
        if self.consumed >= self.limit() {
            // The hit is already consumed; a failed release must not drop it.
            if let Err(err) = self.exhaust().await {
                warn!(error = %err, "Failed to release cursor");
            }
        }
        Ok(hit)
    }

    async fn exhaust(&mut self) -> StoreResult<()> {
        if matches!(self.state, CursorState::Exhausted) {
            return Ok(());
        }
        self.state = CursorState::Exhausted;
        self.source.release().await
    }

    /// Drain the cursor into a vector.
    pub async fn collect_all(mut self) -> StoreResult<Vec<Hit>> {
        let mut hits = Vec::new();
        while self.advance().await? {
            hits.push(self.next().await?);
        }
        Ok(hits)
    }

    /// Expose the cursor as a `Stream` of hits.
    pub fn into_stream(self) -> impl Stream<Item = StoreResult<Hit>> + Send
    where
        P: 'static,
    {
        stream::try_unfold(self, |mut cursor| async move {
            if !cursor.advance().await? {
                return Ok::<_, StoreError>(None);
            }
            let hit = cursor.next().await?;
            Ok(Some((hit, cursor)))
        })
    }

    /// Stream hits mapped through `convert`.
    pub fn map_stream<T, F>(self, convert: F) -> impl Stream<Item = StoreResult<T>> + Send
    where
        P: 'static,
        T: Send + 'static,
        F: FnMut(Hit) -> StoreResult<T> + Send + 'static,
    {
        let mut convert = convert;
        self.into_stream()
            .and_then(move |hit| futures::future::ready(convert(hit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::page::WriteOp;
    use crate::store::memory::MemoryStore;
    use serde_json::json;
    use std::collections::BTreeSet;

    async fn seeded(count: usize) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let ops = (0..count)
            .map(|i| WriteOp::new(Some(format!("{i:05}")), json!({"n": i})))
            .collect();
        store.bulk_write("items", "item", ops).await.unwrap();
        store
    }

    /// Serves canned pages and counts fetches.
    struct Canned {
        pages: Vec<Vec<Hit>>,
        total: u64,
        fetches: usize,
        released: usize,
        fail_release: bool,
    }

    fn canned(pages: Vec<Vec<Hit>>, total: u64) -> Canned {
        Canned {
            pages,
            total,
            fetches: 0,
            released: 0,
            fail_release: false,
        }
    }

    fn hit(id: &str) -> Hit {
        Hit {
            index: "items".into(),
            id: id.into(),
            version: 1,
            category: "item".into(),
            source: json!({}),
        }
    }

    #[async_trait]
    impl PageSource for Canned {
        async fn fetch(&mut self, _offset: u64) -> StoreResult<Page> {
            let hits = self.pages.get(self.fetches).cloned().unwrap_or_default();
            self.fetches += 1;
            Ok(Page {
                hits,
                total: self.total,
            })
        }

        async fn release(&mut self) -> StoreResult<()> {
            self.released += 1;
            if self.fail_release {
                return Err(StoreError::operation("clear_scroll", "connection reset"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn refetches_only_at_page_boundary() {
        let source = canned(vec![vec![hit("a"), hit("b")], vec![hit("c")]], 3);
        let mut cursor = Cursor::open(source).await.unwrap();
        assert_eq!(cursor.source.fetches, 1);
        assert_eq!(cursor.total(), Some(3));

        assert_eq!(cursor.next().await.unwrap().id, "a");
        assert_eq!(cursor.next().await.unwrap().id, "b");
        assert_eq!(cursor.source.fetches, 1);
        assert!(cursor.has_next());

        assert_eq!(cursor.next().await.unwrap().id, "c");
        assert_eq!(cursor.source.fetches, 2);
        assert!(!cursor.has_next());
        assert!(matches!(cursor.state(), CursorState::Exhausted));
        assert_eq!(cursor.source.released, 1);

        let err = cursor.next().await.unwrap_err();
        assert!(matches!(err, StoreError::IllegalState(ref m) if m == "No next element"));
        assert_eq!(cursor.source.released, 1);
    }

    #[tokio::test]
    async fn empty_page_ends_iteration() {
        let source = canned(vec![vec![hit("a")]], 5);
        let hits = Cursor::new(source).collect_all().await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn opened_cursor_over_empty_index_has_nothing() {
        let store = Arc::new(MemoryStore::new());
        store.create_index("items", Some(1)).await.unwrap();
        let source =
            OffsetPages::new(store.clone(), "items", Query::MatchAll, None, 10, 10_000).unwrap();
        let mut cursor = Cursor::open(source).await.unwrap();
        assert!(!cursor.has_next());
        assert_eq!(cursor.total(), Some(0));
        assert!(matches!(cursor.state(), CursorState::Exhausted));

        let err = cursor.next().await.unwrap_err();
        assert!(matches!(err, StoreError::IllegalState(_)));
        assert!(cursor.collect_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_release_still_returns_last_hit() {
        let mut source = canned(vec![vec![hit("a"), hit("b")]], 2);
        source.fail_release = true;
        let mut cursor = Cursor::open(source).await.unwrap();

        assert_eq!(cursor.next().await.unwrap().id, "a");
        assert_eq!(cursor.next().await.unwrap().id, "b");
        assert_eq!(cursor.source.released, 1);
        assert!(!cursor.has_next());
        assert_eq!(cursor.consumed(), 2);
    }

    #[tokio::test]
    async fn offset_cursor_yields_every_document_once() {
        let store = seeded(47).await;
        let source =
            OffsetPages::new(store.clone(), "items", Query::MatchAll, None, 10, 10_000).unwrap();
        let hits = Cursor::open(source).await.unwrap().collect_all().await.unwrap();

        let ids: BTreeSet<_> = hits.iter().map(|hit| hit.id.clone()).collect();
        assert_eq!(hits.len(), 47);
        assert_eq!(ids.len(), 47);
        assert_eq!(store.call_count("search"), 5);
    }

    #[tokio::test]
    async fn offset_cursor_stops_at_cap() {
        let store = seeded(40).await;
        let source =
            OffsetPages::new(store.clone(), "items", Query::MatchAll, None, 10, 25).unwrap();
        let hits = Cursor::open(source).await.unwrap().collect_all().await.unwrap();
        assert_eq!(hits.len(), 25);
        assert_eq!(store.call_count("search"), 3);
    }

    #[tokio::test]
    async fn scroll_cursor_renews_and_clears() {
        let store = seeded(30).await;
        let source = ScrollPages::new(
            store.clone(),
            "items",
            Query::MatchAll,
            None,
            10,
            Duration::from_secs(60),
        )
        .unwrap();
        let mut cursor = Cursor::open(source).await.unwrap();
        let mut ids = BTreeSet::new();
        while cursor.has_next() {
            ids.insert(cursor.next().await.unwrap().id);
        }
        assert_eq!(ids.len(), 30);
        assert_eq!(store.call_count("open_scroll"), 1);
        assert_eq!(store.call_count("scroll"), 2);
        assert_eq!(store.call_count("clear_scroll"), 1);
        assert_eq!(store.open_scrolls(), 0);
    }

    #[tokio::test]
    async fn stream_matches_manual_iteration() {
        let store = seeded(12).await;
        let source =
            OffsetPages::new(store, "items", Query::term("n", 3), None, 5, 10_000).unwrap();
        let hits: Vec<Hit> = Cursor::new(source).into_stream().try_collect().await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "00003");
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        assert!(OffsetPages::new(store, "items", Query::MatchAll, None, 0, 10).is_err());
    }
}
