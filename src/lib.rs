//! Alias-versioned document buckets over a pluggable document store.
//!
//! A [`SearchClient`] hands out:
//! - [`Admin`] for index and alias topology and data copies
//! - [`Search`] for point reads, counts and paginated cursors
//! - [`Indexer`] for single, bulk and batched writes
//! - [`VersionedBucket`] for the create/wipe/refresh lifecycle behind an alias

pub mod client;
pub mod config;
pub mod errors;
pub mod json;
pub mod models;
pub mod services;
pub mod store;

pub use client::SearchClient;
pub use config::ClientConfig;
pub use errors::{StoreError, StoreResult};
pub use json::Json;
pub use models::bucket::{Bucket, Location, Namespaced};
pub use models::document::{Document, Hit, TypedDocument};
pub use models::query::Query;
pub use services::admin::Admin;
pub use services::batch::IndexBatch;
pub use services::cursor::{Cursor, CursorState, PageSource, ScrollCursor, SearchCursor};
pub use services::generation::GenerationScheme;
pub use services::indexer::Indexer;
pub use services::search::Search;
pub use services::versioned::VersionedBucket;
pub use store::DocumentStore;
pub use store::memory::MemoryStore;
pub use store::sqlite::SqliteStore;
