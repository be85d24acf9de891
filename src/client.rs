//! Entry point handing out admin, search and indexer handles that share one
//! store, one configuration and one serialization context.

use crate::config::ClientConfig;
use crate::errors::StoreResult;
use crate::json::Json;
use crate::models::bucket::{Bucket, Location};
use crate::services::admin::Admin;
use crate::services::indexer::Indexer;
use crate::services::search::Search;
use crate::services::versioned::VersionedBucket;
use crate::store::DocumentStore;
use std::sync::Arc;

/// Cheap to clone; every clone talks to the same store.
#[derive(Clone)]
pub struct SearchClient {
    store: Arc<dyn DocumentStore>,
    config: ClientConfig,
    json: Json,
}

impl SearchClient {
    /// Build a client, validating `config`.
    pub fn new(store: Arc<dyn DocumentStore>, config: ClientConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            json: Json::new(),
        })
    }

    pub fn with_json(mut self, json: Json) -> Self {
        self.json = json;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn json(&self) -> Json {
        self.json
    }

    pub fn admin(&self) -> Admin {
        Admin::new(self.store.clone(), self.config.clone(), self.json)
    }

    pub fn search(&self, location: &impl Location) -> Search {
        Search::new(self.store.clone(), location, self.config.clone(), self.json)
    }

    pub fn indexer(&self, location: &impl Location) -> Indexer {
        Indexer::new(self.store.clone(), location, self.config.clone(), self.json)
    }

    pub fn bucket(&self, location: &str, category: &str) -> StoreResult<Bucket> {
        Bucket::new(location, category)
    }

    pub fn versioned<L: Location>(&self, location: L) -> VersionedBucket<L> {
        self.admin().versioned(location)
    }
}
