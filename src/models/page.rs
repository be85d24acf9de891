//! Request and response shapes for paged retrieval and bulk writes.

use crate::models::document::Hit;
use crate::models::query::Query;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A paged (`from`/`size`) search.
#[derive(Clone, Debug, Default)]
pub struct SearchRequest {
    pub query: Query,
    /// `None` searches every category.
    pub category: Option<String>,
    pub from: u64,
    pub size: u64,
}

#[derive(Clone, Debug, Default)]
pub struct SearchPage {
    pub hits: Vec<Hit>,
    pub total: u64,
}

/// One page of a server-side scroll cursor.
///
/// `token` must be used for the next page; the store may issue a fresh one
/// with every response.
#[derive(Clone, Debug)]
pub struct ScrollPage {
    pub token: String,
    pub hits: Vec<Hit>,
    pub total: u64,
}

/// One document write. `version`, when set, is the expected stored version.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WriteOp {
    pub id: Option<String>,
    pub version: Option<u64>,
    /// Overrides the category of the enclosing write call.
    pub category: Option<String>,
    pub source: Value,
}

impl WriteOp {
    pub fn new(id: Option<String>, source: Value) -> Self {
        Self {
            id,
            version: None,
            category: None,
            source,
        }
    }
}

/// Written document coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteAck {
    pub id: String,
    pub version: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkItem {
    pub id: Option<String>,
    pub version: Option<u64>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct BulkResponse {
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    pub fn has_failures(&self) -> bool {
        self.items.iter().any(|item| item.error.is_some())
    }

    /// Store-style aggregate message listing every failed item.
    pub fn failure_message(&self) -> String {
        let failures = self
            .items
            .iter()
            .enumerate()
            .filter_map(|(position, item)| {
                item.error.as_ref().map(|error| {
                    format!(
                        "[{}]: index [{}], message [{}]",
                        position,
                        item.id.as_deref().unwrap_or("<auto>"),
                        error
                    )
                })
            })
            .collect::<Vec<_>>();
        format!("failure in bulk execution:\n{}", failures.join("\n"))
    }
}

/// Opens a server-side scroll cursor.
#[derive(Clone, Debug)]
pub struct ScrollRequest {
    pub query: Query,
    pub category: Option<String>,
    pub size: u64,
    pub keep_alive: std::time::Duration,
}
