//! Documents as stored, and hits as returned by queries.

use crate::errors::StoreResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored document.
///
/// `version` is assigned by the store; a value of `0` means "unknown" and
/// disables the optimistic-concurrency check on write.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Document {
    pub id: Option<String>,
    pub version: u64,
    pub source: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: Some(id.into()),
            version: 0,
            source,
        }
    }

    /// A document whose id the store assigns.
    pub fn anonymous(source: Value) -> Self {
        Self {
            id: None,
            version: 0,
            source,
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

/// A document whose source has been decoded into `T`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TypedDocument<T> {
    pub id: String,
    pub version: u64,
    pub source: T,
}

/// One query result.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Hit {
    /// Physical index the hit was read from.
    pub index: String,
    pub id: String,
    pub version: u64,
    pub category: String,
    pub source: Value,
}

impl Hit {
    pub fn into_document(self) -> Document {
        Document {
            id: Some(self.id),
            version: self.version,
            source: self.source,
        }
    }

    pub fn decode<T: DeserializeOwned>(self) -> StoreResult<TypedDocument<T>> {
        Ok(TypedDocument {
            source: serde_json::from_value(self.source)?,
            id: self.id,
            version: self.version,
        })
    }
}

impl From<Hit> for Document {
    fn from(hit: Hit) -> Self {
        hit.into_document()
    }
}
