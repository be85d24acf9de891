//! Represents a logical bucket: the addressing handle every other component
//! operates against.

use crate::errors::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

/// Separator placed between a namespace prefix and the wrapped location.
pub const NAMESPACE_SEPARATOR: &str = "---";

/// Category for writes that do not name one.
pub const DEFAULT_CATEGORY: &str = "doc";

/// Anything that can name a location in the store.
///
/// Customisation (tenant prefixes and the like) is done by wrapping a
/// location, never by overriding a base type.
pub trait Location: Send + Sync {
    /// Index or alias name the location currently resolves to.
    fn resolve_location(&self) -> String;

    /// Document category used for routing reads and writes.
    fn category(&self) -> &str;

    /// Freeze the resolved location into a plain [`Bucket`].
    fn to_bucket(&self) -> Bucket {
        Bucket {
            location: self.resolve_location(),
            category: self.category().to_string(),
        }
    }
}

/// A named handle over an index or alias.
///
/// Buckets carry no state of their own; they are pure addressing values and
/// are cheap to clone and share.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bucket {
    /// Index or alias name.
    location: String,

    /// Document category (routing metadata).
    category: String,
}

impl Bucket {
    /// Build a bucket, rejecting empty names.
    pub fn new(location: impl Into<String>, category: impl Into<String>) -> StoreResult<Self> {
        let location = location.into();
        let category = category.into();
        if location.trim().is_empty() {
            return Err(StoreError::config("bucket location cannot be empty"));
        }
        if category.trim().is_empty() {
            return Err(StoreError::config("bucket category cannot be empty"));
        }
        Ok(Self { location, category })
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl Location for Bucket {
    fn resolve_location(&self) -> String {
        self.location.clone()
    }

    fn category(&self) -> &str {
        &self.category
    }
}

/// Prefixes the wrapped location with `<prefix>---`.
///
/// Applying the prefix is idempotent: a location that already carries it is
/// returned unchanged.
#[derive(Clone, Debug)]
pub struct Namespaced<L> {
    inner: L,
    prefix: String,
}

impl<L: Location> Namespaced<L> {
    pub fn new(inner: L, namespace: impl AsRef<str>) -> StoreResult<Self> {
        let namespace = namespace.as_ref();
        if namespace.trim().is_empty() {
            return Err(StoreError::config("namespace cannot be empty"));
        }
        Ok(Self {
            inner,
            prefix: format!("{namespace}{NAMESPACE_SEPARATOR}"),
        })
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L: Location> Location for Namespaced<L> {
    fn resolve_location(&self) -> String {
        let location = self.inner.resolve_location();
        if location.starts_with(&self.prefix) {
            location
        } else {
            format!("{}{}", self.prefix, location)
        }
    }

    fn category(&self) -> &str {
        self.inner.category()
    }
}
