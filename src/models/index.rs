//! Physical index and alias descriptions exchanged with the store.

use crate::models::query::Query;
use serde::{Deserialize, Serialize};

/// A physical index as listed by the store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub shards: u32,
    pub doc_count: u64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexSettings {
    pub shards: u32,
}

/// Outcome of an index refresh.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShardStats {
    pub successful: u32,
    pub failed: u32,
}

/// One step of an alias update. A list of actions is applied atomically.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AliasAction {
    Add {
        alias: String,
        index: String,
        filter: Option<Query>,
    },
    Remove {
        alias: String,
        index: String,
    },
}

impl AliasAction {
    pub fn add(alias: impl Into<String>, index: impl Into<String>) -> Self {
        AliasAction::Add {
            alias: alias.into(),
            index: index.into(),
            filter: None,
        }
    }

    pub fn remove(alias: impl Into<String>, index: impl Into<String>) -> Self {
        AliasAction::Remove {
            alias: alias.into(),
            index: index.into(),
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            AliasAction::Add { alias, .. } | AliasAction::Remove { alias, .. } => alias,
        }
    }

    pub fn index(&self) -> &str {
        match self {
            AliasAction::Add { index, .. } | AliasAction::Remove { index, .. } => index,
        }
    }
}
