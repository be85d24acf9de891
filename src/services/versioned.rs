//! Buckets whose name is always an alias over generations of physical
//! indices.
//!
//! States, named by what the alias points at:
//! - `Unbound`: the alias does not exist
//! - `Bound(n)`: the alias points at exactly one generation
//!
//! `wipe` and `refresh` move `Bound(n)` to `Bound(n + 1)` through a single
//! alias update, so a reader never sees the alias with zero or two targets.
//! The steps are not transactional: a failure leaves the state produced by
//! the last successful store call, and `actual_index` tells which one that
//! is.

use crate::errors::{StoreError, StoreResult};
use crate::models::bucket::{Bucket, Location};
use crate::services::admin::Admin;
use crate::services::generation::GenerationScheme;
use tracing::info;

pub struct VersionedBucket<L: Location = Bucket> {
    location: L,
    admin: Admin,
    scheme: GenerationScheme,
}

impl<L: Location> VersionedBucket<L> {
    pub fn new(location: L, admin: Admin) -> Self {
        let scheme = admin.config().generation_scheme;
        Self {
            location,
            admin,
            scheme,
        }
    }

    /// Use `scheme` instead of the configured one. Never mix schemes on one alias.
    pub fn with_scheme(mut self, scheme: GenerationScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn scheme(&self) -> GenerationScheme {
        self.scheme
    }

    pub fn alias(&self) -> String {
        self.location.resolve_location()
    }

    pub fn inner(&self) -> &L {
        &self.location
    }

    /// Physical index the alias currently resolves to; `None` while unbound.
    pub async fn actual_index(&self) -> StoreResult<Option<String>> {
        let alias = self.alias();
        let targets = self.admin.indices_for_alias(&alias).await?;
        Ok(self
            .scheme
            .current(&alias, targets.iter().map(String::as_str)))
    }

    /// Name the next generation would get.
    pub async fn next_index_name(&self) -> StoreResult<String> {
        let alias = self.alias();
        let existing = self
            .admin
            .list_indices(&self.scheme.prefix(&alias))
            .await?;
        self.scheme
            .next_name(&alias, existing.iter().map(|info| info.name.as_str()))
    }

    async fn bound_index(&self, operation: &str) -> StoreResult<String> {
        self.actual_index().await?.ok_or_else(|| {
            StoreError::illegal_state(format!(
                "cannot {operation} `{}`: alias is not bound to any generation",
                self.alias()
            ))
        })
    }

    /// Bind the alias to a first generation. No-op if already bound.
    pub async fn create_index(&self, shards: Option<u32>) -> StoreResult<()> {
        let alias = self.alias();
        if let Some(current) = self.actual_index().await? {
            info!(alias = %alias, index = %current, "Versioned bucket already bound");
            return Ok(());
        }
        let index = self.next_index_name().await?;
        self.admin.create_index(&index, shards).await?;
        self.admin.create_alias(&alias, None, &[&index]).await?;
        info!(alias = %alias, index = %index, "Bound versioned bucket");
        Ok(())
    }

    /// Swap the alias onto a new, empty generation and drop the old one.
    pub async fn wipe(&self, shards: Option<u32>) -> StoreResult<()> {
        let alias = self.alias();
        let current = self.bound_index("wipe").await?;
        let next = self.next_index_name().await?;
        self.admin.create_index(&next, shards).await?;
        self.admin.move_alias(&alias, &current, &next).await?;
        self.admin.remove_index(&current).await?;
        info!(alias = %alias, from = %current, to = %next, "Wiped versioned bucket");
        Ok(())
    }

    /// Rebuild into a new generation holding a copy of the current data,
    /// then swap the alias and drop the old generation.
    ///
    /// Writes that reach the old generation after the copy has read past
    /// them are lost.
    pub async fn refresh(&self, shards: Option<u32>) -> StoreResult<()> {
        let alias = self.alias();
        let current = self.bound_index("refresh").await?;
        let next = self.next_index_name().await?;
        self.admin.create_index(&next, shards).await?;
        let copied = self.admin.copy_data(&current, &next).await?;
        self.admin.refresh_index(&next).await?;
        self.admin.move_alias(&alias, &current, &next).await?;
        self.admin.remove_index(&current).await?;
        info!(
            alias = %alias,
            from = %current,
            to = %next,
            copied,
            "Refreshed versioned bucket; writes to the old generation during the copy are not carried over"
        );
        Ok(())
    }

    /// Create the next generation without touching the alias.
    ///
    /// Fill the returned bucket, then hand it to [`VersionedBucket::wrap`].
    pub async fn create_new_index(&self, shards: Option<u32>) -> StoreResult<Bucket> {
        let index = self.next_index_name().await?;
        self.admin.create_index(&index, shards).await?;
        info!(alias = %self.alias(), index = %index, "Staged new generation");
        Bucket::new(index, self.location.category())
    }

    /// Point the alias at `staged` in one alias update.
    ///
    /// Binds the alias if it was unbound. With `delete_old`, the previous
    /// generation is removed after the swap.
    pub async fn wrap(&self, staged: &impl Location, delete_old: bool) -> StoreResult<()> {
        let alias = self.alias();
        let staged = staged.resolve_location();
        match self.actual_index().await? {
            Some(current) if current == staged => Ok(()),
            Some(current) => {
                self.admin.move_alias(&alias, &current, &staged).await?;
                if delete_old {
                    self.admin.remove_index(&current).await?;
                }
                info!(alias = %alias, from = %current, to = %staged, "Wrapped staged generation");
                Ok(())
            }
            None => {
                self.admin.create_alias(&alias, None, &[&staged]).await?;
                info!(alias = %alias, index = %staged, "Bound versioned bucket to staged generation");
                Ok(())
            }
        }
    }
}

impl<L: Location> Location for VersionedBucket<L> {
    fn resolve_location(&self) -> String {
        self.alias()
    }

    fn category(&self) -> &str {
        self.location.category()
    }
}
