use crate::errors::{StoreError, StoreResult};
use crate::services::generation::GenerationScheme;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Documents per bulk write.
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Hits per page for offset pagination.
pub const DEFAULT_PAGE_SIZE: u64 = 10;
/// Hits per page for scroll cursors.
pub const DEFAULT_SCROLL_PAGE_SIZE: u64 = 200;
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30 * 60);
/// Hard cap on offset pagination, mirroring the store's result window.
pub const DEFAULT_MAX_RESULTS: u64 = 10_000;

/// Tunables shared by every component a client hands out.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub batch_size: usize,
    pub page_size: u64,
    pub scroll_page_size: u64,
    pub scroll_keep_alive: Duration,
    pub max_results: u64,
    pub generation_scheme: GenerationScheme,
    /// Shards for indices created without an explicit count; `None` defers
    /// to the store.
    pub default_shards: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            scroll_page_size: DEFAULT_SCROLL_PAGE_SIZE,
            scroll_keep_alive: DEFAULT_KEEP_ALIVE,
            max_results: DEFAULT_MAX_RESULTS,
            generation_scheme: GenerationScheme::default(),
            default_shards: None,
        }
    }
}

impl ClientConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_scroll_page_size(mut self, scroll_page_size: u64) -> Self {
        self.scroll_page_size = scroll_page_size;
        self
    }

    pub fn with_scroll_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.scroll_keep_alive = keep_alive;
        self
    }

    pub fn with_max_results(mut self, max_results: u64) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_generation_scheme(mut self, scheme: GenerationScheme) -> Self {
        self.generation_scheme = scheme;
        self
    }

    pub fn with_default_shards(mut self, shards: u32) -> Self {
        self.default_shards = Some(shards);
        self
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.batch_size == 0 {
            return Err(StoreError::config("batch_size must be positive"));
        }
        if self.page_size == 0 || self.scroll_page_size == 0 {
            return Err(StoreError::config("page sizes must be positive"));
        }
        if self.max_results == 0 {
            return Err(StoreError::config("max_results must be positive"));
        }
        if self.scroll_keep_alive.is_zero() {
            return Err(StoreError::config("scroll_keep_alive must be positive"));
        }
        Ok(())
    }

    /// Resolve an explicit shard request against the configured default.
    pub fn shards(&self, requested: Option<u32>) -> Option<u32> {
        requested.filter(|s| *s > 0).or(self.default_shards)
    }
}

/// Configuration for the admin binary.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub batch_size: usize,
    pub generation_scheme: GenerationScheme,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Alias-versioned bucket administration")]
pub struct Args {
    /// Database URL (overrides DOC_BUCKETS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Documents per bulk write (overrides DOC_BUCKETS_BATCH_SIZE)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// `counter` or `random-hex` (overrides DOC_BUCKETS_GENERATION_SCHEME)
    #[arg(long)]
    pub generation_scheme: Option<GenerationScheme>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the schema and exit
    Migrate,
    /// Create a physical index (no-op if it exists)
    CreateIndex {
        name: String,
        #[arg(long)]
        shards: Option<u32>,
    },
    /// Delete a physical index
    RemoveIndex { name: String },
    /// Bind a versioned bucket's alias to its first generation
    CreateBucket {
        alias: String,
        #[arg(long, default_value = "doc")]
        category: String,
        #[arg(long)]
        shards: Option<u32>,
    },
    /// Swap a versioned bucket onto an empty generation
    Wipe {
        alias: String,
        #[arg(long)]
        shards: Option<u32>,
    },
    /// Rebuild a versioned bucket into a fresh generation holding a copy
    Refresh {
        alias: String,
        #[arg(long)]
        shards: Option<u32>,
    },
    /// Print the physical index behind a versioned alias
    ActualIndex { alias: String },
    /// List the indices an alias points at
    Aliases { alias: String },
    /// Copy every document from one index to another
    Copy { source: String, target: String },
    /// Count documents in an index or alias
    Count { name: String },
    /// Bulk load a JSON-lines file
    Load {
        name: String,
        file: PathBuf,
        #[arg(long, default_value = "doc")]
        category: String,
    },
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the command to run.
    pub fn from_env_and_args() -> Result<(Self, Command)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_db = env::var("DOC_BUCKETS_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/doc_buckets.db".into());
        let env_batch = match env::var("DOC_BUCKETS_BATCH_SIZE") {
            Ok(value) => value
                .parse::<usize>()
                .with_context(|| format!("parsing DOC_BUCKETS_BATCH_SIZE value `{}`", value))?,
            Err(env::VarError::NotPresent) => DEFAULT_BATCH_SIZE,
            Err(err) => return Err(err).context("reading DOC_BUCKETS_BATCH_SIZE"),
        };
        let env_scheme = match env::var("DOC_BUCKETS_GENERATION_SCHEME") {
            Ok(value) => value
                .parse::<GenerationScheme>()
                .context("parsing DOC_BUCKETS_GENERATION_SCHEME")?,
            Err(env::VarError::NotPresent) => GenerationScheme::default(),
            Err(err) => return Err(err).context("reading DOC_BUCKETS_GENERATION_SCHEME"),
        };

        // --- Merge ---
        let cfg = Self {
            database_url: args.database_url.unwrap_or(env_db),
            batch_size: args.batch_size.unwrap_or(env_batch),
            generation_scheme: args.generation_scheme.unwrap_or(env_scheme),
        };

        Ok((cfg, args.command))
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_batch_size(self.batch_size)
            .with_generation_scheme(self.generation_scheme)
    }
}
