use anyhow::{Context, Result};
use doc_buckets::config::{AppConfig, Command};
use doc_buckets::models::bucket::DEFAULT_CATEGORY;
use doc_buckets::{Bucket, SearchClient, SqliteStore, StoreResult};
use serde_json::Value;
use std::{path::Path, sync::Arc};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + command ---
    let (cfg, command) = AppConfig::from_env_and_args()?;
    tracing::debug!("Running {:?} with config: {:?}", command, cfg);

    // --- Ensure the database directory exists ---
    let db_path = cfg
        .database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    if !db_path.contains(":memory:") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating database directory {:?}", parent))?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }
    }

    // --- Initialize SQLite store ---
    let store = SqliteStore::connect(&cfg.database_url)
        .await
        .with_context(|| format!("connecting to {}", cfg.database_url))?;
    store.migrate().await.context("applying schema")?;

    if matches!(command, Command::Migrate) {
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    let client = SearchClient::new(Arc::new(store), cfg.client_config())?;
    run(&client, command).await
}

async fn run(client: &SearchClient, command: Command) -> Result<()> {
    let admin = client.admin();
    match command {
        Command::Migrate => {}
        Command::CreateIndex { name, shards } => {
            admin.create_index(&name, shards).await?;
        }
        Command::RemoveIndex { name } => {
            admin.remove_index(&name).await?;
        }
        Command::CreateBucket {
            alias,
            category,
            shards,
        } => {
            let bucket = client.versioned(Bucket::new(alias, category)?);
            bucket.create_index(shards).await?;
            println!("{}", bucket.actual_index().await?.unwrap_or_default());
        }
        Command::Wipe { alias, shards } => {
            let bucket = client.versioned(Bucket::new(alias, DEFAULT_CATEGORY)?);
            bucket.wipe(shards).await?;
            println!("{}", bucket.actual_index().await?.unwrap_or_default());
        }
        Command::Refresh { alias, shards } => {
            let bucket = client.versioned(Bucket::new(alias, DEFAULT_CATEGORY)?);
            bucket.refresh(shards).await?;
            println!("{}", bucket.actual_index().await?.unwrap_or_default());
        }
        Command::ActualIndex { alias } => {
            let bucket = client.versioned(Bucket::new(alias.as_str(), DEFAULT_CATEGORY)?);
            match bucket.actual_index().await? {
                Some(index) => println!("{index}"),
                None => anyhow::bail!("alias `{}` is not bound", alias),
            }
        }
        Command::Aliases { alias } => {
            for index in admin.indices_for_alias(&alias).await? {
                println!("{index}");
            }
        }
        Command::Copy { source, target } => {
            let copied = admin.copy_data(&source, &target).await?;
            println!("{copied}");
        }
        Command::Count { name } => {
            let count = client
                .store()
                .count(&name, &doc_buckets::Query::MatchAll, None)
                .await?;
            println!("{count}");
        }
        Command::Load {
            name,
            file,
            category,
        } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let bucket = Bucket::new(name, category)?;
            let loaded = load_lines(client, &bucket, &text).await?;
            tracing::info!("Loaded {} documents into {}", loaded, bucket.location());
            println!("{loaded}");
        }
    }
    Ok(())
}

/// Bulk load JSON lines. A top-level string `_id` becomes the document id.
async fn load_lines(client: &SearchClient, bucket: &Bucket, text: &str) -> StoreResult<u64> {
    let json = client.json();
    let indexer = client.indexer(bucket);
    indexer
        .batch_scope(client.config().batch_size, async |batch| {
            let mut loaded = 0u64;
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                let mut source: Value = json.from_str(line)?;
                let id = source
                    .as_object_mut()
                    .and_then(|object| object.remove("_id"))
                    .and_then(|id| id.as_str().map(str::to_string));
                batch.push(doc_buckets::models::page::WriteOp::new(id, source)).await?;
                loaded += 1;
            }
            Ok(loaded)
        })
        .await
}
