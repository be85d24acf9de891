//! SqliteStore, a durable [`DocumentStore`] on SQLite.
//!
//! Indices, alias pointers and documents live in plain tables (see
//! `migrations/0001_init.sql`). Alias updates and bulk writes each run in a
//! single transaction. Scroll cursors are rows holding a keyset position
//! `(index_name, id)` and an expiry; the token stays stable across pages.

use super::{
    DEFAULT_SHARDS, DocumentStore, check_result_window, check_version, cursor_expiry,
    ensure_index_name_safe, generate_id, merge_patch, scroll_missing, validate_source,
};
use crate::errors::{StoreError, StoreResult};
use crate::models::document::{Document, Hit};
use crate::models::index::{AliasAction, IndexInfo, IndexSettings, ShardStats};
use crate::models::page::{
    BulkItem, BulkResponse, ScrollPage, ScrollRequest, SearchPage, SearchRequest, WriteAck,
    WriteOp,
};
use crate::models::query::Query;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const MIGRATION: &str = include_str!("../../migrations/0001_init.sql");

/// Indices (with alias filters) a read covers.
type Targets = Vec<(String, Option<Query>)>;

#[derive(FromRow)]
struct DocRow {
    index_name: String,
    id: String,
    category: String,
    version: i64,
    source: String,
}

impl DocRow {
    fn into_hit(self) -> StoreResult<Hit> {
        Ok(Hit {
            index: self.index_name,
            id: self.id,
            version: self.version as u64,
            category: self.category,
            source: serde_json::from_str(&self.source)?,
        })
    }
}

#[derive(FromRow)]
struct CursorRow {
    token: String,
    targets: String,
    category: Option<String>,
    query: String,
    page_size: i64,
    total: i64,
    last_index: Option<String>,
    last_id: Option<String>,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SqliteStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Open (creating if missing) the database at `url`.
    ///
    /// In-memory URLs get a single long-lived connection so every caller
    /// sees the same database.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Apply the embedded schema. Safe to run repeatedly.
    pub async fn migrate(&self) -> StoreResult<()> {
        let statements = MIGRATION
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        debug!("running {} migration statements", statements.len());
        for stmt in statements {
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }
}

async fn index_exists(conn: &mut SqliteConnection, name: &str) -> StoreResult<bool> {
    let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM indices WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(found > 0)
}

async fn alias_exists(conn: &mut SqliteConnection, name: &str) -> StoreResult<bool> {
    let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM aliases WHERE alias = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(found > 0)
}

async fn alias_pointers(conn: &mut SqliteConnection, alias: &str) -> StoreResult<Targets> {
    let rows: Vec<(String, Option<String>)> =
        sqlx::query_as("SELECT index_name, filter FROM aliases WHERE alias = ? ORDER BY index_name")
            .bind(alias)
            .fetch_all(&mut *conn)
            .await?;
    rows.into_iter()
        .map(|(index, filter)| -> StoreResult<(String, Option<Query>)> {
            let filter = filter.map(|f| serde_json::from_str::<Query>(&f)).transpose()?;
            Ok((index, filter))
        })
        .collect()
}

async fn create_index_row(
    conn: &mut SqliteConnection,
    name: &str,
    shards: Option<u32>,
) -> StoreResult<()> {
    ensure_index_name_safe(name)?;
    if alias_exists(conn, name).await? {
        return Err(StoreError::operation(
            "create_index",
            format!("[{name}] already exists as alias"),
        ));
    }
    let shards = shards.filter(|s| *s > 0).unwrap_or(DEFAULT_SHARDS);
    match sqlx::query("INSERT INTO indices (name, shards, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(shards as i64)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
    {
        Ok(_) => Ok(()),
        Err(err) if is_unique_violation(&err) => Err(StoreError::operation(
            "create_index",
            format!("index [{name}] already exists"),
        )),
        Err(err) => Err(StoreError::Sqlx(err)),
    }
}

async fn read_targets(conn: &mut SqliteConnection, target: &str) -> StoreResult<Targets> {
    if index_exists(conn, target).await? {
        return Ok(vec![(target.to_string(), None)]);
    }
    let pointers = alias_pointers(conn, target).await?;
    if pointers.is_empty() {
        return Err(StoreError::IndexNotFound(target.to_string()));
    }
    Ok(pointers)
}

/// The single physical index `target` names, if any.
async fn lookup_target(conn: &mut SqliteConnection, target: &str) -> StoreResult<Option<String>> {
    if index_exists(conn, target).await? {
        return Ok(Some(target.to_string()));
    }
    let pointers = alias_pointers(conn, target).await?;
    Ok(match pointers.as_slice() {
        [(index, _)] => Some(index.clone()),
        _ => None,
    })
}

async fn write_target(
    conn: &mut SqliteConnection,
    target: &str,
    operation: &str,
) -> StoreResult<String> {
    if index_exists(conn, target).await? {
        return Ok(target.to_string());
    }
    let pointers = alias_pointers(conn, target).await?;
    match pointers.as_slice() {
        [] => {
            create_index_row(conn, target, None).await?;
            Ok(target.to_string())
        }
        [(index, _)] => Ok(index.clone()),
        _ => Err(StoreError::operation(
            operation,
            format!(
                "alias [{target}] has {} indices, writes need exactly one",
                pointers.len()
            ),
        )),
    }
}

async fn put_document(
    conn: &mut SqliteConnection,
    index: &str,
    category: &str,
    op: WriteOp,
) -> StoreResult<WriteAck> {
    validate_source(&op.source)?;
    let id = op.id.unwrap_or_else(generate_id);
    let current: Option<i64> =
        sqlx::query_scalar("SELECT version FROM documents WHERE index_name = ? AND id = ?")
            .bind(index)
            .bind(&id)
            .fetch_optional(&mut *conn)
            .await?;
    let current = current.unwrap_or(0) as u64;
    check_version(index, &id, op.version, current)?;
    let version = current + 1;

    sqlx::query(
        r#"
        INSERT INTO documents (index_name, id, category, version, source)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(index_name, id) DO UPDATE SET
            category = excluded.category,
            version = excluded.version,
            source = excluded.source
        "#,
    )
    .bind(index)
    .bind(&id)
    .bind(op.category.as_deref().unwrap_or(category))
    .bind(version as i64)
    .bind(op.source.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(WriteAck { id, version })
}

/// Append `WHERE` clauses restricting rows to `targets`, `category` and `query`.
fn push_scope(
    builder: &mut QueryBuilder<'_, Sqlite>,
    targets: &Targets,
    query: &Query,
    category: Option<&str>,
) {
    builder.push(" WHERE (");
    for (position, (index, filter)) in targets.iter().enumerate() {
        if position > 0 {
            builder.push(" OR ");
        }
        builder.push("(index_name = ");
        builder.push_bind(index.clone());
        if let Some(filter) = filter {
            builder.push(" AND ");
            push_query(builder, filter);
        }
        builder.push(")");
    }
    builder.push(")");
    if let Some(category) = category {
        builder.push(" AND category = ");
        builder.push_bind(category.to_string());
    }
    builder.push(" AND ");
    push_query(builder, query);
}

fn push_query(builder: &mut QueryBuilder<'_, Sqlite>, query: &Query) {
    match query {
        Query::MatchAll => {
            builder.push("1 = 1");
        }
        Query::Term { field, value } => {
            // json_extract folds booleans into integers, so compare types too
            let path = format!("$.{field}");
            let literal = value.to_string();
            builder.push("(json_type(source, ");
            builder.push_bind(path.clone());
            builder.push(") = json_type(");
            builder.push_bind(literal.clone());
            builder.push(") AND json_extract(source, ");
            builder.push_bind(path);
            builder.push(") = json_extract(");
            builder.push_bind(literal);
            builder.push(", '$'))");
        }
        Query::All(clauses) if clauses.is_empty() => {
            builder.push("1 = 1");
        }
        Query::All(clauses) => {
            builder.push("(");
            for (position, clause) in clauses.iter().enumerate() {
                if position > 0 {
                    builder.push(" AND ");
                }
                push_query(builder, clause);
            }
            builder.push(")");
        }
    }
}

async fn count_scope(
    conn: &mut SqliteConnection,
    targets: &Targets,
    query: &Query,
    category: Option<&str>,
) -> StoreResult<u64> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM documents");
    push_scope(&mut builder, targets, query, category);
    let count: i64 = builder.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
    Ok(count as u64)
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn create_index(&self, name: &str, shards: Option<u32>) -> StoreResult<bool> {
        let mut tx = self.db.begin().await?;
        create_index_row(&mut tx, name, shards).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn refresh_index(&self, name: &str) -> StoreResult<ShardStats> {
        let shards: Option<i64> = sqlx::query_scalar("SELECT shards FROM indices WHERE name = ?")
            .bind(name)
            .fetch_optional(&*self.db)
            .await?;
        let shards = shards.ok_or_else(|| StoreError::IndexNotFound(name.to_string()))?;
        Ok(ShardStats {
            successful: shards as u32,
            failed: 0,
        })
    }

    async fn delete_index(&self, name: &str) -> StoreResult<bool> {
        let mut tx = self.db.begin().await?;
        let result = sqlx::query("DELETE FROM indices WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::IndexNotFound(name.to_string()));
        }
        sqlx::query("DELETE FROM documents WHERE index_name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM aliases WHERE index_name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn exists(&self, name: &str) -> StoreResult<bool> {
        let mut conn = self.db.acquire().await?;
        Ok(index_exists(&mut conn, name).await? || alias_exists(&mut conn, name).await?)
    }

    async fn alias_exists(&self, name: &str) -> StoreResult<bool> {
        let mut conn = self.db.acquire().await?;
        alias_exists(&mut conn, name).await
    }

    async fn index_settings(&self, name: &str) -> StoreResult<Option<IndexSettings>> {
        let shards: Option<i64> = sqlx::query_scalar("SELECT shards FROM indices WHERE name = ?")
            .bind(name)
            .fetch_optional(&*self.db)
            .await?;
        Ok(shards.map(|shards| IndexSettings {
            shards: shards as u32,
        }))
    }

    async fn list_indices(&self, prefix: &str) -> StoreResult<Vec<IndexInfo>> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            "SELECT i.name, i.shards,
                    (SELECT COUNT(*) FROM documents d WHERE d.index_name = i.name)
             FROM indices i ORDER BY i.name",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(rows
            .into_iter()
            .filter(|(name, _, _)| name.starts_with(prefix))
            .map(|(name, shards, doc_count)| IndexInfo {
                name,
                shards: shards as u32,
                doc_count: doc_count as u64,
            })
            .collect())
    }

    async fn update_aliases(&self, actions: Vec<AliasAction>) -> StoreResult<bool> {
        let mut tx = self.db.begin().await?;
        for action in &actions {
            ensure_index_name_safe(action.alias())?;
            if index_exists(&mut tx, action.alias()).await? {
                return Err(StoreError::operation(
                    "update_aliases",
                    format!(
                        "an index exists with the same name as the alias [{}]",
                        action.alias()
                    ),
                ));
            }
            match action {
                AliasAction::Add {
                    alias,
                    index,
                    filter,
                } => {
                    if !index_exists(&mut tx, index).await? {
                        return Err(StoreError::IndexNotFound(index.clone()));
                    }
                    let filter = filter.as_ref().map(serde_json::to_string).transpose()?;
                    sqlx::query(
                        "INSERT OR REPLACE INTO aliases (alias, index_name, filter) VALUES (?, ?, ?)",
                    )
                    .bind(alias)
                    .bind(index)
                    .bind(filter)
                    .execute(&mut *tx)
                    .await?;
                }
                AliasAction::Remove { alias, index } => {
                    let result =
                        sqlx::query("DELETE FROM aliases WHERE alias = ? AND index_name = ?")
                            .bind(alias)
                            .bind(index)
                            .execute(&mut *tx)
                            .await?;
                    if result.rows_affected() == 0 {
                        return Err(StoreError::operation(
                            "update_aliases",
                            format!("aliases [{alias}] missing on index [{index}]"),
                        ));
                    }
                }
            }
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn alias_targets(&self, alias: &str) -> StoreResult<BTreeSet<String>> {
        let mut conn = self.db.acquire().await?;
        Ok(alias_pointers(&mut conn, alias)
            .await?
            .into_iter()
            .map(|(index, _)| index)
            .collect())
    }

    async fn get(&self, target: &str, id: &str) -> StoreResult<Option<Document>> {
        let mut conn = self.db.acquire().await?;
        let Some(index) = lookup_target(&mut conn, target).await? else {
            return Ok(None);
        };
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT version, source FROM documents WHERE index_name = ? AND id = ?")
                .bind(&index)
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        row.map(|(version, source)| -> StoreResult<Document> {
            Ok(Document {
                id: Some(id.to_string()),
                version: version as u64,
                source: serde_json::from_str(&source)?,
            })
        })
        .transpose()
    }

    async fn index(&self, target: &str, category: &str, op: WriteOp) -> StoreResult<WriteAck> {
        let mut tx = self.db.begin().await?;
        let index = write_target(&mut tx, target, "index").await?;
        let ack = put_document(&mut tx, &index, category, op).await?;
        tx.commit().await?;
        Ok(ack)
    }

    async fn update(
        &self,
        target: &str,
        id: &str,
        patch: Value,
        expected_version: Option<u64>,
    ) -> StoreResult<WriteAck> {
        let mut tx = self.db.begin().await?;
        let index = lookup_target(&mut tx, target)
            .await?
            .ok_or_else(|| StoreError::IndexNotFound(target.to_string()))?;
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT version, source FROM documents WHERE index_name = ? AND id = ?")
                .bind(&index)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let (version, source) = row.ok_or_else(|| {
            StoreError::operation("update", format!("[{index}][{id}]: document missing"))
        })?;
        check_version(&index, id, expected_version, version as u64)?;

        let mut source: Value = serde_json::from_str(&source)?;
        merge_patch(&mut source, patch);
        validate_source(&source)?;
        let version = version + 1;
        sqlx::query("UPDATE documents SET source = ?, version = ? WHERE index_name = ? AND id = ?")
            .bind(source.to_string())
            .bind(version)
            .bind(&index)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(WriteAck {
            id: id.to_string(),
            version: version as u64,
        })
    }

    async fn delete(&self, target: &str, id: &str) -> StoreResult<bool> {
        let mut conn = self.db.acquire().await?;
        let Some(index) = lookup_target(&mut conn, target).await? else {
            return Ok(false);
        };
        let result = sqlx::query("DELETE FROM documents WHERE index_name = ? AND id = ?")
            .bind(&index)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn bulk_write(
        &self,
        target: &str,
        category: &str,
        ops: Vec<WriteOp>,
    ) -> StoreResult<BulkResponse> {
        let mut tx = self.db.begin().await?;
        let index = write_target(&mut tx, target, "bulk_write").await?;
        let mut response = BulkResponse::default();
        for op in ops {
            let requested = op.id.clone();
            let item = match put_document(&mut tx, &index, category, op).await {
                Ok(ack) => BulkItem {
                    id: Some(ack.id),
                    version: Some(ack.version),
                    error: None,
                },
                Err(StoreError::Sqlx(err)) => return Err(StoreError::Sqlx(err)),
                Err(err) => BulkItem {
                    id: requested,
                    version: None,
                    error: Some(err.to_string()),
                },
            };
            response.items.push(item);
        }
        tx.commit().await?;
        Ok(response)
    }

    async fn search(&self, target: &str, request: SearchRequest) -> StoreResult<SearchPage> {
        check_result_window(request.from, request.size)?;
        let mut conn = self.db.acquire().await?;
        let targets = read_targets(&mut conn, target).await?;
        let category = request.category.as_deref();
        let total = count_scope(&mut conn, &targets, &request.query, category).await?;

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT index_name, id, category, version, source FROM documents",
        );
        push_scope(&mut builder, &targets, &request.query, category);
        builder.push(" ORDER BY index_name ASC, id ASC LIMIT ");
        builder.push_bind(request.size as i64);
        builder.push(" OFFSET ");
        builder.push_bind(request.from as i64);
        let rows = builder.build_query_as::<DocRow>().fetch_all(&mut *conn).await?;

        let hits = rows
            .into_iter()
            .map(DocRow::into_hit)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(SearchPage { hits, total })
    }

    async fn count(
        &self,
        target: &str,
        query: &Query,
        category: Option<&str>,
    ) -> StoreResult<u64> {
        let mut conn = self.db.acquire().await?;
        let targets = read_targets(&mut conn, target).await?;
        count_scope(&mut conn, &targets, query, category).await
    }

    async fn open_scroll(&self, target: &str, request: ScrollRequest) -> StoreResult<ScrollPage> {
        if request.size == 0 {
            return Err(StoreError::operation(
                "open_scroll",
                "scroll size must be positive",
            ));
        }
        let mut conn = self.db.acquire().await?;
        sweep_scrolls(&mut conn).await?;
        let targets = read_targets(&mut conn, target).await?;
        let total = count_scope(&mut conn, &targets, &request.query, request.category.as_deref())
            .await?;

        let cursor = CursorRow {
            token: generate_id(),
            targets: serde_json::to_string(&targets)?,
            category: request.category,
            query: serde_json::to_string(&request.query)?,
            page_size: request.size as i64,
            total: total as i64,
            last_index: None,
            last_id: None,
            expires_at: cursor_expiry(request.keep_alive),
        };
        sqlx::query(
            "INSERT INTO scroll_cursors
                (token, targets, category, query, page_size, total, last_index, last_id, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, NULL, NULL, ?)",
        )
        .bind(&cursor.token)
        .bind(&cursor.targets)
        .bind(&cursor.category)
        .bind(&cursor.query)
        .bind(cursor.page_size)
        .bind(cursor.total)
        .bind(cursor.expires_at)
        .execute(&mut *conn)
        .await?;

        next_scroll_page(&mut conn, cursor, request.keep_alive).await
    }

    async fn scroll(&self, token: &str, keep_alive: Duration) -> StoreResult<ScrollPage> {
        let mut conn = self.db.acquire().await?;
        sweep_scrolls(&mut conn).await?;
        let cursor = sqlx::query_as::<_, CursorRow>(
            "SELECT token, targets, category, query, page_size, total, last_index, last_id, expires_at
             FROM scroll_cursors WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&mut *conn)
        .await?;
        let cursor = cursor.ok_or_else(|| scroll_missing(token))?;
        if cursor.expires_at < Utc::now() {
            sqlx::query("DELETE FROM scroll_cursors WHERE token = ?")
                .bind(token)
                .execute(&mut *conn)
                .await?;
            return Err(scroll_missing(token));
        }
        next_scroll_page(&mut conn, cursor, keep_alive).await
    }

    async fn clear_scroll(&self, token: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM scroll_cursors WHERE token = ?")
            .bind(token)
            .execute(&*self.db)
            .await?;
        Ok(())
    }
}

/// Delete cursors whose keep-alive has lapsed.
async fn sweep_scrolls(conn: &mut SqliteConnection) -> StoreResult<()> {
    let swept = sqlx::query("DELETE FROM scroll_cursors WHERE expires_at < ?")
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    if swept.rows_affected() > 0 {
        debug!("swept {} expired scroll cursors", swept.rows_affected());
    }
    Ok(())
}

/// Read the page after the cursor's keyset position and advance it.
async fn next_scroll_page(
    conn: &mut SqliteConnection,
    cursor: CursorRow,
    keep_alive: Duration,
) -> StoreResult<ScrollPage> {
    let targets: Targets = serde_json::from_str(&cursor.targets)?;
    let query: Query = serde_json::from_str(&cursor.query)?;

    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT index_name, id, category, version, source FROM documents",
    );
    push_scope(&mut builder, &targets, &query, cursor.category.as_deref());
    if let (Some(last_index), Some(last_id)) = (&cursor.last_index, &cursor.last_id) {
        builder.push(" AND (index_name, id) > (");
        builder.push_bind(last_index.clone());
        builder.push(", ");
        builder.push_bind(last_id.clone());
        builder.push(")");
    }
    builder.push(" ORDER BY index_name ASC, id ASC LIMIT ");
    builder.push_bind(cursor.page_size);
    let rows = builder.build_query_as::<DocRow>().fetch_all(&mut *conn).await?;
    let hits = rows
        .into_iter()
        .map(DocRow::into_hit)
        .collect::<StoreResult<Vec<_>>>()?;

    let (last_index, last_id) = match hits.last() {
        Some(hit) => (Some(hit.index.clone()), Some(hit.id.clone())),
        None => (cursor.last_index, cursor.last_id),
    };
    sqlx::query(
        "UPDATE scroll_cursors SET last_index = ?, last_id = ?, expires_at = ? WHERE token = ?",
    )
    .bind(last_index)
    .bind(last_id)
    .bind(cursor_expiry(keep_alive))
    .bind(&cursor.token)
    .execute(&mut *conn)
    .await?;

    Ok(ScrollPage {
        token: cursor.token,
        hits,
        total: cursor.total as u64,
    })
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
