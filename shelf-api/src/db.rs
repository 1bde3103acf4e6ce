//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, and the
//! [`PostgresBookRepository`] that implements [`BookRepository`] over it.
//! Every statement is parameterized; user text never reaches the SQL string.

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use shelf_core::{
    AuthorId, Book, BookId, BookPatch, EntityIdType, PageRequest, PatchValue, StorageError,
    StorageResult, Timestamp,
};
use shelf_storage::BookRepository;
use std::fmt;
use std::time::Duration;
use tokio_postgres::{types::ToSql, NoTls, Row};
use uuid::Uuid;

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait/create timeout for pooled connections
    pub timeout: Duration,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("max_size", &self.max_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "shelf".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("SHELF_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("SHELF_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("SHELF_DB_NAME").unwrap_or_else(|_| "shelf".to_string()),
            user: std::env::var("SHELF_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("SHELF_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("SHELF_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("SHELF_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened here; the first checkout dials the server.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        pool_cfg.timeouts.create = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::service_unavailable(format!("Failed to create pool: {}", e)))
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS books (
    id          UUID PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    price       BIGINT NOT NULL DEFAULT 0,
    author_id   UUID NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS books_created_at_id_idx ON books (created_at, id);
CREATE INDEX IF NOT EXISTS books_author_id_idx ON books (author_id);
";

const BOOK_COLUMNS: &str = "id, title, description, price, author_id, created_at, updated_at";

// ============================================================================
// POSTGRES REPOSITORY
// ============================================================================

/// [`BookRepository`] backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PostgresBookRepository {
    pool: Pool,
}

impl PostgresBookRepository {
    /// Create a repository over an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a repository from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Create the `books` table and its indexes if they are missing.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        let conn = self.get_conn("ensure schema").await?;
        conn.batch_execute(SCHEMA_SQL)
            .await
            .map_err(|e| db_error("ensure schema", e))
    }

    async fn get_conn(&self, operation: &'static str) -> StorageResult<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| StorageError::persistence(operation, e.to_string()))
    }

    async fn query_page(
        &self,
        operation: &'static str,
        filter: Option<&str>,
        page: PageRequest,
    ) -> StorageResult<Vec<Book>> {
        let conn = self.get_conn(operation).await?;
        let limit = i64::from(page.limit());
        let offset = i64::try_from(page.offset())
            .map_err(|_| StorageError::invalid_argument("page", "offset out of range"))?;

        let rows = match filter {
            Some(query) => {
                let pattern = format!("%{}%", escape_like(query));
                let sql = format!(
                    "SELECT {BOOK_COLUMNS} FROM books \
                     WHERE title ILIKE $1 ESCAPE '\\' OR description ILIKE $1 ESCAPE '\\' \
                     ORDER BY created_at ASC, id ASC LIMIT $2 OFFSET $3"
                );
                conn.query(sql.as_str(), &[&pattern, &limit, &offset]).await
            }
            None => {
                let sql = format!(
                    "SELECT {BOOK_COLUMNS} FROM books \
                     ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2"
                );
                conn.query(sql.as_str(), &[&limit, &offset]).await
            }
        }
        .map_err(|e| db_error(operation, e))?;

        rows.iter().map(|row| book_from_row(operation, row)).collect()
    }
}

#[async_trait]
impl BookRepository for PostgresBookRepository {
    async fn insert(&self, book: &Book) -> StorageResult<Book> {
        const OP: &str = "insert book";
        let conn = self.get_conn(OP).await?;
        let sql = format!(
            "INSERT INTO books ({BOOK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {BOOK_COLUMNS}"
        );
        let row = conn
            .query_one(
                sql.as_str(),
                &[
                    &book.id.as_uuid(),
                    &book.title,
                    &book.description,
                    &book.price,
                    &book.author_id.as_uuid(),
                    &book.created_at,
                    &book.updated_at,
                ],
            )
            .await
            .map_err(|e| db_error(OP, e))?;
        book_from_row(OP, &row)
    }

    async fn get_by_id(&self, id: BookId) -> StorageResult<Book> {
        const OP: &str = "get book";
        let conn = self.get_conn(OP).await?;
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1");
        let row = conn
            .query_opt(sql.as_str(), &[&id.as_uuid()])
            .await
            .map_err(|e| db_error(OP, e))?
            .ok_or_else(|| StorageError::book_not_found(id))?;
        book_from_row(OP, &row)
    }

    async fn delete_by_id(&self, id: BookId) -> StorageResult<()> {
        const OP: &str = "delete book";
        let conn = self.get_conn(OP).await?;
        let affected = conn
            .execute("DELETE FROM books WHERE id = $1", &[&id.as_uuid()])
            .await
            .map_err(|e| db_error(OP, e))?;
        if affected == 0 {
            return Err(StorageError::book_not_found(id));
        }
        Ok(())
    }

    async fn update(&self, book: &Book, patch: &BookPatch) -> StorageResult<Book> {
        const OP: &str = "update book";
        let changes = patch.changed_fields();
        if changes.is_empty() {
            return self.get_by_id(book.id).await;
        }

        let now: Timestamp = Utc::now();
        let id = book.id.as_uuid();
        let (mut assignments, mut params) = set_clause(&changes);
        params.push(&now);
        assignments.push(format!("updated_at = ${}", params.len()));
        params.push(&id);

        let sql = format!(
            "UPDATE books SET {} WHERE id = ${} RETURNING {BOOK_COLUMNS}",
            assignments.join(", "),
            params.len()
        );

        tracing::debug!(
            book_id = %book.id,
            fields = ?changes.iter().map(|(column, _)| *column).collect::<Vec<_>>(),
            "Applying sparse book update"
        );

        let conn = self.get_conn(OP).await?;
        let row = conn
            .query_opt(sql.as_str(), &params)
            .await
            .map_err(|e| db_error(OP, e))?
            .ok_or_else(|| StorageError::book_not_found(book.id))?;
        book_from_row(OP, &row)
    }

    async fn list_page(&self, page: PageRequest) -> StorageResult<Vec<Book>> {
        self.query_page("list books", None, page).await
    }

    async fn search(&self, query: &str, page: PageRequest) -> StorageResult<Vec<Book>> {
        self.query_page("search books", Some(query), page).await
    }

    async fn count(&self) -> StorageResult<u64> {
        const OP: &str = "count books";
        let conn = self.get_conn(OP).await?;
        let row = conn
            .query_one("SELECT COUNT(*) FROM books", &[])
            .await
            .map_err(|e| db_error(OP, e))?;
        let count: i64 = row.try_get(0).map_err(|e| db_error(OP, e))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn health_check(&self) -> StorageResult<()> {
        const OP: &str = "health check";
        let conn = self.get_conn(OP).await?;
        conn.query_one("SELECT 1", &[])
            .await
            .map_err(|e| db_error(OP, e))?;
        Ok(())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn db_error(operation: &'static str, err: tokio_postgres::Error) -> StorageError {
    StorageError::persistence(operation, err.to_string())
}

fn book_from_row(operation: &'static str, row: &Row) -> StorageResult<Book> {
    let id: Uuid = row.try_get("id").map_err(|e| db_error(operation, e))?;
    let author_id: Uuid = row.try_get("author_id").map_err(|e| db_error(operation, e))?;
    Ok(Book {
        id: BookId::new(id),
        title: row.try_get("title").map_err(|e| db_error(operation, e))?,
        description: row
            .try_get("description")
            .map_err(|e| db_error(operation, e))?,
        price: row.try_get("price").map_err(|e| db_error(operation, e))?,
        author_id: AuthorId::new(author_id),
        created_at: row
            .try_get("created_at")
            .map_err(|e| db_error(operation, e))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| db_error(operation, e))?,
    })
}

/// `column = $n` assignments and their parameters for a sparse update.
fn set_clause<'a>(
    changes: &'a [(&'static str, PatchValue<'a>)],
) -> (Vec<String>, Vec<&'a (dyn ToSql + Sync)>) {
    let mut assignments = Vec::with_capacity(changes.len() + 1);
    let mut params: Vec<&'a (dyn ToSql + Sync)> = Vec::with_capacity(changes.len() + 2);
    for (column, value) in changes {
        params.push(match value {
            PatchValue::Text(text) => text as &(dyn ToSql + Sync),
            PatchValue::Amount(amount) => amount as &(dyn ToSql + Sync),
        });
        assignments.push(format!("{} = ${}", column, params.len()));
    }
    (assignments, params)
}

/// Escape `LIKE` metacharacters so user text matches literally.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
