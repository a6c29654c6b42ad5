//! Postgres-backed catalog of the host platform.
//!
//! # Design
//! - The schema belongs to the host; every table name carries the configured prefix.
//! - Statements are rendered once per catalog and kept for the process lifetime.
//! - Preview inserts are guarded by `WHERE NOT EXISTS`; without a unique
//!   constraint two concurrent runs can still both insert (at-least-once).

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;

use crate::error::{IndexError, IndexResult, map_sqlx_err};
use crate::traits::{Indexer, PreviewQueue, ScanReport, UserDirectory};

const INSTALLED_VERSION_KEY: &str = "installed_version";

/// SQL statements rendered for a specific table prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStatements {
    /// Resolve a file id from storage id and cache path.
    pub lookup_file_id: &'static str,
    /// List every user identifier.
    pub list_users: &'static str,
    /// Probe for a pending preview request.
    pub preview_exists: &'static str,
    /// Insert a preview request unless one is pending.
    pub preview_insert: &'static str,
    /// Check whether an app records an installed version.
    pub app_installed: &'static str,
}

impl CatalogStatements {
    /// Render statements for tables named `<prefix><table>`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidInput`] unless the prefix consists of
    /// ASCII alphanumerics and underscores.
    pub fn for_prefix(prefix: &str) -> IndexResult<Self> {
        if !prefix
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            return Err(IndexError::InvalidInput {
                field: "table_prefix",
                reason: "invalid_identifier",
                value: Some(prefix.to_string()),
            });
        }
        Ok(Self {
            lookup_file_id: leak(format!(
                "SELECT c.fileid FROM {prefix}filecache c \
                 INNER JOIN {prefix}storages s ON c.storage = s.numeric_id \
                 WHERE s.id = $1 AND c.path = $2 LIMIT 1"
            )),
            list_users: leak(format!("SELECT uid FROM {prefix}users ORDER BY uid")),
            preview_exists: leak(format!(
                "SELECT EXISTS (SELECT 1 FROM {prefix}preview_generation \
                 WHERE uid = $1 AND file_id = $2)"
            )),
            preview_insert: leak(format!(
                "INSERT INTO {prefix}preview_generation (uid, file_id) \
                 SELECT $1, $2 WHERE NOT EXISTS (SELECT 1 FROM {prefix}preview_generation \
                 WHERE uid = $1 AND file_id = $2)"
            )),
            app_installed: leak(format!(
                "SELECT EXISTS (SELECT 1 FROM {prefix}appconfig \
                 WHERE appid = $1 AND configkey = $2)"
            )),
        })
    }
}

fn leak(statement: String) -> &'static str {
    Box::leak(statement.into_boxed_str())
}

/// Read/insert access to the host platform's catalog tables.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
    statements: CatalogStatements,
    preview_app: String,
}

impl PgCatalog {
    /// Connect to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is invalid or the connection fails.
    #[instrument(name = "catalog.connect", skip(database_url))]
    pub async fn connect(
        database_url: &str,
        table_prefix: &str,
        preview_app: &str,
    ) -> IndexResult<Self> {
        let statements = CatalogStatements::for_prefix(table_prefix)?;
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|source| IndexError::Connect { source })?;
        Ok(Self {
            pool,
            statements,
            preview_app: preview_app.to_string(),
        })
    }

    /// Wrap an existing pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is invalid.
    pub fn from_pool(pool: PgPool, table_prefix: &str, preview_app: &str) -> IndexResult<Self> {
        Ok(Self {
            pool,
            statements: CatalogStatements::for_prefix(table_prefix)?,
            preview_app: preview_app.to_string(),
        })
    }

    /// Whether the preview generator app is installed on the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn preview_generator_installed(&self) -> IndexResult<bool> {
        sqlx::query_scalar::<_, bool>(self.statements.app_installed)
            .bind(&self.preview_app)
            .bind(INSTALLED_VERSION_KEY)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err("catalog.preview_generator_installed"))
    }

    /// Resolve the numeric file id of a cached path.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn file_id(&self, storage_id: &str, cache_path: &str) -> IndexResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(self.statements.lookup_file_id)
            .bind(storage_id)
            .bind(cache_path)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err("catalog.lookup_file_id"))
    }
}

#[async_trait]
impl Indexer for PgCatalog {
    async fn scan(&self, _path: &str) -> IndexResult<ScanReport> {
        Err(IndexError::Unsupported { operation: "scan" })
    }

    async fn lookup_file_id(
        &self,
        storage_id: &str,
        relative_path: &str,
    ) -> IndexResult<Option<i64>> {
        self.file_id(storage_id, relative_path).await
    }
}

#[async_trait]
impl UserDirectory for PgCatalog {
    async fn list_users(&self) -> IndexResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(self.statements.list_users)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err("catalog.list_users"))
    }
}

#[async_trait]
impl PreviewQueue for PgCatalog {
    async fn available(&self) -> IndexResult<bool> {
        self.preview_generator_installed().await
    }

    async fn exists(&self, user: &str, file_id: i64) -> IndexResult<bool> {
        sqlx::query_scalar::<_, bool>(self.statements.preview_exists)
            .bind(user)
            .bind(file_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err("catalog.preview_exists"))
    }

    async fn insert(&self, user: &str, file_id: i64) -> IndexResult<()> {
        sqlx::query(self.statements.preview_insert)
            .bind(user)
            .bind(file_id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_err("catalog.preview_insert"))
    }
}
