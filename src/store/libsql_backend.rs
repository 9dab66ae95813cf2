//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. The `kv` table emulates the
//! externally-hosted key-value service: TTLs are stored as RFC 3339
//! `expires_at` timestamps and enforced on read.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::catalog::Step;
use crate::error::StoreError;
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a libsql Row to a Step.
///
/// Column order: 0:slug, 1:title, 2:body_html, 3:cta_label, 4:next_slug.
fn row_to_step(row: &libsql::Row) -> Result<Step, libsql::Error> {
    Ok(Step {
        slug: row.get(0)?,
        title: row.get(1)?,
        body_html: row.get(2)?,
        cta_label: row.get(3).ok(),
        next_slug: row.get(4).ok(),
    })
}

const STEP_COLUMNS: &str = "slug, title, body_html, cta_label, next_slug";

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), StoreError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Steps ───────────────────────────────────────────────────────

    async fn get_step(&self, slug: &str) -> Result<Option<Step>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {STEP_COLUMNS} FROM steps WHERE slug = ?1"),
                params![slug],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query step: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to read step row: {e}")))?;

        match row {
            Some(row) => {
                let step = row_to_step(&row)
                    .map_err(|e| StoreError::Query(format!("Failed to parse step row: {e}")))?;
                Ok(Some(step))
            }
            None => Ok(None),
        }
    }

    async fn list_steps(&self) -> Result<Vec<Step>, StoreError> {
        let mut rows = self
            .conn()
            .query(&format!("SELECT {STEP_COLUMNS} FROM steps"), ())
            .await
            .map_err(|e| StoreError::Query(format!("Failed to list steps: {e}")))?;

        let mut steps = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to read step row: {e}")))?
        {
            steps.push(
                row_to_step(&row)
                    .map_err(|e| StoreError::Query(format!("Failed to parse step row: {e}")))?,
            );
        }
        Ok(steps)
    }

    // ── Key-value ───────────────────────────────────────────────────

    async fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT value, expires_at FROM kv WHERE key = ?1",
                params![key],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query kv: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to read kv row: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let value: String = row
            .get(0)
            .map_err(|e| StoreError::Query(format!("Failed to parse kv value: {e}")))?;
        let expires_at: Option<String> = row.get(1).ok();

        if let Some(ref expires) = expires_at {
            if parse_datetime(expires) <= Utc::now() {
                // Lazy expiry: the row is already dead, drop it.
                self.kv_delete(key).await?;
                return Ok(None);
            }
        }

        Ok(Some(value))
    }

    async fn kv_put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = (Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero()))
        .to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO kv (key, value, expires_at, updated_at)
                 VALUES (?1, ?2, ?3, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     expires_at = excluded.expires_at,
                     updated_at = excluded.updated_at",
                params![key, value, expires_at],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to write kv: {e}")))?;
        Ok(())
    }

    async fn kv_delete(&self, key: &str) -> Result<(), StoreError> {
        self.conn()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .await
            .map_err(|e| StoreError::Query(format!("Failed to delete kv: {e}")))?;
        Ok(())
    }
}
