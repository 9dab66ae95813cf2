//! Version-tracked database migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially. V2 seeds
//! the full onboarding step chain so a fresh database serves the whole flow.

use libsql::Connection;

use crate::error::StoreError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS steps (
                slug TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body_html TEXT NOT NULL,
                cta_label TEXT,
                next_slug TEXT
            );

            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at TEXT,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_kv_expires_at ON kv(expires_at);
        "#,
    },
    Migration {
        version: 2,
        name: "seed_onboarding_steps",
        sql: r#"
            INSERT OR IGNORE INTO steps (slug, title, body_html, cta_label, next_slug) VALUES
            ('signin', 'Sign in',
             '<p>Use Email, Google, or Wallet Connect.</p>',
             'Continue', 'connect-data'),
            ('connect-data', 'Connect data',
             '<p>Sync your financial sources.</p><ul><li>Bank</li><li>Wallet</li><li>Accounting Platform</li></ul>',
             'Connect', 'business-setup'),
            ('business-setup', 'Business setup',
             '<p>Tell us about your company: name, entity type, and fiscal year.</p>',
             'Continue', 'settings-setup'),
            ('settings-setup', 'Settings',
             '<p>Pick your base currency, reporting period, and notification defaults.</p>',
             'Continue', 'dashboard-preview'),
            ('dashboard-preview', 'Dashboard preview',
             '<p>Your KPIs at a glance: MRR, burn, runway, and cash position.</p>',
             'Continue', 'analytics-trends'),
            ('analytics-trends', 'Analytics & trends',
             '<p>Revenue and expense trends over the last twelve months.</p>',
             'Continue', 'profiles'),
            ('profiles', 'Profiles',
             '<p>Invite teammates and set their roles.</p>',
             'Continue', 'reports'),
            ('reports', 'Reports',
             '<p>Monthly, quarterly, and yearly report packs, exportable to PDF.</p>',
             'Continue', 'forecasting'),
            ('forecasting', 'Forecasting',
             '<p>Cash-flow forecast built from your connected sources.</p>',
             'Continue', 'alerts'),
            ('alerts', 'Alerts',
             '<p>Get notified when cash, burn, or receivables cross a threshold.</p>',
             'Continue', 'assistant'),
            ('assistant', 'Assistant',
             '<p>Ask questions about your numbers in plain language. You are all set.</p>',
             NULL, NULL);
        "#,
    },
];

/// Run all pending migrations against the given connection.
pub async fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| StoreError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = get_current_version(conn).await?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                StoreError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            record_version(conn, migration.version, migration.name).await?;
        }
    }

    Ok(())
}

/// Get the highest applied migration version, or 0 if none.
async fn get_current_version(conn: &Connection) -> Result<i64, StoreError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| StoreError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| StoreError::Migration(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => {
            let version: i64 = row.get(0).map_err(|e| {
                StoreError::Migration(format!("Failed to parse migration version: {e}"))
            })?;
            Ok(version)
        }
        None => Ok(0),
    }
}

/// Insert a version record into `_migrations`.
async fn record_version(conn: &Connection, version: i64, name: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| StoreError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}
