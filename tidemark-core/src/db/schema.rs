//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Initial schema
    r#"
    -- ============================================
    -- User configuration: markers and centroids
    -- ============================================

    CREATE TABLE IF NOT EXISTS markers (
        id               TEXT PRIMARY KEY,
        space_id         TEXT NOT NULL,
        text             TEXT NOT NULL,
        weight           REAL NOT NULL DEFAULT 1.0
    );

    CREATE INDEX IF NOT EXISTS idx_markers_space ON markers(space_id);

    CREATE TABLE IF NOT EXISTS centroids (
        id               TEXT PRIMARY KEY,
        space_id         TEXT NOT NULL,
        subspace_id      TEXT,
        label            TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_centroids_space ON centroids(space_id);

    -- ============================================
    -- Offline capture queue
    -- ============================================

    -- One record per queued capture, keyed by generated id and indexed
    -- by next_retry_at for efficient "ready to retry" scans.
    CREATE TABLE IF NOT EXISTS queued_captures (
        id               TEXT PRIMARY KEY,
        payload          JSON NOT NULL,
        state            TEXT NOT NULL DEFAULT 'queued',  -- 'queued', 'sending', 'failed'
        first_seen_at    DATETIME NOT NULL,
        retry_count      INTEGER NOT NULL DEFAULT 0,
        next_retry_at    DATETIME NOT NULL,
        last_error       TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_queued_captures_retry
        ON queued_captures(next_retry_at);
    CREATE INDEX IF NOT EXISTS idx_queued_captures_state
        ON queued_captures(state) WHERE state != 'queued';
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
