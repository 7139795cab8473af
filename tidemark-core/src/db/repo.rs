//! Database repository layer
//!
//! Provides query and insert operations for markers, centroids, and the
//! offline capture queue.

use crate::error::{Error, Result};
use crate::queue::{CaptureState, QueueStats, QueuedCapture};
use crate::types::{Centroid, Marker};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Mutex;

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode for better concurrency between the capture path and
        // the queue processor
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    // ============================================
    // Marker operations
    // ============================================

    /// Insert or update a marker
    pub fn upsert_marker(&self, marker: &Marker) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO markers (id, space_id, text, weight)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                space_id = excluded.space_id,
                text = excluded.text,
                weight = excluded.weight
            "#,
            params![marker.id, marker.space_id, marker.text, marker.weight],
        )?;
        Ok(())
    }

    /// List all markers.
    ///
    /// Callers snapshot this once at the top of a pipeline run and never
    /// re-read it mid-run.
    pub fn list_markers(&self) -> Result<Vec<Marker>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, space_id, text, weight FROM markers ORDER BY space_id, text")?;
        let markers = stmt
            .query_map([], |row| {
                Ok(Marker {
                    id: row.get(0)?,
                    space_id: row.get(1)?,
                    text: row.get(2)?,
                    weight: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(markers)
    }

    /// Delete a marker by id. Returns true if a row was removed.
    pub fn delete_marker(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM markers WHERE id = ?", [id])?;
        Ok(n > 0)
    }

    // ============================================
    // Centroid operations
    // ============================================

    /// Insert or update a centroid
    pub fn upsert_centroid(&self, centroid: &Centroid) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO centroids (id, space_id, subspace_id, label)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                space_id = excluded.space_id,
                subspace_id = excluded.subspace_id,
                label = excluded.label
            "#,
            params![
                centroid.id,
                centroid.space_id,
                centroid.subspace_id,
                centroid.label
            ],
        )?;
        Ok(())
    }

    /// List all centroids
    pub fn list_centroids(&self) -> Result<Vec<Centroid>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, space_id, subspace_id, label FROM centroids ORDER BY space_id")?;
        let centroids = stmt
            .query_map([], |row| {
                Ok(Centroid {
                    id: row.get(0)?,
                    space_id: row.get(1)?,
                    subspace_id: row.get(2)?,
                    label: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(centroids)
    }

    // ============================================
    // Queued capture operations
    // ============================================

    /// Insert a new queued capture
    pub fn insert_queued_capture(&self, capture: &QueuedCapture) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO queued_captures
                (id, payload, state, first_seen_at, retry_count, next_retry_at, last_error)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                capture.id,
                serde_json::to_string(&capture.payload)?,
                capture.state.as_str(),
                capture.first_seen_at.to_rfc3339(),
                capture.retry_count,
                capture.next_retry_at.to_rfc3339(),
                capture.last_error,
            ],
        )?;
        Ok(())
    }

    /// Get a queued capture by id
    pub fn get_queued_capture(&self, id: &str) -> Result<Option<QueuedCapture>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, payload, state, first_seen_at, retry_count, next_retry_at, last_error
             FROM queued_captures WHERE id = ?",
            [id],
            row_to_queued_capture,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Captures whose next retry is due at or before `now`, oldest-due
    /// first. Items mid-send or permanently failed are excluded.
    pub fn due_captures(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<QueuedCapture>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, payload, state, first_seen_at, retry_count, next_retry_at, last_error
             FROM queued_captures
             WHERE state = 'queued' AND next_retry_at <= ?1
             ORDER BY next_retry_at ASC
             LIMIT ?2",
        )?;
        let captures = stmt
            .query_map(params![now.to_rfc3339(), limit as i64], row_to_queued_capture)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(captures)
    }

    /// Atomically claim a capture for sending.
    ///
    /// Returns false if the item is already being sent (or is gone),
    /// which is the per-item guard against double-sends when
    /// process_queue is invoked from two triggers in quick succession.
    pub fn claim_capture(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE queued_captures SET state = 'sending' WHERE id = ? AND state = 'queued'",
            [id],
        )?;
        Ok(n > 0)
    }

    /// Remove a capture after successful delivery
    pub fn delete_queued_capture(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM queued_captures WHERE id = ?", [id])?;
        Ok(())
    }

    /// Record a failed delivery attempt.
    ///
    /// Increments the retry count, stores the error, moves the item back
    /// to `queued` with the given next retry time, or to terminal
    /// `failed` when the retry ceiling is reached.
    pub fn record_capture_failure(
        &self,
        id: &str,
        error: &str,
        next_retry_at: DateTime<Utc>,
        terminal: bool,
    ) -> Result<()> {
        let state = if terminal {
            CaptureState::Failed
        } else {
            CaptureState::Queued
        };
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE queued_captures
             SET retry_count = retry_count + 1,
                 last_error = ?2,
                 next_retry_at = ?3,
                 state = ?4
             WHERE id = ?1",
            params![id, error, next_retry_at.to_rfc3339(), state.as_str()],
        )?;
        if n == 0 {
            return Err(Error::CaptureNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Move any `sending` items back to `queued`.
    ///
    /// Called at startup: a crash mid-send must not strand items in the
    /// in-flight state forever.
    pub fn release_inflight_captures(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE queued_captures SET state = 'queued' WHERE state = 'sending'",
            [],
        )?;
        Ok(n)
    }

    /// Aggregate queue statistics
    pub fn queue_stats(&self) -> Result<QueueStats> {
        let conn = self.conn.lock().unwrap();

        let count_state = |state: &str| -> Result<usize> {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM queued_captures WHERE state = ?",
                [state],
                |r| r.get(0),
            )?;
            Ok(n as usize)
        };

        let pending = count_state("queued")?;
        let sending = count_state("sending")?;
        let failed = count_state("failed")?;

        let next_retry_at: Option<String> = conn
            .query_row(
                "SELECT MIN(next_retry_at) FROM queued_captures WHERE state = 'queued'",
                [],
                |r| r.get(0),
            )
            .optional()?
            .flatten();

        let last_error: Option<String> = conn
            .query_row(
                "SELECT last_error FROM queued_captures
                 WHERE last_error IS NOT NULL
                 ORDER BY next_retry_at DESC LIMIT 1",
                [],
                |r| r.get(0),
            )
            .optional()?;

        Ok(QueueStats {
            pending,
            sending,
            failed,
            next_retry_at: next_retry_at.as_deref().and_then(parse_ts),
            last_error,
        })
    }
}

fn row_to_queued_capture(row: &Row<'_>) -> rusqlite::Result<QueuedCapture> {
    let payload_json: String = row.get(1)?;
    let state_str: String = row.get(2)?;
    let first_seen: String = row.get(3)?;
    let next_retry: String = row.get(5)?;

    Ok(QueuedCapture {
        id: row.get(0)?,
        payload: serde_json::from_str(&payload_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?,
        state: state_str.parse().unwrap_or(CaptureState::Queued),
        first_seen_at: parse_ts(&first_seen).unwrap_or_else(Utc::now),
        retry_count: row.get(4)?,
        next_retry_at: parse_ts(&next_retry).unwrap_or_else(Utc::now),
        last_error: row.get(6)?,
    })
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
