//! Offline capture queue with exponential-backoff retry
//!
//! Accepted captures that cannot be delivered immediately are persisted
//! here and retried with exponentially growing delays. The queue
//! survives restarts; an item is only removed after the backend
//! acknowledges it. Processing order follows `next_retry_at`, not
//! arrival order, so a stuck item never blocks fresh ones.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::CapturePayload;
use crate::config::QueueConfig;
use crate::db::Database;
use crate::delivery::is_retryable_error;
use crate::error::{Error, Result};

// ============================================
// Types
// ============================================

/// Delivery state of a queued capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    /// Waiting for its next delivery attempt
    Queued,
    /// A delivery attempt is in flight
    Sending,
    /// Retries exhausted; kept for inspection, never retried
    Failed,
}

impl CaptureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureState::Queued => "queued",
            CaptureState::Sending => "sending",
            CaptureState::Failed => "failed",
        }
    }
}

impl std::str::FromStr for CaptureState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(CaptureState::Queued),
            "sending" => Ok(CaptureState::Sending),
            "failed" => Ok(CaptureState::Failed),
            other => Err(Error::Capture(format!("unknown capture state: {}", other))),
        }
    }
}

/// One persisted queue entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedCapture {
    pub id: String,
    pub payload: CapturePayload,
    pub state: CaptureState,
    /// When the capture was first enqueued
    pub first_seen_at: DateTime<Utc>,
    /// Delivery attempts that have failed so far
    pub retry_count: u32,
    /// Earliest time the next attempt may run
    pub next_retry_at: DateTime<Utc>,
    /// Error from the most recent failed attempt
    pub last_error: Option<String>,
}

/// Outcome of one `process_queue` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Items attempted this pass
    pub processed: usize,
    /// Items delivered and removed
    pub succeeded: usize,
    /// Items that failed and were rescheduled (or marked terminal)
    pub failed: usize,
}

/// Queue counters for status display.
#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    /// Items waiting in `queued`
    pub pending: usize,
    /// Items currently `sending`
    pub sending: usize,
    /// Items in terminal `failed`
    pub failed: usize,
    /// Earliest scheduled retry among pending items
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Most recent delivery error recorded
    pub last_error: Option<String>,
}

// ============================================
// Backoff
// ============================================

/// Delay before the next attempt, given how many attempts have already
/// failed. Grows geometrically from `backoff_min_ms` and clamps at
/// `backoff_max_ms`.
pub fn backoff_delay_ms(retries: u32, config: &QueueConfig) -> u64 {
    let factor = (config.backoff_multiplier as u64)
        .checked_pow(retries)
        .unwrap_or(u64::MAX);
    config
        .backoff_min_ms
        .saturating_mul(factor)
        .min(config.backoff_max_ms)
}

// ============================================
// Queue
// ============================================

/// Persistent capture queue backed by SQLite.
pub struct CaptureQueue {
    db: Database,
    config: QueueConfig,
}

impl CaptureQueue {
    /// Wrap an open database.
    ///
    /// Any items stranded in `sending` by a previous crash are released
    /// back to `queued` so they become eligible again.
    pub fn new(db: Database, config: QueueConfig) -> Result<Self> {
        let released = db.release_inflight_captures()?;
        if released > 0 {
            tracing::warn!(released, "Released in-flight captures from previous run");
        }
        Ok(Self { db, config })
    }

    /// Enqueue a capture for delivery. The first attempt is eligible
    /// immediately. Returns the generated queue id.
    pub fn enqueue(&self, payload: CapturePayload, now: DateTime<Utc>) -> Result<String> {
        let capture = QueuedCapture {
            id: Uuid::new_v4().to_string(),
            payload,
            state: CaptureState::Queued,
            first_seen_at: now,
            retry_count: 0,
            next_retry_at: now,
            last_error: None,
        };
        self.db.insert_queued_capture(&capture)?;
        tracing::debug!(id = %capture.id, url = %capture.payload.url, "Capture enqueued");
        Ok(capture.id)
    }

    /// Run one delivery pass over everything currently due.
    ///
    /// `send` attempts delivery of one payload. A transient `Err` (5xx,
    /// timeout, connection trouble) reschedules the item with backoff;
    /// a non-retryable one (4xx, malformed payload) moves it straight
    /// to terminal `failed`, since repeating the same request cannot
    /// succeed. Each item is claimed before sending, so concurrent
    /// passes never double-send the same capture.
    pub async fn process_queue<F, Fut>(&self, send: F) -> Result<ProcessSummary>
    where
        F: Fn(CapturePayload) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let now = Utc::now();
        let due = self.db.due_captures(now, self.config.batch_limit)?;
        let mut summary = ProcessSummary::default();

        for capture in due {
            if !self.db.claim_capture(&capture.id)? {
                // Another pass got here first
                continue;
            }
            summary.processed += 1;

            match send(capture.payload.clone()).await {
                Ok(()) => {
                    self.db.delete_queued_capture(&capture.id)?;
                    summary.succeeded += 1;
                    tracing::info!(id = %capture.id, "Capture delivered");
                }
                Err(err) => {
                    self.record_failure(&capture, &err)?;
                    summary.failed += 1;
                }
            }
        }

        if summary.processed > 0 {
            tracing::info!(
                processed = summary.processed,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Queue pass complete"
            );
        }

        Ok(summary)
    }

    fn record_failure(&self, capture: &QueuedCapture, err: &Error) -> Result<()> {
        let attempts = capture.retry_count + 1;
        let exhausted = attempts > self.config.max_retries;
        let terminal = exhausted || !is_retryable_error(err);
        let delay = backoff_delay_ms(capture.retry_count, &self.config);
        let next_retry_at = Utc::now() + Duration::milliseconds(delay as i64);

        self.db
            .record_capture_failure(&capture.id, &err.to_string(), next_retry_at, terminal)?;

        if terminal {
            tracing::error!(
                id = %capture.id,
                attempts,
                retries_exhausted = exhausted,
                error = %err,
                "Capture permanently failed"
            );
        } else {
            tracing::warn!(
                id = %capture.id,
                attempts,
                retry_in_ms = delay,
                error = %err,
                "Capture delivery failed, rescheduled"
            );
        }
        Ok(())
    }

    /// Current queue counters.
    pub fn stats(&self) -> Result<QueueStats> {
        self.db.queue_stats()
    }

    /// Look up one entry by id.
    pub fn get(&self, id: &str) -> Result<Option<QueuedCapture>> {
        self.db.get_queued_capture(id)
    }
}

/// Blocking facade over queue processing for synchronous callers.
///
/// Owns a current-thread tokio runtime and a delivery client; the CLI
/// stays synchronous.
pub struct SyncQueueProcessor {
    runtime: tokio::runtime::Runtime,
    queue: CaptureQueue,
    client: crate::delivery::DeliveryClient,
}

impl SyncQueueProcessor {
    pub fn new(queue: CaptureQueue, client: crate::delivery::DeliveryClient) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            queue,
            client,
        })
    }

    /// Run one delivery pass against the configured backend.
    pub fn process(&self) -> Result<ProcessSummary> {
        let client = &self.client;
        self.runtime.block_on(self.queue.process_queue(|payload| async move {
            client.send_capture(&payload).await.map(|_| ())
        }))
    }

    /// Check backend reachability.
    pub fn health_check(&self) -> Result<bool> {
        self.runtime.block_on(self.client.health_check())
    }

    pub fn queue(&self) -> &CaptureQueue {
        &self.queue
    }
}

#[cfg(test)]
impl QueuedCapture {
    /// Minimal fixture for repository and queue tests.
    pub(crate) fn test_fixture(id: &str) -> Self {
        let now = Utc::now();
        QueuedCapture {
            id: id.to_string(),
            payload: CapturePayload {
                url: "https://example.com/post".to_string(),
                title: "A post".to_string(),
                domain: "example.com".to_string(),
                artifact_type: "engaged".to_string(),
                content_source: "web".to_string(),
                base_weight: 1.0,
                decay_rate: "medium".to_string(),
                dwell_time_ms: 45_000,
                scroll_depth: 0.9,
                reading_depth: 0.66,
                word_count: 1000,
                relevance: 0.5,
                captured_at: now,
                extracted_text: None,
                suggested_space_ids: None,
                top_similarity_score: None,
            },
            state: CaptureState::Queued,
            first_seen_at: now,
            retry_count: 0,
            next_retry_at: now,
            last_error: None,
        }
    }
}
