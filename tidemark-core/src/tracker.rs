//! Engagement tracker: dwell time and scroll extent for one page view
//!
//! One tracker instance exists per logical page view. The host
//! environment owns the lifecycle: it creates a tracker when a page (or
//! an SPA route) becomes active, feeds it scroll and visibility events,
//! and takes a snapshot at capture time. SPA navigation is handled by
//! discarding the old instance and starting a new one; the tracker
//! itself never watches for URL changes.
//!
//! Timestamps are injected by the caller rather than read from a global
//! clock, which keeps dwell accounting deterministic under test.

use crate::types::{EngagementLevel, EngagementSnapshot};
use chrono::{DateTime, Utc};

/// Average adult reading speed used for the expected-read-time estimate.
const WORDS_PER_MINUTE: f64 = 200.0;

/// Cap on the dwell/expected ratio so an abandoned-but-open tab never
/// scores as deep engagement.
const TIME_RATIO_CAP: f64 = 1.5;

/// Weight of the time component in reading depth.
const TIME_WEIGHT: f64 = 0.6;

/// Weight of the scroll component in reading depth.
const SCROLL_WEIGHT: f64 = 0.4;

/// Accumulates dwell time and scroll extent for the active page.
///
/// Dwell time counts only while the page is foreground; visibility
/// changes pause and resume the clock. The scroll offset is a running
/// maximum ("furthest point read"), never the current position.
#[derive(Debug)]
pub struct EngagementTracker {
    word_count: u32,
    /// Dwell accumulated across completed visible intervals (ms)
    accumulated_ms: u64,
    /// Start of the current visible interval, None while hidden
    visible_since: Option<DateTime<Utc>>,
    /// Furthest scroll offset reached (px)
    max_scroll_offset: f64,
    stopped: bool,
}

impl EngagementTracker {
    /// Start tracking a new page view.
    ///
    /// `word_count` is the host's estimate from the main content
    /// container (or full-body text scaled down when no semantic
    /// container exists). The page starts visible at `now`.
    pub fn start(word_count: u32, now: DateTime<Utc>) -> Self {
        Self {
            word_count,
            accumulated_ms: 0,
            visible_since: Some(now),
            max_scroll_offset: 0.0,
            stopped: false,
        }
    }

    /// Record a scroll event. Only the running maximum is kept.
    pub fn record_scroll(&mut self, offset: f64) {
        if self.stopped {
            return;
        }
        if offset > self.max_scroll_offset {
            self.max_scroll_offset = offset;
        }
    }

    /// Record a visibility change. Hiding pauses the dwell clock,
    /// showing resumes it. Redundant transitions are ignored.
    pub fn visibility_changed(&mut self, visible: bool, now: DateTime<Utc>) {
        if self.stopped {
            return;
        }
        match (visible, self.visible_since) {
            (true, None) => self.visible_since = Some(now),
            (false, Some(since)) => {
                self.accumulated_ms += elapsed_ms(since, now);
                self.visible_since = None;
            }
            _ => {}
        }
    }

    /// Stop tracking. Safe to call more than once, and safe on a
    /// tracker that never saw any events.
    pub fn stop(&mut self, now: DateTime<Utc>) {
        if self.stopped {
            return;
        }
        if let Some(since) = self.visible_since.take() {
            self.accumulated_ms += elapsed_ms(since, now);
        }
        self.stopped = true;
    }

    /// Foreground dwell time up to `now`, in milliseconds.
    pub fn dwell_time_ms(&self, now: DateTime<Utc>) -> u64 {
        let live = self
            .visible_since
            .map(|since| elapsed_ms(since, now))
            .unwrap_or(0);
        self.accumulated_ms + live
    }

    /// Take an immutable snapshot of the metrics.
    ///
    /// `scrollable_height` is recomputed by the host at snapshot time
    /// rather than cached here, because lazy-loaded content changes the
    /// page height after initial load. Zero or negative heights are
    /// treated as 1 to guard the division.
    pub fn snapshot(&self, scrollable_height: f64, now: DateTime<Utc>) -> EngagementSnapshot {
        let height = if scrollable_height > 0.0 {
            scrollable_height
        } else {
            1.0
        };
        let dwell_time_ms = self.dwell_time_ms(now);
        let scroll_depth = (self.max_scroll_offset / height).min(1.0).max(0.0);
        let reading_depth = reading_depth(dwell_time_ms, self.word_count, scroll_depth);

        EngagementSnapshot {
            dwell_time_ms,
            max_scroll_offset: self.max_scroll_offset,
            scrollable_height: height,
            scroll_depth,
            reading_depth,
            word_count: self.word_count,
        }
    }
}

/// Compute the bounded reading-depth score.
///
/// `timeRatio = min(dwell / expected, 1.5)` where expected read time is
/// word count at 200 wpm; `depth = 0.6·timeRatio + 0.4·scrollRatio`.
pub fn reading_depth(dwell_time_ms: u64, word_count: u32, scroll_ratio: f64) -> f64 {
    let expected_read_ms = expected_read_time_ms(word_count);
    let time_ratio = (dwell_time_ms as f64 / expected_read_ms).min(TIME_RATIO_CAP);
    let scroll_ratio = scroll_ratio.clamp(0.0, 1.0);
    TIME_WEIGHT * time_ratio + SCROLL_WEIGHT * scroll_ratio
}

/// Expected read time in milliseconds at 200 words per minute.
///
/// A zero word count is treated as one word so the ratio stays finite.
pub fn expected_read_time_ms(word_count: u32) -> f64 {
    let words = word_count.max(1) as f64;
    words / WORDS_PER_MINUTE * 60_000.0
}

/// Engagement level for a snapshot, from its reading depth.
pub fn engagement_level(snapshot: &EngagementSnapshot) -> EngagementLevel {
    EngagementLevel::from_reading_depth(snapshot.reading_depth)
}

fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    to.signed_duration_since(from).num_milliseconds().max(0) as u64
}
