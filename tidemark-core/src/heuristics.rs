//! Heuristic assessor: coarse verdict from dwell time and word count
//!
//! Pure arithmetic over already-collected metrics; no network, DOM, or
//! storage access. Cheap enough to run unconditionally early in the
//! pipeline. Engaged/committed verdicts from this stage are provisional:
//! they trigger deeper content validation rather than being final.

use crate::config::PipelineConfig;
use crate::types::{ContextSignal, HeuristicResult, Verdict};

/// Assess a page visit from its raw dwell time.
///
/// Thresholds (defaults): below glance (5s) discard, glance..read (30s)
/// ambient, read..study (120s) engaged, above study committed. Pages
/// with unusually short content get a lower glance bar (80% of the
/// threshold): a short note genuinely read takes less time, but a
/// 3-second skim still reads as a glance and is discarded.
pub fn assess(
    context: &ContextSignal,
    raw_dwell_time_ms: u64,
    config: &PipelineConfig,
) -> HeuristicResult {
    let short_content = context.word_count < config.short_content_words;
    let glance_ms = if short_content {
        config.glance_threshold_ms * 4 / 5
    } else {
        config.glance_threshold_ms
    };

    let (verdict, reason) = if raw_dwell_time_ms < glance_ms {
        (
            Verdict::Discard,
            format!(
                "dwell {}ms below glance threshold {}ms{}",
                raw_dwell_time_ms,
                glance_ms,
                if short_content { " (short content)" } else { "" }
            ),
        )
    } else if raw_dwell_time_ms < config.read_threshold_ms {
        (
            Verdict::Ambient,
            format!(
                "dwell {}ms between glance and read thresholds",
                raw_dwell_time_ms
            ),
        )
    } else if raw_dwell_time_ms < config.study_threshold_ms {
        (
            Verdict::Engaged,
            format!(
                "dwell {}ms between read and study thresholds",
                raw_dwell_time_ms
            ),
        )
    } else {
        (
            Verdict::Committed,
            format!("dwell {}ms above study threshold", raw_dwell_time_ms),
        )
    };

    // DOM-based validation is worth its cost only for engaged/committed;
    // ambient visits are accepted as low-confidence signal as-is.
    let should_validate_semantics = matches!(verdict, Verdict::Engaged | Verdict::Committed);

    HeuristicResult {
        verdict,
        reason,
        should_validate_semantics,
        dwell_time_ms: raw_dwell_time_ms,
    }
}
