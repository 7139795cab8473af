//! Relevance matcher: page text vs. topic centroids
//!
//! The actual similarity computation lives behind [`CentroidScorer`],
//! an injected seam over the external embedding service. This module
//! applies the minimum-text guard, the pass threshold, the 0-100 score
//! scaling, and the multi-space tie-break policy.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::types::{Centroid, CentroidMatch, MatchResult};

/// External similarity primitive.
///
/// Implementations compare page text against a centroid and return a
/// similarity in [0, 1]. Embedding model internals are out of scope
/// for this crate.
pub trait CentroidScorer {
    fn similarity(&self, text: &str, centroid: &Centroid) -> Result<f64>;
}

/// Options for a relevance check.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceOptions {
    /// Minimum text length for matching; shorter text fails outright
    pub min_text_chars: usize,
    /// Raw similarity threshold a centroid must cross to count
    pub pass_threshold: f64,
    /// Trade accuracy for speed by sampling the text
    pub quick_mode: bool,
}

impl RelevanceOptions {
    pub fn from_config(config: &PipelineConfig, quick_mode: bool) -> Self {
        Self {
            min_text_chars: config.min_match_text_chars,
            pass_threshold: config.relevance_pass_threshold,
            quick_mode,
        }
    }
}

impl Default for RelevanceOptions {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default(), false)
    }
}

/// Sample sizes for quick mode: head, middle, and tail slices.
const QUICK_SLICE_CHARS: usize = 1_000;

/// Compare page text against the centroid set.
///
/// Text below `min_text_chars` is not matched at all (score 0, fail);
/// centroid similarity is unreliable on sparse text. The highest-scoring
/// centroid becomes `top_match`; every centroid above the pass threshold
/// contributes its parent space id to `suggested_space_ids`, enabling
/// multi-space assignment.
///
/// A scorer error for one centroid is logged and skipped rather than
/// failing the whole check; a page should not be lost because one
/// centroid comparison misbehaved.
pub fn check_relevance(
    page_text: &str,
    centroids: &[Centroid],
    scorer: &dyn CentroidScorer,
    options: RelevanceOptions,
) -> MatchResult {
    if !meets_min_chars(page_text, options.min_text_chars) || centroids.is_empty() {
        return MatchResult::default();
    }

    let text = if options.quick_mode {
        sample_text(page_text)
    } else {
        page_text.to_string()
    };

    let mut best: Option<CentroidMatch> = None;
    let mut suggested_space_ids: Vec<String> = Vec::new();

    for centroid in centroids {
        let similarity = match scorer.similarity(&text, centroid) {
            Ok(s) => s.clamp(0.0, 1.0),
            Err(e) => {
                tracing::warn!(
                    centroid_id = %centroid.id,
                    error = %e,
                    "Centroid similarity failed, skipping"
                );
                continue;
            }
        };

        if similarity >= options.pass_threshold
            && !suggested_space_ids.contains(&centroid.space_id)
        {
            suggested_space_ids.push(centroid.space_id.clone());
        }

        let is_better = best
            .as_ref()
            .map(|b| similarity > b.similarity)
            .unwrap_or(true);
        if is_better {
            best = Some(CentroidMatch {
                centroid_id: centroid.id.clone(),
                space_id: centroid.space_id.clone(),
                subspace_id: centroid.subspace_id.clone(),
                similarity,
            });
        }
    }

    let (passed, score) = match &best {
        Some(b) => (b.similarity >= options.pass_threshold, b.similarity * 100.0),
        None => (false, 0.0),
    };

    MatchResult {
        passed,
        top_match: best,
        score,
        suggested_space_ids,
    }
}

/// Whether `text` has at least `min` characters.
///
/// The minimum is a character count, not a byte count, so non-ASCII
/// pages are not held to a looser bar. Counts at most `min` chars so
/// the check stays O(min) on large pages.
pub(crate) fn meets_min_chars(text: &str, min: usize) -> bool {
    text.chars().take(min).count() >= min
}

/// Head + middle + tail sample of the text for quick mode.
fn sample_text(text: &str) -> String {
    if text.len() <= QUICK_SLICE_CHARS * 3 {
        return text.to_string();
    }

    let head = slice_at(text, 0, QUICK_SLICE_CHARS);
    let mid_start = text.len() / 2;
    let middle = slice_at(text, mid_start, QUICK_SLICE_CHARS);
    let tail_start = text.len().saturating_sub(QUICK_SLICE_CHARS);
    let tail = slice_at(text, tail_start, QUICK_SLICE_CHARS);

    format!("{} {} {}", head, middle, tail)
}

/// A `len`-char slice starting near `start`, snapped to char boundaries.
fn slice_at(text: &str, start: usize, len: usize) -> &str {
    let mut s = start.min(text.len());
    while s > 0 && !text.is_char_boundary(s) {
        s -= 1;
    }
    let mut e = (s + len).min(text.len());
    while e < text.len() && !text.is_char_boundary(e) {
        e += 1;
    }
    &text[s..e]
}
