//! Content validator: structural quality heuristics
//!
//! Rejects low-substance pages (nav pages, SEO farms) using four
//! weighted checks over the page's structure. The validator contains no
//! DOM-access code: it operates on [`PageStructure`], a thin structural
//! reader implemented by a browser-specific adapter on the host side,
//! so the scoring logic is testable with synthetic input.

use crate::types::{ContentMetrics, SemanticResult};

/// Weights of the four quality checks. They sum to exactly 1.0 so the
/// confidence score is always in [0, 1].
const WEIGHT_PARAGRAPHS: f64 = 0.3;
const WEIGHT_WORDS_PER_PARAGRAPH: f64 = 0.2;
const WEIGHT_LINK_DENSITY: f64 = 0.2;
const WEIGHT_SENTENCES: f64 = 0.3;

/// Check thresholds.
const MIN_PARAGRAPHS: usize = 2;
const MIN_WORDS_PER_PARAGRAPH: f64 = 20.0;
const MAX_LINK_DENSITY: f64 = 0.4;
const MIN_SENTENCES: usize = 3;
const MIN_SENTENCE_CHARS: usize = 10;

/// Confidence needed for a page to count as substantive.
const VALID_CONFIDENCE: f64 = 0.6;

/// Structural view of a document, supplied by the host.
///
/// Capability-style interface: "get paragraph texts", "get link texts",
/// "get container text". The browser adapter queries the real DOM;
/// tests hand in fixtures.
pub trait PageStructure {
    /// Text content of each paragraph-level element
    fn paragraph_texts(&self) -> Vec<String>;
    /// Text content of each anchor element
    fn link_texts(&self) -> Vec<String>;
    /// Full text of the main content container
    fn container_text(&self) -> String;
}

/// Validate a page's structural quality.
///
/// Four independent signals each contribute a fixed weight to the
/// confidence score; `is_valid` requires confidence ≥ 0.6. The reason
/// string enumerates exactly which checks failed, for diagnostics and
/// any UI that surfaces rejection reasons.
pub fn validate(page: &dyn PageStructure) -> SemanticResult {
    let paragraphs = page.paragraph_texts();
    let container = page.container_text();

    let paragraph_count = paragraphs.len();
    let total_paragraph_words: usize = paragraphs.iter().map(|p| word_count(p)).sum();
    let avg_words_per_paragraph = if paragraph_count > 0 {
        total_paragraph_words as f64 / paragraph_count as f64
    } else {
        0.0
    };

    let link_chars: usize = page.link_texts().iter().map(|t| t.chars().count()).sum();
    let container_chars = container.chars().count();
    let link_density = if container_chars > 0 {
        (link_chars as f64 / container_chars as f64).min(1.0)
    } else {
        // No text at all reads as pure navigation
        1.0
    };

    let sentence_count = count_sentences(&container);

    let metrics = ContentMetrics {
        paragraph_count,
        avg_words_per_paragraph,
        link_density,
        sentence_count,
    };

    let mut confidence = 0.0;
    let mut failures: Vec<String> = Vec::new();

    if paragraph_count >= MIN_PARAGRAPHS {
        confidence += WEIGHT_PARAGRAPHS;
    } else {
        failures.push(format!(
            "paragraph count {} < {}",
            paragraph_count, MIN_PARAGRAPHS
        ));
    }

    if avg_words_per_paragraph >= MIN_WORDS_PER_PARAGRAPH {
        confidence += WEIGHT_WORDS_PER_PARAGRAPH;
    } else {
        failures.push(format!(
            "avg words/paragraph {:.1} < {}",
            avg_words_per_paragraph, MIN_WORDS_PER_PARAGRAPH
        ));
    }

    if link_density <= MAX_LINK_DENSITY {
        confidence += WEIGHT_LINK_DENSITY;
    } else {
        failures.push(format!(
            "link density {:.2} > {}",
            link_density, MAX_LINK_DENSITY
        ));
    }

    if sentence_count >= MIN_SENTENCES {
        confidence += WEIGHT_SENTENCES;
    } else {
        failures.push(format!("sentence count {} < {}", sentence_count, MIN_SENTENCES));
    }

    let is_valid = confidence >= VALID_CONFIDENCE;
    let reason = if failures.is_empty() {
        "all structural checks passed".to_string()
    } else {
        format!("failed checks: {}", failures.join("; "))
    };

    SemanticResult {
        is_valid,
        confidence,
        reason,
        metrics,
    }
}

/// Sentences are segments split on `.`, `!`, `?` that carry at least
/// `MIN_SENTENCE_CHARS` non-whitespace characters.
fn count_sentences(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|s| s.trim().chars().count() >= MIN_SENTENCE_CHARS)
        .count()
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
