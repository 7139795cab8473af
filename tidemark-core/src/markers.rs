//! Marker recognizer: fast keyword matching against the user's marker set
//!
//! Markers are a small set (tens, not thousands), so matching is a
//! plain scan with case-insensitive containment. The page text window
//! is capped so the cost never scales with page length.

use crate::types::{ContextSignal, Marker, MarkerMatch};

/// How much page text the recognizer will look at.
///
/// Large pages would otherwise make marker matching
/// O(page-length x marker-count) on the capture path.
const TEXT_WINDOW_CHARS: usize = 20_000;

/// Match the marker set against the page's available signals.
///
/// A marker matches when its text appears (case-insensitive) in the
/// title, the URL, or the capped page-text window. `passed` is true iff
/// at least one marker matched; an empty marker set trivially returns
/// `passed = false` and the orchestrator treats "no markers configured"
/// as a non-gating condition.
pub fn recognize(context: &ContextSignal, page_text: &str, markers: &[Marker]) -> MarkerMatch {
    if markers.is_empty() {
        return MarkerMatch::default();
    }

    let title = context.title.to_lowercase();
    let url = context.url.to_lowercase();
    let window = text_window(page_text).to_lowercase();

    let mut matched_marker_ids = Vec::new();
    for marker in markers {
        let needle = marker.text.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        if title.contains(&needle) || url.contains(&needle) || window.contains(&needle) {
            matched_marker_ids.push(marker.id.clone());
        }
    }

    MarkerMatch {
        passed: !matched_marker_ids.is_empty(),
        matched_marker_ids,
    }
}

/// First `TEXT_WINDOW_CHARS` characters of the page text, on a char
/// boundary.
fn text_window(page_text: &str) -> &str {
    if page_text.len() <= TEXT_WINDOW_CHARS {
        return page_text;
    }
    let mut end = TEXT_WINDOW_CHARS;
    while !page_text.is_char_boundary(end) {
        end -= 1;
    }
    &page_text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentKind;

    fn context(title: &str, url: &str) -> ContextSignal {
        ContextSignal {
            url: url.to_string(),
            domain: "example.com".to_string(),
            title: title.to_string(),
            content_kind: ContentKind::Article,
            word_count: 500,
            author: None,
            published_at: None,
            language: None,
        }
    }

    #[test]
    fn matches_in_title_case_insensitive() {
        let ctx = context("Understanding Rust Lifetimes", "https://example.com/post");
        let markers = vec![Marker::new("m1", "space-rust", "rust")];

        let result = recognize(&ctx, "", &markers);
        assert!(result.passed);
        assert_eq!(result.matched_marker_ids, vec!["m1"]);
    }

    #[test]
    fn matches_in_url_and_body() {
        let ctx = context("A post", "https://example.com/wasm-intro");
        let markers = vec![
            Marker::new("m1", "s1", "wasm"),
            Marker::new("m2", "s2", "borrow checker"),
        ];

        let result = recognize(&ctx, "Notes on the Borrow Checker in practice", &markers);
        assert!(result.passed);
        assert_eq!(result.matched_marker_ids, vec!["m1", "m2"]);
    }

    #[test]
    fn no_markers_configured_is_not_a_match() {
        let ctx = context("Anything", "https://example.com");
        let result = recognize(&ctx, "body text", &[]);
        assert!(!result.passed);
        assert!(result.matched_marker_ids.is_empty());
    }

    #[test]
    fn empty_marker_text_is_skipped() {
        let ctx = context("Anything", "https://example.com");
        let markers = vec![Marker::new("m1", "s1", "")];
        let result = recognize(&ctx, "body text", &markers);
        assert!(!result.passed);
    }

    #[test]
    fn text_beyond_window_is_not_searched() {
        let ctx = context("Plain", "https://example.com");
        let mut body = "x".repeat(TEXT_WINDOW_CHARS);
        body.push_str(" hidden-needle");
        let markers = vec![Marker::new("m1", "s1", "hidden-needle")];

        let result = recognize(&ctx, &body, &markers);
        assert!(!result.passed);
    }

    #[test]
    fn window_respects_char_boundaries() {
        // Multibyte char straddling the cap must not panic
        let body = "é".repeat(TEXT_WINDOW_CHARS);
        let ctx = context("Plain", "https://example.com");
        let markers = vec![Marker::new("m1", "s1", "needle")];
        let result = recognize(&ctx, &body, &markers);
        assert!(!result.passed);
    }
}
