//! Capture payload: the wire shape an artifact is hashed into
//!
//! Converts an accepted [`Artifact`] into the `CapturePayload` expected
//! by the backend capture endpoint. The field set, the content-source
//! mapping, and the weight/decay values are part of the payload
//! contract and must be preserved exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Artifact, ContentSource, EngagementLevel};

/// Extracted text is truncated to this many characters before sending.
const MAX_EXTRACTED_TEXT_CHARS: usize = 50_000;

/// Relevance reported when no centroid match was made.
const DEFAULT_RELEVANCE: f64 = 0.5;

/// Payload for the backend capture endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturePayload {
    pub url: String,
    pub title: String,
    pub domain: String,
    /// "ambient" | "engaged" | "committed"
    pub artifact_type: String,
    /// "web" | "ai" | "video" | "pdf"
    pub content_source: String,
    /// 0.2 / 1.0 / 2.0 by engagement level
    pub base_weight: f64,
    /// "high" | "medium" | "low" by engagement level
    pub decay_rate: String,
    pub dwell_time_ms: u64,
    /// Fraction scrolled, in [0, 1]
    pub scroll_depth: f64,
    /// Bounded reading depth, typically 0-1.5
    pub reading_depth: f64,
    pub word_count: u32,
    /// MatchResult score / 100, default 0.5 when no match
    pub relevance: f64,
    /// ISO-8601 capture timestamp
    pub captured_at: DateTime<Utc>,
    /// Only present for non-ambient captures; truncated to 50,000 chars
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_space_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_similarity_score: Option<f64>,
}

impl CapturePayload {
    /// Build the payload for an accepted artifact.
    pub fn from_artifact(artifact: &Artifact) -> Self {
        let level = artifact.level;
        let source: ContentSource = artifact.context.content_kind.content_source();

        let (relevance, suggested_space_ids, top_similarity_score) = match &artifact.match_info {
            Some(m) => (
                (m.score / 100.0).clamp(0.0, 1.0),
                if m.suggested_space_ids.is_empty() {
                    None
                } else {
                    Some(m.suggested_space_ids.clone())
                },
                m.top_match.as_ref().map(|t| t.similarity),
            ),
            None => (DEFAULT_RELEVANCE, None, None),
        };

        // Ambient captures carry no extracted text
        let extracted_text = if level == EngagementLevel::Ambient {
            None
        } else {
            artifact
                .extracted_text
                .as_deref()
                .map(truncate_chars)
        };

        CapturePayload {
            url: artifact.context.url.clone(),
            title: artifact.context.title.clone(),
            domain: artifact.context.domain.clone(),
            artifact_type: level.as_str().to_string(),
            content_source: source.as_str().to_string(),
            base_weight: level.base_weight(),
            decay_rate: level.decay_rate().to_string(),
            dwell_time_ms: artifact.engagement.dwell_time_ms,
            scroll_depth: artifact.engagement.scroll_depth,
            reading_depth: artifact.engagement.reading_depth,
            word_count: artifact.context.word_count,
            relevance,
            captured_at: artifact.captured_at,
            extracted_text,
            suggested_space_ids,
            top_similarity_score,
        }
    }
}

fn truncate_chars(text: &str) -> String {
    if text.chars().count() <= MAX_EXTRACTED_TEXT_CHARS {
        return text.to_string();
    }
    text.chars().take(MAX_EXTRACTED_TEXT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        CentroidMatch, ContentKind, ContextSignal, EngagementSnapshot, HeuristicResult,
        MatchResult, Verdict,
    };

    fn make_artifact(level: EngagementLevel, kind: ContentKind) -> Artifact {
        Artifact {
            level,
            context: ContextSignal {
                url: "https://example.com/post".to_string(),
                domain: "example.com".to_string(),
                title: "A post".to_string(),
                content_kind: kind,
                word_count: 1000,
                author: None,
                published_at: None,
                language: None,
            },
            engagement: EngagementSnapshot {
                dwell_time_ms: 45_000,
                max_scroll_offset: 900.0,
                scrollable_height: 1000.0,
                scroll_depth: 0.9,
                reading_depth: 0.66,
                word_count: 1000,
            },
            heuristic: HeuristicResult {
                verdict: Verdict::Engaged,
                reason: "test".to_string(),
                should_validate_semantics: true,
                dwell_time_ms: 45_000,
            },
            semantic: None,
            match_info: None,
            extracted_text: Some("body text".to_string()),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn engaged_artifact_payload_shape() {
        let payload = CapturePayload::from_artifact(&make_artifact(
            EngagementLevel::Engaged,
            ContentKind::Article,
        ));

        assert_eq!(payload.artifact_type, "engaged");
        assert_eq!(payload.content_source, "web");
        assert_eq!(payload.base_weight, 1.0);
        assert_eq!(payload.decay_rate, "medium");
        assert_eq!(payload.relevance, 0.5);
        assert_eq!(payload.extracted_text.as_deref(), Some("body text"));
        assert!(payload.suggested_space_ids.is_none());
    }

    #[test]
    fn ambient_drops_extracted_text() {
        let payload = CapturePayload::from_artifact(&make_artifact(
            EngagementLevel::Ambient,
            ContentKind::Article,
        ));

        assert_eq!(payload.artifact_type, "ambient");
        assert_eq!(payload.base_weight, 0.2);
        assert_eq!(payload.decay_rate, "high");
        assert!(payload.extracted_text.is_none());
    }

    #[test]
    fn content_source_mapping_survives_into_payload() {
        let chat = CapturePayload::from_artifact(&make_artifact(
            EngagementLevel::Committed,
            ContentKind::Chat,
        ));
        assert_eq!(chat.content_source, "ai");

        let video = CapturePayload::from_artifact(&make_artifact(
            EngagementLevel::Committed,
            ContentKind::Video,
        ));
        assert_eq!(video.content_source, "video");

        let pdf = CapturePayload::from_artifact(&make_artifact(
            EngagementLevel::Committed,
            ContentKind::Pdf,
        ));
        assert_eq!(pdf.content_source, "pdf");
    }

    #[test]
    fn match_info_sets_relevance_and_suggestions() {
        let mut artifact = make_artifact(EngagementLevel::Engaged, ContentKind::Article);
        artifact.match_info = Some(MatchResult {
            passed: true,
            top_match: Some(CentroidMatch {
                centroid_id: "c1".to_string(),
                space_id: "space-a".to_string(),
                subspace_id: None,
                similarity: 0.82,
            }),
            score: 82.0,
            suggested_space_ids: vec!["space-a".to_string()],
        });

        let payload = CapturePayload::from_artifact(&artifact);
        assert!((payload.relevance - 0.82).abs() < 1e-9);
        assert_eq!(
            payload.suggested_space_ids,
            Some(vec!["space-a".to_string()])
        );
        assert_eq!(payload.top_similarity_score, Some(0.82));
    }

    #[test]
    fn extracted_text_is_truncated() {
        let mut artifact = make_artifact(EngagementLevel::Committed, ContentKind::Article);
        artifact.extracted_text = Some("x".repeat(60_000));

        let payload = CapturePayload::from_artifact(&artifact);
        assert_eq!(
            payload.extracted_text.unwrap().chars().count(),
            MAX_EXTRACTED_TEXT_CHARS
        );
    }

    #[test]
    fn payload_serializes_without_absent_optionals() {
        let payload = CapturePayload::from_artifact(&make_artifact(
            EngagementLevel::Ambient,
            ContentKind::Article,
        ));
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("extracted_text").is_none());
        assert!(json.get("suggested_space_ids").is_none());
        assert_eq!(json["artifact_type"], "ambient");
    }
}
