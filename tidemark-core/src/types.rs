//! Core domain types for tidemark
//!
//! These types represent the data that flows through one classification
//! run: the page metadata observed at load time, the engagement numbers
//! accumulated while the page was open, the user's marker/centroid
//! configuration, and the intermediate and final pipeline outputs.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Space** | A top-level topic in the user's knowledge hierarchy |
//! | **Subspace** | A narrower topic nested under a Space |
//! | **Marker** | A user-defined keyword/phrase tagged to a Space |
//! | **Centroid** | A precomputed embedding representative of a Space or Subspace |
//! | **Artifact** | A fully accepted page capture, ready for delivery |
//! | **Capture** | The payload shape an Artifact is hashed into for the backend |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Content classification
// ============================================

/// Detected content type of a page, assigned at observation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Article,
    Video,
    Chat,
    Code,
    Forum,
    Social,
    Documentation,
    Pdf,
    Unknown,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::Video => "video",
            ContentKind::Chat => "chat",
            ContentKind::Code => "code",
            ContentKind::Forum => "forum",
            ContentKind::Social => "social",
            ContentKind::Documentation => "documentation",
            ContentKind::Pdf => "pdf",
            ContentKind::Unknown => "unknown",
        }
    }

    /// Map a content kind to the backend's `content_source` field.
    ///
    /// The mapping is part of the payload contract and must not change:
    /// video→video, chat→ai, pdf→pdf, everything else→web.
    pub fn content_source(&self) -> ContentSource {
        match self {
            ContentKind::Video => ContentSource::Video,
            ContentKind::Chat => ContentSource::Ai,
            ContentKind::Pdf => ContentSource::Pdf,
            _ => ContentSource::Web,
        }
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "article" => Ok(ContentKind::Article),
            "video" => Ok(ContentKind::Video),
            "chat" => Ok(ContentKind::Chat),
            "code" => Ok(ContentKind::Code),
            "forum" => Ok(ContentKind::Forum),
            "social" => Ok(ContentKind::Social),
            "documentation" => Ok(ContentKind::Documentation),
            "pdf" => Ok(ContentKind::Pdf),
            "unknown" => Ok(ContentKind::Unknown),
            _ => Err(format!("unknown content kind: {}", s)),
        }
    }
}

/// Backend `content_source` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Web,
    Ai,
    Video,
    Pdf,
}

impl ContentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSource::Web => "web",
            ContentSource::Ai => "ai",
            ContentSource::Video => "video",
            ContentSource::Pdf => "pdf",
        }
    }
}

// ============================================
// Engagement
// ============================================

/// Three-level categorical engagement label.
///
/// Derived from `reading_depth` by the tracker (≥0.7 committed,
/// ≥0.4 engaged, else ambient) or from dwell time by the heuristic
/// assessor. The level decides the capture's weight and decay rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
    Ambient,
    Engaged,
    Committed,
}

impl EngagementLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementLevel::Ambient => "ambient",
            EngagementLevel::Engaged => "engaged",
            EngagementLevel::Committed => "committed",
        }
    }

    /// Base weight contributed to the knowledge graph per the payload contract.
    pub fn base_weight(&self) -> f64 {
        match self {
            EngagementLevel::Ambient => 0.2,
            EngagementLevel::Engaged => 1.0,
            EngagementLevel::Committed => 2.0,
        }
    }

    /// Decay rate label per the payload contract.
    pub fn decay_rate(&self) -> &'static str {
        match self {
            EngagementLevel::Ambient => "high",
            EngagementLevel::Engaged => "medium",
            EngagementLevel::Committed => "low",
        }
    }

    /// Map a reading-depth score to an engagement level.
    pub fn from_reading_depth(depth: f64) -> Self {
        if depth >= 0.7 {
            EngagementLevel::Committed
        } else if depth >= 0.4 {
            EngagementLevel::Engaged
        } else {
            EngagementLevel::Ambient
        }
    }
}

impl std::str::FromStr for EngagementLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ambient" => Ok(EngagementLevel::Ambient),
            "engaged" => Ok(EngagementLevel::Engaged),
            "committed" => Ok(EngagementLevel::Committed),
            _ => Err(format!("unknown engagement level: {}", s)),
        }
    }
}

/// Lightweight page metadata captured once at observation time.
///
/// Immutable after creation; owned by the orchestrator for the duration
/// of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSignal {
    /// Full page URL
    pub url: String,
    /// Normalized domain (lowercased host)
    pub domain: String,
    /// Page title
    pub title: String,
    /// Detected content type
    pub content_kind: ContentKind,
    /// Estimated word count of the main content
    pub word_count: u32,
    /// Author, if detected
    pub author: Option<String>,
    /// Published date, if detected
    pub published_at: Option<DateTime<Utc>>,
    /// Page language, if detected
    pub language: Option<String>,
}

/// Immutable snapshot of engagement metrics at capture time.
///
/// Produced by [`crate::tracker::EngagementTracker::snapshot`]; never
/// mutated afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngagementSnapshot {
    /// Foreground dwell time in milliseconds
    pub dwell_time_ms: u64,
    /// Furthest scroll offset reached, in pixels
    pub max_scroll_offset: f64,
    /// Total scrollable height at snapshot time, in pixels
    pub scrollable_height: f64,
    /// Fraction of the page scrolled through, in [0, 1]
    pub scroll_depth: f64,
    /// Bounded reading-depth score, in [0, 1.5]
    pub reading_depth: f64,
    /// Word count the depth was computed against
    pub word_count: u32,
}

// ============================================
// Markers and centroids
// ============================================

/// A user-defined keyword/phrase tagged to a space.
///
/// The marker set is small (tens, not thousands) and is loaded once at
/// the top of each pipeline run as an immutable snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marker {
    /// Unique identifier
    pub id: String,
    /// Space this marker is tagged to
    pub space_id: String,
    /// Keyword or phrase to match
    pub text: String,
    /// Relative importance (default 1.0)
    pub weight: f64,
}

impl Marker {
    pub fn new(id: impl Into<String>, space_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            space_id: space_id.into(),
            text: text.into(),
            weight: 1.0,
        }
    }
}

/// A precomputed semantic-embedding representative of a space or subspace.
///
/// Opaque to this crate beyond "compare page text against it, get a
/// similarity in [0, 1]" via [`crate::relevance::CentroidScorer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Centroid {
    /// Unique identifier
    pub id: String,
    /// Parent space
    pub space_id: String,
    /// Subspace, if this centroid represents one
    pub subspace_id: Option<String>,
    /// Human-friendly label
    pub label: String,
}

// ============================================
// Stage outputs
// ============================================

/// Output of the marker recognizer.
#[derive(Debug, Clone, Default)]
pub struct MarkerMatch {
    /// True iff at least one marker matched
    pub passed: bool,
    /// IDs of markers that matched
    pub matched_marker_ids: Vec<String>,
}

/// The best-matching centroid from a relevance check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentroidMatch {
    /// Centroid that matched
    pub centroid_id: String,
    /// Parent space of the centroid
    pub space_id: String,
    /// Subspace, if the centroid represents one
    pub subspace_id: Option<String>,
    /// Raw similarity in [0, 1]
    pub similarity: f64,
}

/// Output of the relevance matcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchResult {
    /// Whether the pass threshold was crossed
    pub passed: bool,
    /// Highest-scoring centroid (tie-break winner)
    pub top_match: Option<CentroidMatch>,
    /// Display score scaled to 0–100
    pub score: f64,
    /// Parent space ids of every centroid above the pass threshold
    pub suggested_space_ids: Vec<String>,
}

/// Coarse verdict from the heuristic assessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Discard,
    Ambient,
    Engaged,
    Committed,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Discard => "discard",
            Verdict::Ambient => "ambient",
            Verdict::Engaged => "engaged",
            Verdict::Committed => "committed",
        }
    }

    /// Engagement level for non-discard verdicts.
    pub fn engagement_level(&self) -> Option<EngagementLevel> {
        match self {
            Verdict::Discard => None,
            Verdict::Ambient => Some(EngagementLevel::Ambient),
            Verdict::Engaged => Some(EngagementLevel::Engaged),
            Verdict::Committed => Some(EngagementLevel::Committed),
        }
    }
}

/// Output of the heuristic assessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicResult {
    /// Coarse verdict
    pub verdict: Verdict,
    /// Human-readable reason for the verdict
    pub reason: String,
    /// Whether deeper content validation is worth its cost
    pub should_validate_semantics: bool,
    /// Raw dwell time the verdict was computed from
    pub dwell_time_ms: u64,
}

/// Structural quality metrics computed by the content validator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentMetrics {
    /// Number of paragraphs
    pub paragraph_count: usize,
    /// Average words per paragraph
    pub avg_words_per_paragraph: f64,
    /// Anchor-text length over total text length, in [0, 1]
    pub link_density: f64,
    /// Number of sentences (segments of at least 10 chars)
    pub sentence_count: usize,
}

/// Output of the content validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticResult {
    /// True iff confidence ≥ 0.6
    pub is_valid: bool,
    /// Weighted confidence in [0, 1]
    pub confidence: f64,
    /// Which specific checks passed or failed
    pub reason: String,
    /// Raw metrics behind the score
    pub metrics: ContentMetrics,
}

// ============================================
// Artifact
// ============================================

/// The final accepted output of a pipeline run.
///
/// Only created when the pipeline reaches full acceptance; discarded
/// runs never produce one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Final engagement level (taken from the heuristic verdict)
    pub level: EngagementLevel,
    /// Page metadata the run was classified against
    pub context: ContextSignal,
    /// Engagement numbers the run was classified against
    pub engagement: EngagementSnapshot,
    /// Heuristic stage output
    pub heuristic: HeuristicResult,
    /// Content-validation output, if validation ran
    pub semantic: Option<SemanticResult>,
    /// Relevance match info, attached only if relevance passed
    pub match_info: Option<MatchResult>,
    /// Extracted page text (absent for ambient captures)
    pub extracted_text: Option<String>,
    /// When the capture was taken
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_source_mapping_is_exact() {
        assert_eq!(ContentKind::Video.content_source(), ContentSource::Video);
        assert_eq!(ContentKind::Chat.content_source(), ContentSource::Ai);
        assert_eq!(ContentKind::Pdf.content_source(), ContentSource::Pdf);
        for kind in [
            ContentKind::Article,
            ContentKind::Forum,
            ContentKind::Code,
            ContentKind::Documentation,
            ContentKind::Social,
            ContentKind::Unknown,
        ] {
            assert_eq!(kind.content_source(), ContentSource::Web);
        }
    }

    #[test]
    fn engagement_level_weights_and_decay() {
        assert_eq!(EngagementLevel::Ambient.base_weight(), 0.2);
        assert_eq!(EngagementLevel::Engaged.base_weight(), 1.0);
        assert_eq!(EngagementLevel::Committed.base_weight(), 2.0);
        assert_eq!(EngagementLevel::Ambient.decay_rate(), "high");
        assert_eq!(EngagementLevel::Engaged.decay_rate(), "medium");
        assert_eq!(EngagementLevel::Committed.decay_rate(), "low");
    }

    #[test]
    fn reading_depth_level_thresholds_are_ordered() {
        assert_eq!(
            EngagementLevel::from_reading_depth(0.7),
            EngagementLevel::Committed
        );
        assert_eq!(
            EngagementLevel::from_reading_depth(0.69),
            EngagementLevel::Engaged
        );
        assert_eq!(
            EngagementLevel::from_reading_depth(0.4),
            EngagementLevel::Engaged
        );
        assert_eq!(
            EngagementLevel::from_reading_depth(0.39),
            EngagementLevel::Ambient
        );
        // Total ordering consistency: committed depths >= engaged depths >= ambient depths
        assert!(EngagementLevel::Committed > EngagementLevel::Engaged);
        assert!(EngagementLevel::Engaged > EngagementLevel::Ambient);
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            ContentKind::Article,
            ContentKind::Video,
            ContentKind::Chat,
            ContentKind::Pdf,
            ContentKind::Unknown,
        ] {
            assert_eq!(kind.as_str().parse::<ContentKind>().unwrap(), kind);
        }
    }
}
