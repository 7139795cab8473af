//! Page snapshot: the host-side record handed to the pipeline
//!
//! A browser extension (or any other host) serializes what it observed
//! about a page visit into a `PageSnapshot`; the CLI can replay one
//! from a JSON file. The snapshot also carries the structural content
//! the content validator needs, so a run is fully reproducible offline.

use serde::{Deserialize, Serialize};

use crate::semantics::PageStructure;
use crate::types::{ContextSignal, EngagementSnapshot};

/// Everything observed about one page visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Page metadata captured at load time
    pub context: ContextSignal,
    /// Engagement numbers at capture time
    pub engagement: EngagementSnapshot,
    /// Extracted page text
    #[serde(default)]
    pub page_text: String,
    /// Structural content for the validator, if the host extracted it
    #[serde(default)]
    pub structure: Option<StructuralContent>,
}

/// Serialized structural view of a page.
///
/// A browser adapter fills this from the live DOM; the validator only
/// ever sees it through the [`PageStructure`] trait.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuralContent {
    /// Text of each paragraph-level element
    pub paragraphs: Vec<String>,
    /// Text of each anchor element
    pub links: Vec<String>,
    /// Full text of the main content container
    pub container_text: String,
}

impl PageStructure for StructuralContent {
    fn paragraph_texts(&self) -> Vec<String> {
        self.paragraphs.clone()
    }

    fn link_texts(&self) -> Vec<String> {
        self.links.clone()
    }

    fn container_text(&self) -> String {
        self.container_text.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantics;

    #[test]
    fn snapshot_round_trips_through_json() {
        let json = r#"{
            "context": {
                "url": "https://example.com/post",
                "domain": "example.com",
                "title": "A post",
                "content_kind": "article",
                "word_count": 1000,
                "author": null,
                "published_at": null,
                "language": "en"
            },
            "engagement": {
                "dwell_time_ms": 45000,
                "max_scroll_offset": 900.0,
                "scrollable_height": 1000.0,
                "scroll_depth": 0.9,
                "reading_depth": 0.66,
                "word_count": 1000
            },
            "page_text": "body"
        }"#;

        let snapshot: PageSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.context.domain, "example.com");
        assert_eq!(snapshot.engagement.dwell_time_ms, 45_000);
        assert!(snapshot.structure.is_none());
    }

    #[test]
    fn structural_content_feeds_the_validator() {
        let structure = StructuralContent {
            paragraphs: vec![
                "This paragraph has enough words to pass the average check easily, \
                 twenty of them at least in total here now."
                    .to_string(),
                "A second paragraph with a comparable amount of running text to keep \
                 the validator satisfied overall."
                    .to_string(),
            ],
            links: vec![],
            container_text: "This is one sentence. This is another sentence. \
                             And here is a third one."
                .to_string(),
        };

        let result = semantics::validate(&structure);
        assert!(result.is_valid);
    }
}
