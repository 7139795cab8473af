//! Integration tests for the classification pipeline and capture queue
//!
//! End-to-end runs over synthetic page snapshots, plus queue
//! persistence across database reopens.

use chrono::Utc;
use tempfile::TempDir;

use tidemark_core::config::{PipelineConfig, QueueConfig};
use tidemark_core::db::Database;
use tidemark_core::pipeline::NoExternalSemantics;
use tidemark_core::relevance::CentroidScorer;
use tidemark_core::tracker::{self, EngagementTracker};
use tidemark_core::{
    CapturePayload, CaptureQueue, CaptureState, Centroid, ContentKind, ContextSignal,
    EngagementLevel, EngagementSnapshot, Error, Marker, PageSnapshot, Pipeline, PipelineOutcome,
    Result, Stage, StructuralContent, UrlGate, Verdict,
};

/// Scorer with one canned similarity for every centroid.
struct FlatScorer(f64);

impl CentroidScorer for FlatScorer {
    fn similarity(&self, _text: &str, _centroid: &Centroid) -> Result<f64> {
        Ok(self.0)
    }
}

fn context(url: &str, word_count: u32) -> ContextSignal {
    let domain = url
        .split("//")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("example.com")
        .to_string();
    ContextSignal {
        url: url.to_string(),
        domain,
        title: "Understanding lifetimes in Rust".to_string(),
        content_kind: ContentKind::Article,
        word_count,
        author: None,
        published_at: None,
        language: Some("en".to_string()),
    }
}

fn engagement(dwell_ms: u64, scroll_depth: f64, word_count: u32) -> EngagementSnapshot {
    EngagementSnapshot {
        dwell_time_ms: dwell_ms,
        max_scroll_offset: scroll_depth * 1000.0,
        scrollable_height: 1000.0,
        scroll_depth,
        reading_depth: tracker::reading_depth(dwell_ms, word_count, scroll_depth),
        word_count,
    }
}

fn substantive_structure() -> StructuralContent {
    let paragraph = "Lifetimes tie the validity of a reference to the scope of the data \
                     it borrows from, which the compiler checks statically for every \
                     function signature in the program."
        .to_string();
    StructuralContent {
        paragraphs: vec![paragraph.clone(), paragraph.clone(), paragraph.clone()],
        links: vec!["next chapter".to_string()],
        container_text: "Lifetimes tie references to scopes. The compiler checks them \
                         statically. Every signature participates in inference."
            .to_string(),
    }
}

fn page(url: &str, dwell_ms: u64, scroll_depth: f64, word_count: u32) -> PageSnapshot {
    PageSnapshot {
        context: context(url, word_count),
        engagement: engagement(dwell_ms, scroll_depth, word_count),
        page_text: "An in-depth explanation of borrow checking and lifetimes. ".repeat(10),
        structure: Some(substantive_structure()),
    }
}

async fn run(
    snapshot: &PageSnapshot,
    markers: &[Marker],
    centroids: &[Centroid],
    similarity: f64,
) -> PipelineOutcome {
    let pipeline = Pipeline::new(UrlGate::new(), PipelineConfig::default());
    pipeline
        .run(
            snapshot,
            markers,
            centroids,
            &FlatScorer(similarity),
            None::<NoExternalSemantics>,
        )
        .await
}

fn centroid(id: &str, space_id: &str) -> Centroid {
    Centroid {
        id: id.to_string(),
        space_id: space_id.to_string(),
        subspace_id: None,
        label: "Rust".to_string(),
    }
}

// ============================================
// End-to-End Pipeline Scenarios
// ============================================

#[tokio::test]
async fn blocked_email_url_is_never_captured() {
    let snapshot = page("https://mail.google.com/mail/u/0", 150_000, 0.9, 1000);
    let outcome = run(&snapshot, &[], &[], 0.9).await;
    match outcome {
        PipelineOutcome::Discarded { stage, .. } => assert_eq!(stage, Stage::UrlGate),
        _ => panic!("expected discard at the URL gate"),
    }
}

#[tokio::test]
async fn glance_without_markers_is_discarded_by_heuristics() {
    // 3 s on a 50-word page with no markers configured: the marker gate
    // does not apply, and the dwell is below even the lowered
    // short-content glance bar (4 s), so the heuristic stage discards
    let snapshot = page("https://example.com/note", 3_000, 0.2, 50);
    let outcome = run(&snapshot, &[], &[], 0.9).await;
    match outcome {
        PipelineOutcome::Discarded { stage, reason } => {
            assert_eq!(stage, Stage::Heuristics);
            assert!(reason.contains("glance"));
        }
        _ => panic!("expected discard at heuristics"),
    }

    // A 4.5 s visit on the same short page survives the lowered bar
    let snapshot = page("https://example.com/note", 4_500, 0.2, 50);
    let outcome = run(&snapshot, &[], &[], 0.9).await;
    assert!(outcome.is_accepted());
}

#[tokio::test]
async fn short_visit_with_unmatched_markers_is_discarded() {
    let snapshot = page("https://example.com/post", 8_000, 0.5, 1000);
    let markers = vec![Marker::new("m1", "space-rust", "wasm runtime internals")];
    let outcome = run(&snapshot, &markers, &[], 0.9).await;
    match outcome {
        PipelineOutcome::Discarded { stage, reason } => {
            assert_eq!(stage, Stage::MarkerGate);
            assert!(reason.contains("no marker match"));
        }
        _ => panic!("expected discard at the marker gate"),
    }
}

#[tokio::test]
async fn deep_read_is_classified_engaged() {
    // 150 s on a 1000-word page, 90% scrolled: expected read time is
    // 300 s, so time ratio 0.5 and reading depth 0.66
    let snapshot = page("https://example.com/lifetimes", 150_000, 0.9, 1000);
    assert!((snapshot.engagement.reading_depth - 0.66).abs() < 1e-9);
    assert_eq!(
        tracker::engagement_level(&snapshot.engagement),
        EngagementLevel::Engaged
    );

    let outcome = run(&snapshot, &[], &[], 0.9).await;
    let artifact = outcome.artifact().expect("expected accept");
    assert_eq!(artifact.heuristic.verdict, Verdict::Committed);
    assert!(artifact.heuristic.should_validate_semantics);
    assert!(artifact.semantic.as_ref().expect("validated").is_valid);
}

#[tokio::test]
async fn link_farm_structure_fails_validation() {
    let mut snapshot = page("https://example.com/links", 45_000, 0.5, 1000);
    snapshot.structure = Some(StructuralContent {
        paragraphs: vec!["hi. ok. no".to_string()],
        links: vec!["aaaaaaaaa".to_string()],
        container_text: "hi. ok. no".to_string(),
    });

    let outcome = run(&snapshot, &[], &[], 0.9).await;
    match outcome {
        PipelineOutcome::Discarded { stage, reason } => {
            assert_eq!(stage, Stage::Semantics);
            assert!(reason.contains("paragraph count"));
            assert!(reason.contains("link density"));
            assert!(reason.contains("sentence count"));
        }
        _ => panic!("expected discard at semantics"),
    }
}

#[tokio::test]
async fn accepted_artifact_produces_contractual_payload() {
    let snapshot = page("https://example.com/lifetimes", 45_000, 0.9, 1000);
    let centroids = vec![centroid("c1", "space-rust"), centroid("c2", "space-systems")];
    let outcome = run(&snapshot, &[], &centroids, 0.8).await;
    let artifact = outcome.artifact().expect("expected accept");

    let payload = CapturePayload::from_artifact(artifact);
    assert_eq!(payload.artifact_type, "engaged");
    assert_eq!(payload.content_source, "web");
    assert_eq!(payload.base_weight, 1.0);
    assert_eq!(payload.decay_rate, "medium");
    assert!((payload.relevance - 0.8).abs() < 1e-9);
    assert_eq!(
        payload.suggested_space_ids,
        Some(vec![
            "space-rust".to_string(),
            "space-systems".to_string()
        ])
    );
    assert!(payload.extracted_text.is_some());
}

// ============================================
// Engagement Tracker Scenarios
// ============================================

#[test]
fn tracker_dwell_pauses_while_hidden() {
    let t0 = Utc::now();
    let mut tracker = EngagementTracker::start(1000, t0);
    tracker.record_scroll(900.0);

    // 30 s visible, 60 s hidden, 30 s visible
    let t1 = t0 + chrono::Duration::seconds(30);
    tracker.visibility_changed(false, t1);
    let t2 = t1 + chrono::Duration::seconds(60);
    tracker.visibility_changed(true, t2);
    let t3 = t2 + chrono::Duration::seconds(30);
    tracker.stop(t3);

    let snapshot = tracker.snapshot(1000.0, t3);
    assert_eq!(snapshot.dwell_time_ms, 60_000);
    assert!((snapshot.scroll_depth - 0.9).abs() < 1e-9);
}

#[test]
fn reading_depth_stays_bounded_for_extreme_dwell() {
    // 100x the expected read time still caps the time ratio at 1.5
    let depth = tracker::reading_depth(30_000_000, 1000, 1.0);
    assert!(depth <= 1.5);
    assert!((depth - (0.6 * 1.5 + 0.4)).abs() < 1e-9);
}

// ============================================
// Queue Persistence
// ============================================

fn sample_payload() -> CapturePayload {
    CapturePayload {
        url: "https://example.com/lifetimes".to_string(),
        title: "Understanding lifetimes in Rust".to_string(),
        domain: "example.com".to_string(),
        artifact_type: "engaged".to_string(),
        content_source: "web".to_string(),
        base_weight: 1.0,
        decay_rate: "medium".to_string(),
        dwell_time_ms: 45_000,
        scroll_depth: 0.9,
        reading_depth: 0.66,
        word_count: 1000,
        relevance: 0.8,
        captured_at: Utc::now(),
        extracted_text: Some("body".to_string()),
        suggested_space_ids: Some(vec!["space-rust".to_string()]),
        top_similarity_score: Some(0.8),
    }
}

#[tokio::test]
async fn queue_survives_reopen_and_releases_inflight() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("data.db");

    let id = {
        let db = Database::open(&db_path).unwrap();
        db.migrate().unwrap();
        let queue = CaptureQueue::new(db, QueueConfig::default()).unwrap();
        let id = queue.enqueue(sample_payload(), Utc::now()).unwrap();
        // First attempt fails and gets recorded before "shutdown"
        queue
            .process_queue(|_| async {
                Err(Error::Delivery(
                    "HTTP request failed: connection reset by peer".to_string(),
                ))
            })
            .await
            .unwrap();
        id
    };

    // Reopen: the item is still there with its recorded failure
    let db = Database::open(&db_path).unwrap();
    db.migrate().unwrap();
    let queue = CaptureQueue::new(db, QueueConfig::default()).unwrap();
    let item = queue.get(&id).unwrap().expect("item survives reopen");
    assert_eq!(item.state, CaptureState::Queued);
    assert_eq!(item.retry_count, 1);
    assert!(item
        .last_error
        .as_deref()
        .unwrap()
        .contains("connection reset"));
    assert_eq!(queue.stats().unwrap().pending, 1);
}

#[tokio::test]
async fn end_to_end_accept_enqueue_deliver() {
    let dir = TempDir::new().unwrap();
    let db = Database::open(&dir.path().join("data.db")).unwrap();
    db.migrate().unwrap();
    let queue = CaptureQueue::new(db, QueueConfig::default()).unwrap();

    let snapshot = page("https://example.com/lifetimes", 45_000, 0.9, 1000);
    let outcome = run(&snapshot, &[], &[], 0.9).await;
    let artifact = outcome.artifact().expect("expected accept");
    let payload = CapturePayload::from_artifact(artifact);

    queue.enqueue(payload, Utc::now()).unwrap();

    // First delivery attempt fails, second succeeds after the backoff
    // is forced to zero
    let summary = queue
        .process_queue(|_| async { Err(Error::Delivery("API error (503): unavailable".to_string())) })
        .await
        .unwrap();
    assert_eq!(summary.failed, 1);

    // Backoff still in effect: nothing is due yet
    assert_eq!(
        queue
            .process_queue(|_| async { Ok(()) })
            .await
            .unwrap()
            .processed,
        0
    );

    // The stored next_retry_at is ~1 s out; wait it out and deliver
    tokio::time::sleep(std::time::Duration::from_millis(1_100)).await;
    let summary = queue.process_queue(|_| async { Ok(()) }).await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(queue.stats().unwrap().pending, 0);
}
