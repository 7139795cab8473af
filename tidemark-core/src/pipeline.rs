//! Pipeline orchestrator: sequences the classification stages
//!
//! Runs gate → marker recognizer → heuristic assessor → relevance
//! matcher → content validator in fixed order with explicit
//! short-circuit rules. Every discard names the stage it happened at
//! and carries a reason, so "why was this page dropped" is always
//! answerable from the logs.
//!
//! The externally-supplied semantics check is the only suspension point
//! in a run; everything else is synchronous logic over data the caller
//! already collected.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::gate::{UrlClass, UrlGate};
use crate::heuristics;
use crate::markers;
use crate::relevance::{self, CentroidScorer, RelevanceOptions};
use crate::semantics;
use crate::snapshot::PageSnapshot;
use crate::types::{Artifact, Centroid, EngagementLevel, Marker, SemanticResult, Verdict};

/// Stage at which a run was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    UrlGate,
    MarkerGate,
    Heuristics,
    Relevance,
    Semantics,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::UrlGate => "url_gate",
            Stage::MarkerGate => "marker_gate",
            Stage::Heuristics => "heuristics",
            Stage::Relevance => "relevance",
            Stage::Semantics => "semantics",
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The visit was accepted and produced an artifact
    Accepted(Box<Artifact>),
    /// The visit was discarded at a named stage
    Discarded { stage: Stage, reason: String },
}

impl PipelineOutcome {
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            PipelineOutcome::Accepted(a) => Some(a),
            PipelineOutcome::Discarded { .. } => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, PipelineOutcome::Accepted(_))
    }
}

/// The classification pipeline.
///
/// Holds no mutable state; markers, centroids, and the scorer are
/// passed per run as an immutable snapshot taken at the top of the run.
pub struct Pipeline {
    gate: UrlGate,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(gate: UrlGate, config: PipelineConfig) -> Self {
        Self { gate, config }
    }

    /// Run the full pipeline over one page snapshot.
    ///
    /// `external_semantics`, when supplied, replaces the built-in
    /// structural validation. It is raced against a timeout; a check
    /// that errors or times out degrades to "skip validation, keep the
    /// heuristic verdict". Only an explicit `is_valid = false` result
    /// discards.
    pub async fn run<F>(
        &self,
        snapshot: &PageSnapshot,
        markers: &[Marker],
        centroids: &[Centroid],
        scorer: &dyn CentroidScorer,
        external_semantics: Option<F>,
    ) -> PipelineOutcome
    where
        F: Future<Output = Result<SemanticResult>>,
    {
        let context = &snapshot.context;
        let dwell_ms = snapshot.engagement.dwell_time_ms;

        // Stage 1: URL gate
        let url_class = self.gate.classify(&context.url);
        if url_class == UrlClass::Block {
            return self.discard(Stage::UrlGate, format!("url blocked: {}", context.url));
        }

        // Stage 2: marker recognition + short-visit gate. With no
        // markers configured the gate is not a gating condition at all.
        let marker_match = markers::recognize(context, &snapshot.page_text, markers);
        if !markers.is_empty() && !marker_match.passed && dwell_ms < self.config.marker_gate_ms {
            return self.discard(
                Stage::MarkerGate,
                format!(
                    "short visit ({}ms) with no marker match",
                    dwell_ms
                ),
            );
        }

        // Stage 3: heuristic assessment
        let heuristic = heuristics::assess(context, dwell_ms, &self.config);
        if heuristic.verdict == Verdict::Discard {
            return self.discard(Stage::Heuristics, heuristic.reason);
        }

        // Stage 4: relevance matching, when there is anything to match
        // against. Quick mode keeps this stage from noticeably delaying
        // the capture path.
        let options = RelevanceOptions::from_config(&self.config, true);
        let relevance_ran = !centroids.is_empty()
            && relevance::meets_min_chars(&snapshot.page_text, options.min_text_chars);
        let match_result =
            relevance::check_relevance(&snapshot.page_text, centroids, scorer, options);
        if relevance_ran
            && !match_result.passed
            && !marker_match.passed
            && heuristic.verdict == Verdict::Ambient
        {
            return self.discard(
                Stage::Relevance,
                "no centroid or marker match on an ambient visit".to_string(),
            );
        }

        // Stage 5: content validation, only when the heuristic verdict
        // justifies the cost
        let semantic = if heuristic.should_validate_semantics {
            let result = match external_semantics {
                Some(fut) => self.await_external_semantics(fut).await,
                None => snapshot.structure.as_ref().map(|s| semantics::validate(s)),
            };
            match result {
                Some(r) if !r.is_valid => {
                    return self.discard(
                        Stage::Semantics,
                        format!("content validation rejected: {}", r.reason),
                    );
                }
                other => other,
            }
        } else {
            None
        };

        // Accepted. Engagement level comes from the heuristic verdict;
        // relevance never overrides it.
        let level = heuristic
            .verdict
            .engagement_level()
            .unwrap_or(EngagementLevel::Ambient);

        let extracted_text = if level == EngagementLevel::Ambient || snapshot.page_text.is_empty() {
            None
        } else {
            Some(snapshot.page_text.clone())
        };

        let artifact = Artifact {
            level,
            context: context.clone(),
            engagement: snapshot.engagement.clone(),
            heuristic,
            semantic,
            match_info: if match_result.passed {
                Some(match_result)
            } else {
                None
            },
            extracted_text,
            captured_at: Utc::now(),
        };

        tracing::info!(
            url = %artifact.context.url,
            level = artifact.level.as_str(),
            "Page visit accepted"
        );
        PipelineOutcome::Accepted(Box::new(artifact))
    }

    /// Await the host's semantics check under a timeout.
    ///
    /// Errors and timeouts return `None` (validation unavailable),
    /// which the caller treats as "skip", distinct from an explicit
    /// rejection.
    async fn await_external_semantics<F>(&self, fut: F) -> Option<SemanticResult>
    where
        F: Future<Output = Result<SemanticResult>>,
    {
        let timeout = Duration::from_millis(self.config.semantics_timeout_ms);
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(result)) => Some(result),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Semantics check failed, skipping validation");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.semantics_timeout_ms,
                    "Semantics check timed out, skipping validation"
                );
                None
            }
        }
    }

    fn discard(&self, stage: Stage, reason: String) -> PipelineOutcome {
        tracing::debug!(stage = stage.as_str(), %reason, "Page visit discarded");
        PipelineOutcome::Discarded { stage, reason }
    }
}

/// Future type for callers that never supply an external semantics
/// check (the built-in structural validation is used instead).
pub type NoExternalSemantics = std::future::Ready<Result<SemanticResult>>;

/// Blocking facade over [`Pipeline`] for synchronous callers.
///
/// Owns a current-thread tokio runtime; the CLI stays synchronous.
pub struct SyncPipeline {
    runtime: tokio::runtime::Runtime,
    pipeline: Pipeline,
}

impl SyncPipeline {
    pub fn new(gate: UrlGate, config: PipelineConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            pipeline: Pipeline::new(gate, config),
        })
    }

    /// Run the pipeline using the snapshot's own structural content for
    /// validation.
    pub fn run(
        &self,
        snapshot: &PageSnapshot,
        markers: &[Marker],
        centroids: &[Centroid],
        scorer: &dyn CentroidScorer,
    ) -> PipelineOutcome {
        self.runtime.block_on(self.pipeline.run(
            snapshot,
            markers,
            centroids,
            scorer,
            None::<NoExternalSemantics>,
        ))
    }
}
