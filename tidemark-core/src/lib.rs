//! # tidemark-core
//!
//! Core library for tidemark - a knowledge-capture classification engine.
//!
//! This library provides:
//! - The classification pipeline: URL gate, engagement tracking, marker
//!   recognition, heuristic assessment, relevance matching, and content
//!   validation, sequenced by an orchestrator with explicit
//!   short-circuit rules
//! - An offline capture queue with exponential-backoff retry
//! - Database storage layer with SQLite
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! A host (typically a browser extension, or the CLI replaying a page
//! snapshot) hands the pipeline everything it observed about one page
//! visit. The pipeline either discards the visit at a named stage or
//! produces an [`Artifact`], which is shaped into a [`CapturePayload`]
//! and delivered to the backend, falling back to the persistent queue
//! when delivery fails.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tidemark_core::{Config, Database};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//! ```

// Re-export commonly used items at the crate root
pub use capture::CapturePayload;
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use gate::{UrlClass, UrlGate};
pub use pipeline::{Pipeline, PipelineOutcome, Stage, SyncPipeline};
pub use queue::{
    CaptureQueue, CaptureState, ProcessSummary, QueueStats, QueuedCapture, SyncQueueProcessor,
};
pub use snapshot::{PageSnapshot, StructuralContent};
pub use types::*;

// Public modules
pub mod capture;
pub mod config;
pub mod db;
pub mod delivery;
pub mod error;
pub mod gate;
pub mod heuristics;
pub mod logging;
pub mod markers;
pub mod pipeline;
pub mod queue;
pub mod relevance;
pub mod semantics;
pub mod snapshot;
pub mod tracker;
pub mod types;
