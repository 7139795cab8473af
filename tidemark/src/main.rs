//! tidemark - knowledge-capture classification CLI
//!
//! Replays page snapshots through the classification pipeline, manages
//! the marker/centroid sets, and operates the offline capture queue.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/tidemark/data.db (~/.local/share/tidemark/data.db)
//! - Logs: $XDG_STATE_HOME/tidemark/tidemark.log (~/.local/state/tidemark/tidemark.log)
//! - Config: $XDG_CONFIG_HOME/tidemark/config.toml (~/.config/tidemark/config.toml)

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use tidemark_core::delivery::DeliveryClient;
use tidemark_core::relevance::CentroidScorer;
use tidemark_core::{
    CaptureQueue, CapturePayload, Centroid, Config, Database, Marker, PageSnapshot,
    PipelineOutcome, SyncPipeline, SyncQueueProcessor, UrlGate,
};

#[derive(Parser)]
#[command(name = "tidemark")]
#[command(about = "Classify page visits and manage the capture queue")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a page snapshot through the classification pipeline
    Capture {
        /// Path to a page snapshot JSON file
        #[arg(long)]
        file: PathBuf,

        /// Space to file the capture under (required when no space can
        /// be suggested automatically)
        #[arg(long)]
        space: Option<String>,

        /// Classify only; do not enqueue the capture
        #[arg(long)]
        dry_run: bool,
    },

    /// Deliver queued captures to the backend
    Sync,

    /// Show queue counters and configuration paths
    Status,

    /// Manage markers
    Markers {
        #[command(subcommand)]
        command: MarkerCommand,
    },

    /// Manage centroids
    Centroids {
        #[command(subcommand)]
        command: CentroidCommand,
    },
}

#[derive(Subcommand)]
enum MarkerCommand {
    /// List all markers
    List,
    /// Add a marker
    Add {
        /// Marker id
        id: String,
        /// Space the marker is tagged to
        #[arg(long)]
        space: String,
        /// Keyword or phrase to match
        #[arg(long)]
        text: String,
        /// Relative importance
        #[arg(long, default_value = "1.0")]
        weight: f64,
    },
    /// Remove a marker by id
    Remove { id: String },
}

#[derive(Subcommand)]
enum CentroidCommand {
    /// List all centroids
    List,
}

/// The CLI carries no embedding backend, so centroid similarity is
/// unavailable when replaying snapshots; every comparison reports as
/// such and the relevance stage degrades to "no match".
struct NoEmbeddingScorer;

impl CentroidScorer for NoEmbeddingScorer {
    fn similarity(&self, _text: &str, _centroid: &Centroid) -> tidemark_core::Result<f64> {
        Err(tidemark_core::Error::Scoring(
            "no embedding backend configured".to_string(),
        ))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        tidemark_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("tidemark starting");

    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    match args.command {
        Command::Capture {
            file,
            space,
            dry_run,
        } => cmd_capture(&config, db, &file, space, dry_run),
        Command::Sync => cmd_sync(&config, db),
        Command::Status => cmd_status(db, &db_path),
        Command::Markers { command } => cmd_markers(&db, command),
        Command::Centroids { command } => cmd_centroids(&db, command),
    }
}

fn cmd_capture(
    config: &Config,
    db: Database,
    file: &PathBuf,
    space: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read snapshot file {}", file.display()))?;
    let snapshot: PageSnapshot =
        serde_json::from_str(&content).context("failed to parse page snapshot")?;

    // Snapshot the marker/centroid sets once at the top of the run
    let markers: Vec<Marker> = db.list_markers().context("failed to load markers")?;
    let centroids: Vec<Centroid> = db.list_centroids().context("failed to load centroids")?;

    let pipeline = SyncPipeline::new(UrlGate::new(), config.pipeline.clone())
        .context("failed to create pipeline")?;
    let outcome = pipeline.run(&snapshot, &markers, &centroids, &NoEmbeddingScorer);

    match outcome {
        PipelineOutcome::Discarded { stage, reason } => {
            println!("Discarded at {}: {}", stage.as_str(), reason);
            Ok(())
        }
        PipelineOutcome::Accepted(artifact) => {
            let mut payload = CapturePayload::from_artifact(&artifact);

            // A manual capture must end up in some space: either one the
            // pipeline suggested or one named on the command line.
            if payload.suggested_space_ids.is_none() {
                match space {
                    Some(id) => payload.suggested_space_ids = Some(vec![id]),
                    None => {
                        return Err(tidemark_core::Error::Capture(
                            "no space suggested; pass --space <id>".to_string(),
                        )
                        .into());
                    }
                }
            }

            println!(
                "Accepted: {} [{}] reading depth {:.2}",
                payload.url, payload.artifact_type, payload.reading_depth
            );

            if dry_run {
                println!("Dry run; capture not enqueued");
                return Ok(());
            }

            let queue = CaptureQueue::new(db, config.queue.clone())
                .context("failed to open capture queue")?;
            let id = queue
                .enqueue(payload, Utc::now())
                .context("failed to enqueue capture")?;
            println!("Enqueued capture {}", id);
            println!("Run `tidemark sync` to deliver pending captures.");
            Ok(())
        }
    }
}

fn cmd_sync(config: &Config, db: Database) -> Result<()> {
    if !config.delivery.is_ready() {
        bail!(
            "delivery is not configured; set [delivery] enabled, server_url and api_key in {}",
            Config::config_path().display()
        );
    }

    let queue =
        CaptureQueue::new(db, config.queue.clone()).context("failed to open capture queue")?;
    let client =
        DeliveryClient::new(&config.delivery).context("failed to create delivery client")?;
    let processor =
        SyncQueueProcessor::new(queue, client).context("failed to create queue processor")?;

    if !processor.health_check().unwrap_or(false) {
        println!("Warning: backend health check failed; attempting delivery anyway");
    }

    let summary = processor.process().context("queue pass failed")?;
    println!(
        "Processed {} capture(s): {} delivered, {} rescheduled",
        summary.processed, summary.succeeded, summary.failed
    );

    let stats = processor.queue().stats()?;
    if stats.pending > 0 {
        println!("{} capture(s) still pending", stats.pending);
    }
    Ok(())
}

fn cmd_status(db: Database, db_path: &PathBuf) -> Result<()> {
    let markers = db.list_markers()?.len();
    let centroids = db.list_centroids()?.len();
    let stats = db.queue_stats()?;

    println!("Database:  {}", db_path.display());
    println!("Config:    {}", Config::config_path().display());
    println!("Log file:  {}", tidemark_core::logging::log_file_path().display());
    println!();
    println!("Markers:   {}", markers);
    println!("Centroids: {}", centroids);
    println!();
    println!("Queue: {} pending, {} sending, {} failed", stats.pending, stats.sending, stats.failed);
    if let Some(next) = stats.next_retry_at {
        println!("Next retry at {}", next.to_rfc3339());
    }
    if let Some(err) = stats.last_error {
        println!("Last error: {}", err);
    }
    Ok(())
}

fn cmd_markers(db: &Database, command: MarkerCommand) -> Result<()> {
    match command {
        MarkerCommand::List => {
            let markers = db.list_markers()?;
            if markers.is_empty() {
                println!("No markers configured");
                return Ok(());
            }
            for m in markers {
                println!("{}  [{}]  {:?} (weight {})", m.id, m.space_id, m.text, m.weight);
            }
        }
        MarkerCommand::Add {
            id,
            space,
            text,
            weight,
        } => {
            let mut marker = Marker::new(id, space, text);
            marker.weight = weight;
            db.upsert_marker(&marker)
                .context("failed to store marker")?;
            println!("Marker {} saved", marker.id);
        }
        MarkerCommand::Remove { id } => {
            if db.delete_marker(&id).context("failed to delete marker")? {
                println!("Marker {} removed", id);
            } else {
                bail!("no marker with id {}", id);
            }
        }
    }
    Ok(())
}

fn cmd_centroids(db: &Database, command: CentroidCommand) -> Result<()> {
    match command {
        CentroidCommand::List => {
            let centroids = db.list_centroids()?;
            if centroids.is_empty() {
                println!("No centroids configured");
                return Ok(());
            }
            for c in centroids {
                let subspace = c.subspace_id.as_deref().unwrap_or("-");
                println!("{}  [{} / {}]  {}", c.id, c.space_id, subspace, c.label);
            }
        }
    }
    Ok(())
}
