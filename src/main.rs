use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use trialfold::config::TrialfoldConfig;
use trialfold::job::{JobController, JsonlSink};
use trialfold::merge::{self, MergeEngine, StatusHold};
use trialfold::model::types::{Actor, DocId, ExternalRecord};
use trialfold::store::JsonFileStore;
use trialfold::telemetry;
use trialfold::xml::ElementSubset;

/// Clinical-trial document importer
///
/// Folds externally sourced trial records into a versioned document
/// repository. Each queued record either creates a new document or merges
/// into an existing one, carrying curated sections across unchanged and
/// advancing the publishable lineage when the feed content moved.
///
/// Diagnostics go to stderr; the job summary goes to stdout.
#[derive(Parser)]
#[command(name = "trialfold")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "trialfold.toml", env = "TRIALFOLD_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the import batch over the queued records
    ///
    /// Completed records are removed from the queue; lock-skipped and
    /// failed records stay queued for the next run. Exits non-zero when
    /// any record failed.
    Run,

    /// Show a document's reference points
    ///
    /// Prints the latest version, the latest publishable version, and
    /// whether the working copy has unsaved edits.
    Status {
        /// Document id
        doc_id: u32,
    },
}

fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();
    let config = TrialfoldConfig::load(&cli.config)?;

    match cli.command {
        Commands::Run => run(&config),
        Commands::Status { doc_id } => status(&config, doc_id),
    }
}

fn run(config: &TrialfoldConfig) -> Result<()> {
    let store = JsonFileStore::open(&config.job.store)
        .with_context(|| format!("opening store at {}", config.job.store.display()))?;
    let mut queue = read_queue(&config.job.queue)?;

    let actor = Actor::new(&config.job.actor)?;
    let engine = MergeEngine::new(
        actor,
        config.merge.preserved_tags.clone(),
        Box::new(ElementSubset::new(config.merge.significant_tags.clone())),
    )
    .with_rule(Box::new(StatusHold::new(
        config.merge.status_tag.clone(),
        config.merge.terminal_statuses.clone(),
    )));

    let mut sink = JsonlSink::open(&config.job.event_log)
        .with_context(|| format!("opening event log {}", config.job.event_log.display()))?;

    let summary = JobController::new(&engine, &store).run(&mut queue, &mut sink);
    write_queue(&config.job.queue, &queue)?;
    print!("{}", summary.render());

    if !summary.failures.is_empty() {
        bail!(
            "{} record(s) failed; see {}",
            summary.failures.len(),
            config.job.event_log.display()
        );
    }
    Ok(())
}

fn status(config: &TrialfoldConfig, doc_id: u32) -> Result<()> {
    let store = JsonFileStore::open(&config.job.store)
        .with_context(|| format!("opening store at {}", config.job.store.display()))?;
    let doc_id = DocId::new(doc_id)?;
    let points = merge::resolve(&store, doc_id)?;

    println!("{doc_id}");
    match points.latest_version {
        Some(v) => println!("  latest version:      {v}"),
        None => println!("  latest version:      (none)"),
    }
    match points.latest_publishable {
        Some(v) => println!("  latest publishable:  {v}"),
        None => println!("  latest publishable:  (none)"),
    }
    println!(
        "  working copy:        {}",
        if points.working_copy_changed {
            "has unsaved edits"
        } else {
            "matches latest version"
        }
    );
    Ok(())
}

/// The queue file is a JSON array of external records. A missing file is an
/// empty queue, so a cron run with nothing to do succeeds quietly.
fn read_queue(path: &Path) -> Result<Vec<ExternalRecord>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("reading queue {}", path.display()));
        }
    };
    serde_json::from_str(&raw).with_context(|| format!("parsing queue {}", path.display()))
}

/// Rewrite the queue through a temp file so an interrupted run never leaves
/// a truncated queue behind.
fn write_queue(path: &Path, queue: &[ExternalRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(queue).context("serializing queue")?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing queue {}", path.display()))?;
    Ok(())
}
