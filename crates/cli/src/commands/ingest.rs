//! `cadence ingest` — Stream JSONL events through the runtime.
//!
//! Learned state is restored first and persisted on exit, so repeated runs
//! keep learning.

use super::CliResult;
use cadence_core::{EventInput, ProjectProfile};
use cadence_engine::Runtime;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub async fn run(
    file: Option<PathBuf>,
    profile: Option<PathBuf>,
    wait_ms: u64,
    json: bool,
) -> CliResult {
    let mut config = super::load_config()?;

    if let Some(path) = profile {
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read profile {}: {e}", path.display()))?;
        let profile: ProjectProfile = serde_json::from_str(&text)
            .map_err(|e| format!("Invalid profile {}: {e}", path.display()))?;
        config.apply_profile(&profile)?;
    }

    let runtime = Runtime::from_config(config)?;
    let restored = runtime.restore_latest();

    let reader: Box<dyn BufRead> = match &file {
        Some(path) => Box::new(BufReader::new(
            File::open(path).map_err(|e| format!("Failed to open {}: {e}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let mut rejected = 0usize;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<EventInput>(line) {
            Ok(input) => {
                let report = runtime.ingest(input);
                if json {
                    println!("{}", serde_json::to_string(&report)?);
                }
            }
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping malformed event");
                rejected += 1;
            }
        }
    }

    if !runtime.wait_idle(Duration::from_millis(wait_ms)).await {
        warn!(wait_ms, "Hooks still running, shutting down");
    }
    // Prune and decay before the final snapshot so it carries the result
    let maintenance = runtime.maintain(chrono::Utc::now());
    let shutdown = runtime.shutdown().await;
    let stats = runtime.stats();

    if json {
        return super::print_json(&serde_json::json!({
            "restored": restored,
            "rejected": rejected,
            "stats": stats,
            "maintenance": maintenance,
            "shutdown": shutdown,
        }));
    }

    println!("Cadence ingest");
    println!("==============");
    println!("  Restored state: {}", if restored { "yes" } else { "cold start" });
    println!("  Events:         {} ({} rejected)", stats.events_ingested, rejected);
    println!("  Patterns:       {}", stats.patterns);
    println!("  Predictions:    {}", stats.predictions);
    println!("  Dispatches:     {}", stats.dispatches_requested);
    println!(
        "  Outcomes:       {} ok, {} failed, {} timed out, {} skipped",
        stats.outcomes.success,
        stats.outcomes.failure,
        stats.outcomes.timed_out,
        stats.outcomes.skipped
    );
    println!(
        "  Maintenance:    {} pruned, {} decayed",
        maintenance.pruned, maintenance.decayed
    );
    match &shutdown.snapshot {
        Some(path) => println!("  Snapshot:       {}", path.display()),
        None => println!("  Snapshot:       not written (see logs)"),
    }
    let deleted = maintenance.snapshots_deleted + shutdown.snapshots_deleted;
    if deleted > 0 {
        println!("  Retention:      {deleted} old snapshot(s) removed");
    }
    Ok(())
}
