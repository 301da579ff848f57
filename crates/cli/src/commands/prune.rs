//! `cadence prune` — Apply snapshot retention now.

use super::CliResult;
use chrono::Utc;

pub fn run(json: bool) -> CliResult {
    let config = super::load_config()?;
    let deleted = super::state_manager(&config).enforce_retention(Utc::now())?;

    if json {
        let paths: Vec<_> = deleted.iter().map(|f| &f.path).collect();
        return super::print_json(&serde_json::json!({ "deleted": paths }));
    }
    println!(
        "Removed {} snapshot(s) (keeping {} max, {} days)",
        deleted.len(),
        config.state.max_snapshots,
        config.state.retention_days
    );
    Ok(())
}
