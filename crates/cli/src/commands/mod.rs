//! CLI command implementations.

pub mod hooks;
pub mod ingest;
pub mod init;
pub mod patterns;
pub mod predict;
pub mod prune;
pub mod relevant;
pub mod status;

use cadence_config::AppConfig;
use cadence_core::Snapshot;
use cadence_state::StateManager;
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

pub fn state_manager(config: &AppConfig) -> StateManager {
    StateManager::new(&config.state, config.state_dir())
}

/// Learned state as last persisted; empty on a cold start.
pub fn latest_snapshot(config: &AppConfig) -> Option<Snapshot> {
    state_manager(config).restore_latest()
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
