//! `cadence status` — Show paths and learned state.

use super::CliResult;
use cadence_config::AppConfig;

pub fn run(json: bool) -> CliResult {
    let config = super::load_config()?;
    let config_path = AppConfig::config_dir().join("config.toml");
    let manager = super::state_manager(&config);
    let snapshots = manager.snapshots()?;
    let latest = manager.restore_latest();

    if json {
        return super::print_json(&serde_json::json!({
            "config": config_path,
            "config_exists": config_path.exists(),
            "state_dir": manager.dir(),
            "snapshots": snapshots.len(),
            "latest": latest.as_ref().map(|s| serde_json::json!({
                "id": s.id,
                "taken_at": s.taken_at,
                "patterns": s.patterns.len(),
                "relevance": s.relevance.len(),
            })),
            "bindings": config.hooks.bindings.len(),
            "confidence_threshold": config.learning.confidence_threshold,
            "sensitivity": config.learning.detection_sensitivity,
        }));
    }

    println!("Cadence Status");
    println!("==============");
    println!("  Config:       {}", config_path.display());
    println!("  State dir:    {}", manager.dir().display());
    println!("  Threshold:    {}", config.learning.confidence_threshold);
    println!("  Sensitivity:  {}", config.learning.detection_sensitivity);
    println!("  Bindings:     {}", config.hooks.bindings.len());
    println!("  Snapshots:    {}", snapshots.len());
    match latest {
        Some(s) => println!(
            "  Latest:       {} ({} patterns, {} relevant files)",
            s.taken_at.format("%Y-%m-%d %H:%M:%S"),
            s.patterns.len(),
            s.relevance.len()
        ),
        None => println!("  Latest:       none"),
    }

    if !config_path.exists() {
        println!("\n  No config file — run `cadence init` first");
    }
    Ok(())
}
