//! `cadence init` — Write a starter config.

use super::CliResult;
use cadence_config::AppConfig;

pub fn run(force: bool, json: bool) -> CliResult {
    let dir = AppConfig::config_dir();
    let path = dir.join("config.toml");

    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }

    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("Failed to create {}: {e}", dir.display()))?;
    std::fs::write(&path, AppConfig::default_toml())
        .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), "Config written");

    if json {
        return super::print_json(&serde_json::json!({ "config": path }));
    }
    println!("Wrote {}", path.display());
    println!("Edit [[hooks.bindings]] to point at your hook scripts.");
    Ok(())
}
