//! `cadence hooks` — Show configured hook bindings.

use super::CliResult;
use cadence_hooks::HookRegistry;

pub fn run(json: bool) -> CliResult {
    let config = super::load_config()?;
    let summary = HookRegistry::from_bindings(&config.hooks.bindings)?.summary();

    if json {
        return super::print_json(&summary);
    }
    if summary.is_empty() {
        println!("No hook bindings configured");
        return Ok(());
    }
    for hook in &summary {
        let timeout = hook.timeout_ms.unwrap_or(config.hooks.default_timeout_ms);
        println!(
            "{} {:<24} /{}/  timeout {timeout}ms  {}",
            if hook.enabled { "●" } else { "○" },
            hook.id,
            hook.matcher,
            hook.executable
        );
    }
    Ok(())
}
