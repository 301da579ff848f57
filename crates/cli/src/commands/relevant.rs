//! `cadence relevant` — Show the most relevant files.

use super::CliResult;
use cadence_context::RelevanceCache;
use chrono::Utc;

pub fn run(k: usize, json: bool) -> CliResult {
    let config = super::load_config()?;
    let mut cache = RelevanceCache::new(&config.context);
    if let Some(snapshot) = super::latest_snapshot(&config) {
        cache.restore(snapshot.relevance);
    }
    // Scores are recomputed against the current time
    let entries = cache.top_k(k, Utc::now());

    if json {
        return super::print_json(&entries);
    }
    if entries.is_empty() {
        println!("No relevant files");
        return Ok(());
    }
    for e in &entries {
        println!("{:>7.3}  {:>4}x  {}", e.score, e.touches, e.subject);
    }
    Ok(())
}
