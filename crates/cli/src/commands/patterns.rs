//! `cadence patterns` — List learned patterns.

use super::CliResult;

pub fn run(limit: usize, json: bool) -> CliResult {
    let config = super::load_config()?;
    let mut patterns = super::latest_snapshot(&config)
        .map(|s| s.patterns)
        .unwrap_or_default();
    // Snapshots store patterns best first
    patterns.truncate(limit);

    if json {
        return super::print_json(&patterns);
    }
    if patterns.is_empty() {
        println!("No patterns learned yet, run `cadence ingest` first");
        return Ok(());
    }
    println!("{:>10}  {:>6}  {:<20}  signature", "confidence", "seen", "last seen");
    for p in &patterns {
        println!(
            "{:>10.3}  {:>6}  {:<20}  {}",
            p.confidence,
            p.occurrences,
            p.last_seen.format("%Y-%m-%d %H:%M:%S"),
            p.describe()
        );
    }
    Ok(())
}
