//! `cadence predict` — Predict the next action for a tail.

use super::CliResult;
use cadence_core::EventKind;
use cadence_learning::Learner;

pub fn run(kinds: Vec<String>, json: bool) -> CliResult {
    let config = super::load_config()?;
    let mut learner = Learner::new(&config.learning);
    if let Some(snapshot) = super::latest_snapshot(&config) {
        learner.library_mut().restore(snapshot.patterns);
    }

    let tail: Vec<EventKind> = kinds.into_iter().map(EventKind::from).collect();
    let prediction = learner.predict_for(&tail);
    let threshold = config.learning.confidence_threshold;

    if json {
        return super::print_json(&serde_json::json!({
            "prediction": prediction,
            "threshold": threshold,
        }));
    }
    match prediction {
        Some(p) => {
            let verdict = if p.confidence >= threshold {
                "would dispatch"
            } else {
                "below threshold"
            };
            println!(
                "{} (confidence {:.3}, {verdict} at {threshold})",
                p.kind, p.confidence
            );
        }
        None => println!("No prediction for this tail"),
    }
    Ok(())
}
