//! The sequential learning path: log, detect, reinforce, predict.

use crate::detector::PatternDetector;
use crate::event_log::EventLog;
use crate::library::PatternLibrary;
use crate::predictor::{Prediction, Predictor};
use cadence_config::LearningConfig;
use cadence_core::{Event, EventInput, EventKind, Pattern};
use chrono::{DateTime, Utc};

/// What one observed event changed.
#[derive(Debug, Clone)]
pub struct Observation {
    pub event: Event,

    /// Patterns created or reinforced by this event
    pub updated: Vec<Pattern>,

    /// Patterns dropped to stay within capacity
    pub evicted: Vec<Pattern>,

    /// Next kind expected after this event
    pub prediction: Option<Prediction>,
}

/// Owns the event log and pattern library. Single writer.
#[derive(Debug)]
pub struct Learner {
    log: EventLog,
    library: PatternLibrary,
    detector: PatternDetector,
    predictor: Predictor,
}

impl Learner {
    pub fn new(config: &LearningConfig) -> Self {
        Self {
            log: EventLog::new(config.event_log_capacity.max(config.pattern_window_size)),
            library: PatternLibrary::new(config),
            detector: PatternDetector::new(config),
            predictor: Predictor::new(),
        }
    }

    /// Append an event, update patterns and predict what comes next.
    ///
    /// `now` is used when the input carries no timestamp.
    pub fn observe(&mut self, input: EventInput, now: DateTime<Utc>) -> Observation {
        let timestamp = input.timestamp.unwrap_or(now);
        let event = self.log.append(input.kind, input.subject, timestamp);

        let window: Vec<&Event> = self.log.window(self.detector.window_size()).collect();
        let detections = self.detector.detect(&window);

        let mut updated = Vec::with_capacity(detections.len());
        let mut evicted = Vec::new();
        for detection in detections {
            let update = match self.library.get(&detection.signature) {
                Some(_) => self.library.update_pattern(detection.signature, event.timestamp),
                None => self
                    .library
                    .record(detection.signature, detection.occurrences, event.timestamp),
            };
            updated.push(update.pattern);
            evicted.extend(update.evicted);
        }

        let prediction = self.predict();
        Observation {
            event,
            updated,
            evicted,
            prediction,
        }
    }

    /// Prediction for the current window.
    pub fn predict(&self) -> Option<Prediction> {
        let tail = self.log.tail_kinds(self.detector.window_size());
        self.predictor.predict_next(&self.library, &tail)
    }

    /// Prediction for an arbitrary tail (oldest first).
    pub fn predict_for(&self, tail: &[EventKind]) -> Option<Prediction> {
        self.predictor.predict_next(&self.library, tail)
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn library(&self) -> &PatternLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut PatternLibrary {
        &mut self.library
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::EventKind::*;
    use chrono::Duration;

    fn learner() -> Learner {
        Learner::new(&LearningConfig {
            min_pattern_length: 2,
            ..LearningConfig::default()
        })
    }

    #[test]
    fn read_edit_pairs_reach_three_occurrences() {
        let mut learner = learner();
        let start = Utc::now();
        let feed = [
            (Read, "a"),
            (Edit, "a"),
            (Read, "b"),
            (Edit, "b"),
            (Read, "a"),
            (Edit, "a"),
        ];

        let mut confidences = Vec::new();
        for (i, (kind, subject)) in feed.into_iter().enumerate() {
            let input = EventInput::new(kind, subject).at(start + Duration::seconds(i as i64));
            learner.observe(input, start);
            if let Some(p) = learner.library().get(&[Read, Edit]) {
                confidences.push(p.confidence);
            }
        }

        let pattern = learner.library().get(&[Read, Edit]).unwrap();
        assert_eq!(pattern.occurrences, 3);
        assert!(confidences.len() >= 2);
        assert!(confidences.windows(2).all(|w| w[1] >= w[0]));
        assert!(confidences.last().unwrap() > confidences.first().unwrap());
    }

    #[test]
    fn prediction_follows_learned_pair() {
        let mut learner = learner();
        let now = Utc::now();
        for subject in ["a", "b", "c"] {
            learner.observe(EventInput::new(Read, subject), now);
            learner.observe(EventInput::new(Edit, subject), now);
        }
        let obs = learner.observe(EventInput::new(Read, "d"), now);
        let prediction = obs.prediction.unwrap();
        assert_eq!(prediction.kind, Edit);
    }

    #[test]
    fn identical_feeds_yield_identical_libraries() {
        let now = Utc::now();
        let feed = [Read, Grep, Edit, Read, Grep, Edit, Write, Read, Grep, Edit];
        let mut a = learner();
        let mut b = learner();
        for (i, kind) in feed.iter().enumerate() {
            let input = EventInput::new(kind.clone(), "f").at(now + Duration::seconds(i as i64));
            a.observe(input.clone(), now);
            b.observe(input, now);
        }
        assert!(!a.library().is_empty());
        assert_eq!(a.library().patterns(), b.library().patterns());
    }
}
