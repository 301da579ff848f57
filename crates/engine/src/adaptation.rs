//! Decides, per processed event, whether any hook should fire.

use cadence_core::EventKind;
use cadence_hooks::{HookRegistry, RegisteredHook};
use cadence_learning::Prediction;
use std::collections::HashSet;
use std::sync::Arc;

/// Result of evaluating one event.
#[derive(Debug, Clone)]
pub enum Decision {
    /// The library has nothing to say about the current tail
    NoPrediction,

    /// A prediction exists but is not trusted enough
    BelowThreshold { confidence: f64, threshold: f64 },

    /// Confident, but no enabled binding matches
    NoBinding { predicted: EventKind },

    /// Submit these hooks to the dispatcher
    Dispatch {
        prediction: Prediction,
        hooks: Vec<Arc<RegisteredHook>>,
    },
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::NoPrediction => "no_prediction",
            Decision::BelowThreshold { .. } => "below_threshold",
            Decision::NoBinding { .. } => "no_binding",
            Decision::Dispatch { .. } => "dispatch",
        }
    }
}

pub struct AdaptationEngine {
    threshold: f64,
    registry: Arc<HookRegistry>,
}

impl AdaptationEngine {
    pub fn new(threshold: f64, registry: Arc<HookRegistry>) -> Self {
        Self {
            threshold,
            registry,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Hooks fire only when the prediction meets the threshold and an enabled
    /// binding matches the predicted or the observed kind.
    pub fn evaluate(&self, prediction: Option<&Prediction>, observed: &EventKind) -> Decision {
        let Some(prediction) = prediction else {
            return Decision::NoPrediction;
        };
        if prediction.confidence < self.threshold {
            return Decision::BelowThreshold {
                confidence: prediction.confidence,
                threshold: self.threshold,
            };
        }

        let mut seen = HashSet::new();
        let hooks: Vec<Arc<RegisteredHook>> = self
            .registry
            .matching(&prediction.kind)
            .into_iter()
            .chain(self.registry.matching(observed))
            .filter(|h| seen.insert(h.id().to_string()))
            .collect();

        if hooks.is_empty() {
            return Decision::NoBinding {
                predicted: prediction.kind.clone(),
            };
        }
        Decision::Dispatch {
            prediction: prediction.clone(),
            hooks,
        }
    }
}
