//! Workflow pattern learning.
//!
//! Events are appended to a bounded [`EventLog`]; after every append the
//! [`PatternDetector`] scans the recent window for repeated sequences and the
//! [`PatternLibrary`] reinforces them. The [`Predictor`] turns the library into
//! a guess about the next action.

pub mod confidence;
pub mod detector;
pub mod event_log;
pub mod learner;
pub mod library;
pub mod predictor;

pub use detector::{Detection, PatternDetector};
pub use event_log::EventLog;
pub use learner::{Learner, Observation};
pub use library::{PatternLibrary, PatternUpdate};
pub use predictor::{Prediction, Predictor};
