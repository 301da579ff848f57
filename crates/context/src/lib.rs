//! Context relevance engine.
//!
//! Tracks which project files the assistant touches and ranks them for
//! inclusion in its working context.

pub mod relevance;

pub use relevance::RelevanceCache;
