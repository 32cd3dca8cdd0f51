//! Running-style and pace-interaction pipeline.
//!
//! Stages, in order: parse raw pace notes into position/split features,
//! classify each horse's running style from its recent record, aggregate
//! the field into a race-shape forecast, and derive a bounded multiplicative
//! score adjustment per horse.

pub mod analyzer;
pub mod parser;
pub mod style;

pub use analyzer::{HorsePaceInput, Pace, PaceAnalysis, RaceStyleAnalyzer};
pub use parser::{aggregate_recent, StyleFeatures};
pub use style::RunningStyle;
