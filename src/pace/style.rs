//! Running-style classification from historical position data.

use serde::Serialize;
use std::fmt;

use super::parser::StyleFeatures;

/// Per-horse categorical running tendency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunningStyle {
    /// Sets the pace from the gate.
    Escape,
    /// Races forward, just off the pace.
    Leading,
    /// Sits midfield and runs down the leaders.
    Chase,
    /// Comes from the back of the field.
    Pursue,
    /// Not enough position data to tell.
    Unknown,
}

impl fmt::Display for RunningStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunningStyle::Escape => "escape",
            RunningStyle::Leading => "leading",
            RunningStyle::Chase => "chase",
            RunningStyle::Pursue => "pursue",
            RunningStyle::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// Classify a horse's running style from its aggregated features.
///
/// A deterministic decision table over the front-running ratio. Boundary
/// inclusivity is part of the contract: ratios at exactly 0.75, 0.40 and
/// 0.15 fall into the more front-favoring branch.
pub fn classify(features: &StyleFeatures) -> RunningStyle {
    let total = features.front_count + features.close_count;
    if total == 0 {
        return RunningStyle::Unknown;
    }

    let front_ratio = features.front_count as f64 / total as f64;

    if front_ratio >= 0.75 {
        // Almost always forward: a strong average finish marks a true
        // pace-setter, otherwise a presser.
        if matches!(features.avg_finish, Some(pos) if pos <= 5.0) {
            RunningStyle::Escape
        } else {
            RunningStyle::Leading
        }
    } else if front_ratio >= 0.40 {
        RunningStyle::Leading
    } else if front_ratio >= 0.15 {
        RunningStyle::Chase
    } else {
        RunningStyle::Pursue
    }
}
