//! Race-level pace forecasting and per-horse score adjustments.
//!
//! The field's style features are z-score normalized, the strongest few
//! horses on each side decide the race shape, and every horse receives a
//! tanh-compressed multiplicative adjustment bounded to ±10%.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use super::parser::StyleFeatures;
use super::style::{classify, RunningStyle};
use crate::config::PaceConfig;

/// Race-shape forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    /// Early speed holds; front-runners are favored.
    FrontFavored,
    /// The pace collapses; closers are favored.
    CloserFavored,
    #[default]
    Average,
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Pace::FrontFavored => "front-favored",
            Pace::CloserFavored => "closer-favored",
            Pace::Average => "average",
        };
        write!(f, "{}", label)
    }
}

/// One horse's input to the race-level analysis.
#[derive(Debug, Clone)]
pub struct HorsePaceInput {
    pub name: String,
    pub features: StyleFeatures,
}

/// Diagnostic detail kept alongside the forecast for observability.
#[derive(Debug, Clone, Serialize, Default)]
pub struct PaceMetadata {
    pub running_styles: HashMap<String, RunningStyle>,
    pub front_z_scores: HashMap<String, f64>,
    pub close_z_scores: HashMap<String, f64>,
    pub front_top_sum: f64,
    pub close_top_sum: f64,
}

/// Forecast label, bounded per-horse multipliers, and diagnostics.
///
/// Lives for a single evaluation call; never persisted.
#[derive(Debug, Clone, Serialize, Default)]
pub struct PaceAnalysis {
    pub pace: Pace,
    pub adjustments: HashMap<String, f64>,
    pub metadata: PaceMetadata,
}

/// Aggregates per-horse style features into a race-shape forecast.
#[derive(Debug, Clone)]
pub struct RaceStyleAnalyzer {
    top_n: usize,
    adjustment_scale: f64,
    bias_threshold: f64,
}

impl Default for RaceStyleAnalyzer {
    fn default() -> Self {
        Self {
            top_n: 3,
            adjustment_scale: 0.08,
            bias_threshold: 0.12,
        }
    }
}

impl RaceStyleAnalyzer {
    pub fn new(top_n: usize, adjustment_scale: f64, bias_threshold: f64) -> Self {
        Self {
            top_n,
            adjustment_scale,
            bias_threshold,
        }
    }

    pub fn from_config(config: &PaceConfig) -> Self {
        Self::new(config.top_n, config.adjustment_scale, config.bias_threshold)
    }

    /// Forecast the race shape and derive each horse's adjustment.
    ///
    /// A field with no spread (all-equal features, or a single horse) has
    /// all-zero z-scores, an "average" forecast and multipliers of 1.0.
    pub fn analyze(&self, horses: &[HorsePaceInput]) -> PaceAnalysis {
        let mut running_styles = HashMap::new();
        for h in horses {
            running_styles.insert(h.name.clone(), classify(&h.features));
        }

        // Raw front/close signals: counts with small corrections from the
        // averaged finish and closing split, when known.
        let mut front_features = Vec::with_capacity(horses.len());
        let mut close_features = Vec::with_capacity(horses.len());
        for h in horses {
            let mut front = h.features.front_count as f64;
            let mut close = h.features.close_count as f64;

            if let Some(pos) = h.features.avg_finish {
                front += ((11.0 - pos) / 10.0).max(0.0) * 0.25;
            }
            if let Some(split) = h.features.avg_last_3f {
                close += ((40.0 - split) / 6.0).max(0.0) * 0.6;
            }

            front_features.push(front);
            close_features.push(close);
        }

        let front_z = z_scores(&front_features);
        let close_z = z_scores(&close_features);

        // Only above-average horses count toward the race shape.
        let front_top_sum = top_positive_sum(&front_z, self.top_n);
        let close_top_sum = top_positive_sum(&close_z, self.top_n);

        let pace = if front_top_sum > close_top_sum * (1.0 + self.bias_threshold) {
            Pace::FrontFavored
        } else if close_top_sum > front_top_sum * (1.0 + self.bias_threshold) {
            Pace::CloserFavored
        } else {
            Pace::Average
        };

        let max_adjustment = (self.adjustment_scale * 1.25).min(0.10);
        let mut adjustments = HashMap::new();
        let mut front_z_map = HashMap::new();
        let mut close_z_map = HashMap::new();

        for (i, h) in horses.iter().enumerate() {
            let raw_diff = match pace {
                Pace::CloserFavored => close_z[i] - front_z[i],
                Pace::FrontFavored => front_z[i] - close_z[i],
                Pace::Average => 0.0,
            };

            // tanh keeps an outlier z-gap from producing an outsized swing.
            let scaled = raw_diff.tanh();
            let multiplier =
                1.0 + (scaled * self.adjustment_scale).clamp(-max_adjustment, max_adjustment);

            adjustments.insert(h.name.clone(), round_to(multiplier, 4));
            front_z_map.insert(h.name.clone(), front_z[i]);
            close_z_map.insert(h.name.clone(), close_z[i]);
        }

        PaceAnalysis {
            pace,
            adjustments,
            metadata: PaceMetadata {
                running_styles,
                front_z_scores: front_z_map,
                close_z_scores: close_z_map,
                front_top_sum: round_to(front_top_sum, 3),
                close_top_sum: round_to(close_top_sum, 3),
            },
        }
    }
}

/// Population z-scores; a zero-variance field maps to all zeros.
fn z_scores(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let n = values.len() as f64;
    let mu = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / n;
    let sigma = variance.sqrt();

    if sigma == 0.0 {
        return vec![0.0; values.len()];
    }

    values.iter().map(|v| (v - mu) / sigma).collect()
}

/// Sum of the `top_n` largest z-scores, with negatives clipped to zero.
fn top_positive_sum(z: &[f64], top_n: usize) -> f64 {
    let mut sorted = z.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    sorted.iter().take(top_n).map(|v| v.max(0.0)).sum()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(
        name: &str,
        front: u32,
        close: u32,
        avg_finish: Option<f64>,
        avg_last_3f: Option<f64>,
    ) -> HorsePaceInput {
        HorsePaceInput {
            name: name.to_string(),
            features: StyleFeatures {
                front_count: front,
                close_count: close,
                avg_finish,
                avg_last_3f,
            },
        }
    }

    #[test]
    fn test_z_scores_zero_variance() {
        assert_eq!(z_scores(&[2.0, 2.0, 2.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_z_scores_population_sigma() {
        let z = z_scores(&[1.0, 2.0, 3.0]);
        // Population sigma of [1,2,3] is sqrt(2/3).
        let sigma = (2.0f64 / 3.0).sqrt();
        assert!((z[0] - (-1.0 / sigma)).abs() < 1e-9);
        assert!((z[1]).abs() < 1e-9);
        assert!((z[2] - (1.0 / sigma)).abs() < 1e-9);
    }

    #[test]
    fn test_single_horse_field_is_average() {
        let analyzer = RaceStyleAnalyzer::default();
        let analysis = analyzer.analyze(&[input("A", 4, 1, Some(3.0), Some(34.0))]);

        assert_eq!(analysis.pace, Pace::Average);
        assert_eq!(analysis.adjustments["A"], 1.0);
    }

    #[test]
    fn test_uniform_field_is_average() {
        let analyzer = RaceStyleAnalyzer::default();
        let horses: Vec<_> = ["A", "B", "C", "D"]
            .iter()
            .map(|n| input(n, 3, 2, None, None))
            .collect();

        let analysis = analyzer.analyze(&horses);
        assert_eq!(analysis.pace, Pace::Average);
        for z in analysis.metadata.front_z_scores.values() {
            assert_eq!(*z, 0.0);
        }
        for adj in analysis.adjustments.values() {
            assert_eq!(*adj, 1.0);
        }
    }

    #[test]
    fn test_front_heavy_field_is_front_favored() {
        let analyzer = RaceStyleAnalyzer::default();
        // Close signals are flat (zero variance), so the front spread alone
        // decides the shape.
        let horses = vec![
            input("A", 5, 0, Some(2.0), None),
            input("B", 4, 0, Some(3.0), None),
            input("C", 3, 0, None, None),
            input("D", 0, 0, None, None),
        ];

        let analysis = analyzer.analyze(&horses);
        assert_eq!(analysis.pace, Pace::FrontFavored);
        assert!(analysis.metadata.front_top_sum > analysis.metadata.close_top_sum);
        // Strong front-runners gain, the blank horse loses.
        assert!(analysis.adjustments["A"] > 1.0);
        assert!(analysis.adjustments["D"] < 1.0);
    }

    #[test]
    fn test_closer_heavy_field_is_closer_favored() {
        let analyzer = RaceStyleAnalyzer::default();
        let horses = vec![
            input("A", 0, 5, None, Some(33.0)),
            input("B", 0, 4, None, Some(33.5)),
            input("C", 0, 3, None, None),
            input("D", 0, 0, None, None),
        ];

        let analysis = analyzer.analyze(&horses);
        assert_eq!(analysis.pace, Pace::CloserFavored);
        assert!(analysis.adjustments["A"] > 1.0);
        assert!(analysis.adjustments["D"] < 1.0);
    }

    #[test]
    fn test_adjustments_are_bounded() {
        for scale in [0.05, 0.08, 0.10, 0.20] {
            let analyzer = RaceStyleAnalyzer::new(3, scale, 0.12);
            let max_adj = (scale * 1.25_f64).min(0.10);

            // Wide one-sided spread to push tanh toward saturation.
            let horses = vec![
                input("A", 20, 0, Some(1.0), None),
                input("B", 10, 0, None, None),
                input("C", 0, 0, None, None),
            ];

            let analysis = analyzer.analyze(&horses);
            assert_eq!(analysis.pace, Pace::FrontFavored);
            for adj in analysis.adjustments.values() {
                assert!(*adj >= 1.0 - max_adj - 1e-9);
                assert!(*adj <= 1.0 + max_adj + 1e-9);
            }
        }
    }

    #[test]
    fn test_multipliers_rounded_to_four_decimals() {
        let analyzer = RaceStyleAnalyzer::default();
        let horses = vec![
            input("A", 5, 0, Some(2.0), None),
            input("B", 4, 1, Some(3.0), None),
            input("C", 0, 5, None, Some(38.0)),
        ];

        let analysis = analyzer.analyze(&horses);
        for adj in analysis.adjustments.values() {
            let scaled = adj * 10_000.0;
            assert!((scaled - scaled.round()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_finish_bonus_separates_equal_counts() {
        let analyzer = RaceStyleAnalyzer::default();
        // Equal front counts: only A carries the average-finish bonus.
        let with_bonus = analyzer.analyze(&[
            input("A", 3, 0, Some(1.0), None),
            input("B", 3, 0, None, None),
            input("C", 0, 3, None, None),
        ]);
        assert!(
            with_bonus.metadata.front_z_scores["A"] > with_bonus.metadata.front_z_scores["B"]
        );

        // Without it the two are indistinguishable.
        let without_bonus = analyzer.analyze(&[
            input("A", 3, 0, None, None),
            input("B", 3, 0, None, None),
            input("C", 0, 3, None, None),
        ]);
        assert_eq!(
            without_bonus.metadata.front_z_scores["A"],
            without_bonus.metadata.front_z_scores["B"]
        );
    }

    #[test]
    fn test_split_bonus_boosts_close_signal() {
        let analyzer = RaceStyleAnalyzer::default();
        // Equal close counts: only A carries the fast-split bonus.
        let analysis = analyzer.analyze(&[
            input("A", 0, 3, None, Some(33.0)),
            input("B", 0, 3, None, None),
            input("C", 3, 0, None, None),
        ]);
        assert!(
            analysis.metadata.close_z_scores["A"] > analysis.metadata.close_z_scores["B"]
        );
    }

    #[test]
    fn test_empty_field() {
        let analyzer = RaceStyleAnalyzer::default();
        let analysis = analyzer.analyze(&[]);
        assert_eq!(analysis.pace, Pace::Average);
        assert!(analysis.adjustments.is_empty());
    }

    #[test]
    fn test_styles_reported_in_metadata() {
        let analyzer = RaceStyleAnalyzer::default();
        let analysis = analyzer.analyze(&[
            input("A", 4, 0, Some(3.0), None),
            input("B", 1, 9, None, None),
        ]);

        assert_eq!(analysis.metadata.running_styles["A"], RunningStyle::Escape);
        assert_eq!(analysis.metadata.running_styles["B"], RunningStyle::Pursue);
    }
}
