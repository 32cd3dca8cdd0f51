//! 7-factor weighted scoring with pace-interaction adjustments.
//!
//! Each sub-score is a fixed deterministic rule table over a horse's recent
//! record; any parse failure degrades to a neutral default instead of
//! erroring. Horses are scored independently and in parallel, then merged
//! with a stable sort so equal finals keep their card order.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::config::{PaceConfig, ProfileConfig};
use crate::pace::{aggregate_recent, HorsePaceInput, PaceAnalysis, RaceStyleAnalyzer};
use crate::storage::DarkHorseStore;
use crate::types::{EvaluationOutcome, HorseEntry, PastRace, RaceData, ScoreBreakdown};

/// Factor weights for one scoring pass. Injected per caller, never global,
/// so profiles can vary between tests and deployments without interference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightProfile {
    pub past_performance: f64,
    pub course_fit: f64,
    pub track_condition: f64,
    pub weight_change: f64,
    pub interval: f64,
    pub odds_value: f64,
    pub dark_horse: f64,
    /// Ability mode penalizes class jumps; value mode does not.
    #[serde(default)]
    pub apply_class_penalty: bool,
}

impl WeightProfile {
    /// Profile emphasizing realized performance and course fit.
    pub fn ability() -> Self {
        Self {
            past_performance: 0.25,
            course_fit: 0.25,
            track_condition: 0.10,
            weight_change: 0.03,
            interval: 0.07,
            odds_value: 0.18,
            dark_horse: 0.12,
            apply_class_penalty: true,
        }
    }

    /// Profile emphasizing odds-implied value and longshot signals.
    pub fn value() -> Self {
        Self {
            past_performance: 0.22,
            course_fit: 0.23,
            track_condition: 0.08,
            weight_change: 0.02,
            interval: 0.07,
            odds_value: 0.23,
            dark_horse: 0.15,
            apply_class_penalty: false,
        }
    }
}

/// House-rule scoring constants. Empirically chosen; kept verbatim rather
/// than re-derived.
struct Rules;

impl Rules {
    // Past performance
    const RECENCY_WEIGHTS: [f64; 5] = [1.5, 1.2, 1.0, 0.8, 0.5];
    const WIN_MARGIN_BONUS_MAX: f64 = 20.0;
    const WIN_MARGIN_MULTIPLIER: f64 = 5.0;
    const PLACE_MIN: f64 = 30.0;
    const PLACE_PENALTY: f64 = 8.0;
    // Course fit
    const DISTANCE_TOLERANCE: i64 = 200;
    const DISTANCE_BONUS_TOP3: f64 = 12.0;
    const DISTANCE_BONUS_TOP5: f64 = 4.0;
    const VENUE_BONUS_TOP3: f64 = 15.0;
    const VENUE_BONUS_TOP5: f64 = 5.0;
    // Interval (days)
    const INTERVAL_OPTIMAL_MIN: i64 = 14;
    const INTERVAL_OPTIMAL_MAX: i64 = 42;
    const INTERVAL_SHORT_MIN: i64 = 7;
    const INTERVAL_NORMAL_MAX: i64 = 84;
    // Dark-horse odds buckets
    const DARK_ODDS_HIGH: f64 = 20.0;
    const DARK_ODDS_MID: f64 = 10.0;
    const DARK_SCORE_HIGH: f64 = 80.0;
    const DARK_SCORE_MID: f64 = 65.0;
    const DARK_SCORE_LOW: f64 = 40.0;
    // Neutral defaults when history is missing
    const NEUTRAL_PAST: f64 = 50.0;
    const NEUTRAL_COURSE: f64 = 60.0;
    const NEUTRAL_TRACK: f64 = 50.0;
    const NEUTRAL_WEIGHT: f64 = 50.0;
    // Finish assumed for a start whose result never parsed
    const FALLBACK_FINISH: u32 = 18;
}

/// Grade ladder; most specific tokens first so "GIII" is not read as "GI".
const GRADE_LEVELS: [(&str, i32); 7] = [
    ("GIII", 3),
    ("GII", 4),
    ("GI", 5),
    ("OP", 2),
    ("3勝", 1),
    ("2勝", 0),
    ("1勝", -1),
];

const DEFAULT_GRADE_LEVEL: i32 = 2;

/// Scores every horse on a card under both weight profiles.
pub struct HorseScoreEvaluator {
    store: Arc<DarkHorseStore>,
    pace: PaceConfig,
    profiles: ProfileConfig,
}

impl HorseScoreEvaluator {
    pub fn new(store: Arc<DarkHorseStore>, pace: PaceConfig, profiles: ProfileConfig) -> Self {
        Self {
            store,
            pace,
            profiles,
        }
    }

    /// Run both scoring passes over a race snapshot.
    ///
    /// Total over any structurally valid input: an empty field returns the
    /// empty outcome and a single degenerate entry never aborts the race.
    pub fn evaluate_horses(&self, race: &RaceData) -> EvaluationOutcome {
        if race.horses.is_empty() {
            return EvaluationOutcome::default();
        }

        // Race-shape forecast from the horses with usable history.
        let inputs: Vec<HorsePaceInput> = race
            .horses
            .iter()
            .filter(|h| !h.recent_races.is_empty())
            .map(|h| HorsePaceInput {
                name: h.name.clone(),
                features: aggregate_recent(&h.recent_races),
            })
            .collect();

        let analyzer = RaceStyleAnalyzer::from_config(&self.pace);
        let pace_analysis = analyzer.analyze(&inputs);

        let ability_results = self.scoring_pass(race, &self.profiles.ability, &pace_analysis);
        let value_results = self.scoring_pass(race, &self.profiles.value, &pace_analysis);

        EvaluationOutcome {
            ability_results,
            value_results,
            pace_analysis,
        }
    }

    fn scoring_pass(
        &self,
        race: &RaceData,
        profile: &WeightProfile,
        pace: &PaceAnalysis,
    ) -> Vec<ScoreBreakdown> {
        let mut results: Vec<ScoreBreakdown> = race
            .horses
            .par_iter()
            .map(|h| {
                let adjustment = pace.adjustments.get(&h.name).copied().unwrap_or(1.0);
                self.evaluate_horse(h, race, profile, adjustment)
            })
            .collect();

        // Stable sort: equal finals keep card order.
        results.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
        });
        results
    }

    /// Score a single horse under one weight profile.
    pub fn evaluate_horse(
        &self,
        horse: &HorseEntry,
        race: &RaceData,
        profile: &WeightProfile,
        adjustment: f64,
    ) -> ScoreBreakdown {
        let past = eval_past_performance(horse);
        let course = eval_course_fit(horse, race);
        let track = eval_track_condition(horse, race);
        let weight = eval_weight_change(horse, race);
        let interval = eval_interval(horse, race);
        let odds = eval_odds_value(horse, past, course);
        let dark = self.eval_dark_horse(horse);

        let class_penalty = if profile.apply_class_penalty {
            eval_class_penalty(horse, race)
        } else {
            0.0
        };

        let final_score = (past * profile.past_performance
            + course * profile.course_fit
            + track * profile.track_condition
            + weight * profile.weight_change
            + interval * profile.interval
            + odds * profile.odds_value
            + dark * profile.dark_horse
            + class_penalty)
            * adjustment;

        ScoreBreakdown {
            name: horse.name.clone(),
            number: horse.number,
            odds: horse.odds,
            jockey: horse.jockey.clone(),
            weight: horse.weight,
            weight_change: horse.weight_change,
            popularity: horse.popularity,
            final_score: round_to(final_score, 2),
            performance_score: round_to(past, 1),
            course_fit_score: round_to(course, 1),
            track_condition_score: round_to(track, 1),
            weight_change_score: round_to(weight, 1),
            interval_score: round_to(interval, 1),
            odds_value_score: round_to(odds, 1),
            dark_horse_score: round_to(dark, 1),
            class_penalty: round_to(class_penalty, 1),
            pace_adjustment: adjustment,
        }
    }

    /// Curated store hit wins; otherwise bucket by the current price.
    fn eval_dark_horse(&self, horse: &HorseEntry) -> f64 {
        if let Some(record) = self.store.search(&horse.name) {
            if record.evaluation_score > 0.0 {
                tracing::debug!("Dark-horse hit {}: {}", horse.name, record.evaluation_reason);
                return record.evaluation_score;
            }
        }

        if horse.odds > Rules::DARK_ODDS_HIGH {
            Rules::DARK_SCORE_HIGH
        } else if horse.odds > Rules::DARK_ODDS_MID {
            Rules::DARK_SCORE_MID
        } else {
            Rules::DARK_SCORE_LOW
        }
    }
}

fn finish_of(race: &PastRace) -> u32 {
    race.finish.unwrap_or(Rules::FALLBACK_FINISH)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Recency-weighted finish scoring, a win-streak bonus and a short-term
/// trend blended 70/30.
fn eval_past_performance(horse: &HorseEntry) -> f64 {
    let races = &horse.recent_races;
    if races.is_empty() {
        return Rules::NEUTRAL_PAST;
    }

    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for (i, race) in races.iter().take(5).enumerate() {
        let finish = finish_of(race);
        let margin = race.time_margin;

        let score = if finish == 1 {
            let mut base =
                100.0 + (margin * Rules::WIN_MARGIN_MULTIPLIER).min(Rules::WIN_MARGIN_BONUS_MAX);
            // A win against a big field is worth more than one against a
            // thin one.
            if race.runners >= 16 {
                base *= 1.2;
            } else if race.runners <= 10 {
                base *= 0.9;
            }
            base
        } else {
            (100.0 - (finish as f64 - 1.0) * Rules::PLACE_PENALTY).max(Rules::PLACE_MIN)
                + ((margin - 0.5) * -3.0).max(-15.0)
        };

        let w = Rules::RECENCY_WEIGHTS[i];
        weighted_sum += score.max(0.0) * w;
        weight_sum += w;
    }

    let mut base = weighted_sum / weight_sum;

    // Win streak counted over the whole record, newest start first.
    let streak = races.iter().take_while(|r| finish_of(r) == 1).count();
    let bonus = match streak {
        s if s >= 3 => 15.0,
        2 => 8.0,
        _ => 0.0,
    };
    base = (base + bonus).min(100.0);

    // Short-term trend over the last three starts.
    let mut trend = 0.0;
    if races.len() >= 3 {
        for i in 1..3 {
            let newer = finish_of(&races[i - 1]);
            let older = finish_of(&races[i]);
            if newer < older {
                trend += 15.0;
            } else if newer > older {
                trend -= 10.0;
            }
        }
    }

    base * 0.7 + (50.0 + trend) * 0.3
}

/// Distance fit blended 60/40 with venue fit.
fn eval_course_fit(horse: &HorseEntry, race: &RaceData) -> f64 {
    let races = &horse.recent_races;
    if races.is_empty() {
        return Rules::NEUTRAL_COURSE;
    }

    let current_dist = race.distance as i64;
    let current_venue = &race.race_info.venue;

    let mut dist_score = 60.0;
    for past in races.iter().take(5) {
        if (past.distance as i64 - current_dist).abs() <= Rules::DISTANCE_TOLERANCE {
            let finish = finish_of(past);
            if finish <= 3 {
                dist_score += Rules::DISTANCE_BONUS_TOP3;
            } else if finish <= 5 {
                dist_score += Rules::DISTANCE_BONUS_TOP5;
            }
        }
    }
    let dist_score = dist_score.min(100.0);

    let mut venue_score = 60.0;
    for past in races.iter().take(5) {
        if !current_venue.is_empty() && past.venue == *current_venue {
            let finish = finish_of(past);
            if finish <= 3 {
                venue_score += Rules::VENUE_BONUS_TOP3;
            } else if finish <= 5 {
                venue_score += Rules::VENUE_BONUS_TOP5;
            }
        }
    }
    let venue_score = venue_score.min(100.0);

    dist_score * 0.6 + venue_score * 0.4
}

/// Mean finish under the same going, mapped onto 0-100.
fn eval_track_condition(horse: &HorseEntry, race: &RaceData) -> f64 {
    let races = &horse.recent_races;
    if races.is_empty() {
        return Rules::NEUTRAL_TRACK;
    }

    let current = &race.race_info.track_condition;
    let matching: Vec<f64> = races
        .iter()
        .take(5)
        .filter(|past| past.track_condition == *current)
        .map(|past| finish_of(past) as f64)
        .collect();

    if matching.is_empty() {
        return Rules::NEUTRAL_TRACK;
    }

    let avg = matching.iter().sum::<f64>() / matching.len() as f64;
    (100.0 - (avg - 1.0) * 10.0).clamp(0.0, 100.0)
}

/// Days since the last start, bucketed. Unparseable dates score 0.
fn eval_interval(horse: &HorseEntry, race: &RaceData) -> f64 {
    let race_date = race.race_info.date.as_deref().and_then(parse_date);
    let last_date = horse
        .recent_races
        .first()
        .and_then(|r| r.date.as_deref())
        .and_then(parse_date);

    let (Some(race_date), Some(last_date)) = (race_date, last_date) else {
        return 0.0;
    };

    let days = (race_date - last_date).num_days();
    if (Rules::INTERVAL_OPTIMAL_MIN..=Rules::INTERVAL_OPTIMAL_MAX).contains(&days) {
        15.0
    } else if (Rules::INTERVAL_SHORT_MIN..Rules::INTERVAL_OPTIMAL_MIN).contains(&days) {
        -5.0
    } else if ((Rules::INTERVAL_OPTIMAL_MAX + 1)..=Rules::INTERVAL_NORMAL_MAX).contains(&days) {
        0.0
    } else {
        -10.0
    }
}

/// Ability-against-price value with log damping on extreme odds.
fn eval_odds_value(horse: &HorseEntry, past: f64, course: f64) -> f64 {
    let odds = horse.odds;
    if odds < 1.0 {
        return 0.0;
    }

    let ability_norm = (past + course) / 2.0 / 100.0;

    // Log damping keeps extreme prices from producing runaway value.
    let odds_factor = if odds > 20.0 {
        20.0 + (odds / 20.0 + 1.0).ln() * 5.0
    } else {
        odds
    };

    let adjusted_ev = ability_norm * odds_factor - 1.0;
    let mut score = (50.0 + adjusted_ev * 10.0).clamp(0.0, 100.0);

    // A weak horse is not value at any price.
    if ability_norm < 0.3 && odds > 30.0 {
        score *= 0.5;
    }

    score
}

/// Body-weight band and delta, with a wider tolerance after a long break.
fn eval_weight_change(horse: &HorseEntry, race: &RaceData) -> f64 {
    let Some(weight) = horse.weight else {
        return Rules::NEUTRAL_WEIGHT;
    };
    let delta = horse.weight_change.unwrap_or(0);

    let mut score: f64 = 50.0;

    if (450..=520).contains(&weight) {
        score += 10.0;
    } else if weight < 420 || weight > 550 {
        score -= 10.0;
    }

    score += match delta {
        -3..=3 => 20.0,
        -8..=-4 => 10.0,
        4..=8 => 5.0,
        d if d < -15 => -15.0,
        d if d > 15 => -20.0,
        -15..=-9 => -5.0,
        _ => -10.0, // 9..=15
    };

    // A 60+ day break widens the tolerated gain band.
    let race_date = race.race_info.date.as_deref().and_then(parse_date);
    let last_date = horse
        .recent_races
        .first()
        .and_then(|r| r.date.as_deref())
        .and_then(parse_date);
    if let (Some(race_date), Some(last_date)) = (race_date, last_date) {
        if (race_date - last_date).num_days() > 60 && (0..=20).contains(&delta) {
            score += 5.0;
        }
    }

    score.clamp(0.0, 100.0)
}

/// Step-up penalty when the current grade outranks the last start's.
fn eval_class_penalty(horse: &HorseEntry, race: &RaceData) -> f64 {
    let Some(last) = horse.recent_races.first() else {
        return 0.0;
    };

    let current_level = GRADE_LEVELS
        .iter()
        .find(|(g, _)| *g == race.race_info.grade)
        .map(|(_, level)| *level)
        .unwrap_or(DEFAULT_GRADE_LEVEL);

    let class_text = last.class.as_deref().unwrap_or("");
    let last_level = GRADE_LEVELS
        .iter()
        .find(|(g, _)| last.race_name.contains(g) || class_text.contains(g))
        .map(|(_, level)| *level)
        .unwrap_or(DEFAULT_GRADE_LEVEL);

    match current_level - last_level {
        d if d <= 0 => 0.0,
        1 => -5.0,
        2 => -10.0,
        _ => -15.0,
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
