//! Race and horse domain records plus API response types.
//!
//! Upstream race JSON is inconsistently formatted free text in places, so
//! several fields deserialize leniently: a finish position may arrive as a
//! number or as text like "3着 13頭", a body weight as `500` or `"500kg"`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::pace::PaceAnalysis;

/// Assumed race distance when the document does not carry one.
pub const DEFAULT_DISTANCE: u32 = 2000;

/// Race-level information supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceInfo {
    #[serde(default)]
    pub name: String,
    /// Race date, "YYYY-MM-DD".
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, alias = "track")]
    pub venue: String,
    /// 良 / 稍重 / 重 / 不良
    #[serde(default = "default_track_condition")]
    pub track_condition: String,
    /// GI / GII / GIII / OP / 3勝 / 2勝 / 1勝
    #[serde(default)]
    pub grade: String,
}

fn default_track_condition() -> String {
    "良".to_string()
}

impl Default for RaceInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            date: None,
            venue: String::new(),
            track_condition: default_track_condition(),
            grade: String::new(),
        }
    }
}

/// One start from a horse's recent record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PastRace {
    /// Race date, "YYYY-MM-DD".
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, alias = "race")]
    pub race_name: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub distance: u32,
    #[serde(default, alias = "track")]
    pub venue: String,
    #[serde(default)]
    pub track_condition: String,
    /// Finish position; accepts a bare number or text with a leading rank.
    #[serde(default, alias = "result", deserialize_with = "de_flexible_position")]
    pub finish: Option<u32>,
    /// Field size.
    #[serde(default = "default_runners")]
    pub runners: u32,
    /// Margin in seconds (ahead of second place when winning).
    #[serde(default = "default_margin")]
    pub time_margin: f64,
    /// Raw pace log token, e.g. "1:59.3 3-3-4 3F 33.8".
    #[serde(default, alias = "time_margin_pace")]
    pub pace_note: String,
    /// Free-text result summary, e.g. "3着 13頭 9番人気".
    #[serde(default, alias = "position_runners_pop")]
    pub result_note: String,
}

fn default_runners() -> u32 {
    16
}

fn default_margin() -> f64 {
    1.0
}

/// One entry on the current card. Read-only to the scoring core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorseEntry {
    pub name: String,
    pub number: u32,
    /// Current win odds; must be positive for the entry to be scored.
    pub odds: f64,
    #[serde(default)]
    pub jockey: String,
    /// Body weight in kg.
    #[serde(default, deserialize_with = "de_flexible_weight")]
    pub weight: Option<u32>,
    /// Body-weight delta against the previous start.
    #[serde(default, deserialize_with = "de_flexible_delta")]
    pub weight_change: Option<i32>,
    #[serde(default)]
    pub popularity: Option<u32>,
    /// Sire name, used only for report commentary.
    #[serde(default, alias = "father")]
    pub pedigree: Option<String>,
    /// Most recent start first.
    #[serde(default)]
    pub recent_races: Vec<PastRace>,
}

/// Immutable snapshot of one race card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceData {
    #[serde(default)]
    pub race_info: RaceInfo,
    #[serde(default = "default_distance")]
    pub distance: u32,
    #[serde(default)]
    pub horses: Vec<HorseEntry>,
}

fn default_distance() -> u32 {
    DEFAULT_DISTANCE
}

impl Default for RaceData {
    fn default() -> Self {
        Self {
            race_info: RaceInfo::default(),
            distance: default_distance(),
            horses: Vec::new(),
        }
    }
}

/// Named sub-scores and the final weighted score for one horse.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub name: String,
    pub number: u32,
    pub odds: f64,
    pub jockey: String,
    pub weight: Option<u32>,
    pub weight_change: Option<i32>,
    pub popularity: Option<u32>,
    pub final_score: f64,
    pub performance_score: f64,
    pub course_fit_score: f64,
    pub track_condition_score: f64,
    pub weight_change_score: f64,
    pub interval_score: f64,
    pub odds_value_score: f64,
    pub dark_horse_score: f64,
    pub class_penalty: f64,
    pub pace_adjustment: f64,
}

/// Result of the two scoring passes plus the race-shape analysis.
///
/// An empty field yields the default value rather than an error.
#[derive(Debug, Clone, Serialize, Default)]
pub struct EvaluationOutcome {
    pub ability_results: Vec<ScoreBreakdown>,
    pub value_results: Vec<ScoreBreakdown>,
    pub pace_analysis: PaceAnalysis,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// First run of ASCII digits in a string.
fn leading_number(s: &str) -> Option<u32> {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleField {
    Int(i64),
    Float(f64),
    Text(String),
}

fn de_flexible_position<'de, D>(de: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<FlexibleField>::deserialize(de)? {
        Some(FlexibleField::Int(n)) if n > 0 => Some(n as u32),
        Some(FlexibleField::Float(f)) if f >= 1.0 => Some(f as u32),
        Some(FlexibleField::Text(s)) => leading_number(&s),
        _ => None,
    })
}

fn de_flexible_weight<'de, D>(de: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<FlexibleField>::deserialize(de)? {
        Some(FlexibleField::Int(n)) if n > 0 => Some(n as u32),
        Some(FlexibleField::Float(f)) if f > 0.0 => Some(f as u32),
        Some(FlexibleField::Text(s)) => leading_number(&s).filter(|&w| w > 0),
        _ => None,
    })
}

fn de_flexible_delta<'de, D>(de: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<FlexibleField>::deserialize(de)? {
        Some(FlexibleField::Int(n)) => Some(n as i32),
        Some(FlexibleField::Float(f)) => Some(f as i32),
        Some(FlexibleField::Text(s)) => s
            .trim()
            .trim_start_matches('+')
            .trim_end_matches("kg")
            .trim()
            .parse()
            .ok(),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_from_number() {
        let json = r#"{"finish": 3}"#;
        let race: PastRace = serde_json::from_str(json).unwrap();
        assert_eq!(race.finish, Some(3));
    }

    #[test]
    fn test_finish_from_text() {
        let json = r#"{"finish": "7着 16頭 3番人気"}"#;
        let race: PastRace = serde_json::from_str(json).unwrap();
        assert_eq!(race.finish, Some(7));
    }

    #[test]
    fn test_finish_from_result_alias() {
        let json = r#"{"result": 2}"#;
        let race: PastRace = serde_json::from_str(json).unwrap();
        assert_eq!(race.finish, Some(2));
    }

    #[test]
    fn test_finish_missing() {
        let race: PastRace = serde_json::from_str("{}").unwrap();
        assert_eq!(race.finish, None);
        assert_eq!(race.runners, 16);
        assert!((race.time_margin - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weight_from_text() {
        let json =
            r#"{"name": "A", "number": 1, "odds": 4.5, "weight": "498kg", "weight_change": "+4"}"#;
        let horse: HorseEntry = serde_json::from_str(json).unwrap();
        assert_eq!(horse.weight, Some(498));
        assert_eq!(horse.weight_change, Some(4));
    }

    #[test]
    fn test_weight_unknown_marker() {
        let json = r#"{"name": "A", "number": 1, "odds": 4.5, "weight": "?", "weight_change": "?"}"#;
        let horse: HorseEntry = serde_json::from_str(json).unwrap();
        assert_eq!(horse.weight, None);
        assert_eq!(horse.weight_change, None);
    }

    #[test]
    fn test_negative_delta_from_text() {
        let json =
            r#"{"name": "A", "number": 1, "odds": 4.5, "weight": 470, "weight_change": "-6"}"#;
        let horse: HorseEntry = serde_json::from_str(json).unwrap();
        assert_eq!(horse.weight_change, Some(-6));
    }

    #[test]
    fn test_race_info_defaults() {
        let info: RaceInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(info.track_condition, "良");
        assert!(info.grade.is_empty());
    }

    #[test]
    fn test_pace_note_alias() {
        let json = r#"{"time_margin_pace": "1:59.3 3-3-4 3F 33.8"}"#;
        let race: PastRace = serde_json::from_str(json).unwrap();
        assert_eq!(race.pace_note, "1:59.3 3-3-4 3F 33.8");
    }
}
