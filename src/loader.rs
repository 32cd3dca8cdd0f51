//! Race-data loading with structural validation.
//!
//! Upstream documents come from hand-assembled JSON and are not trusted:
//! an entry missing its name, number or a positive odds value is dropped
//! with a warning instead of failing the whole race.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

use crate::types::{HorseEntry, RaceData, RaceInfo, DEFAULT_DISTANCE};

/// Load and validate a race-data JSON file.
pub fn load_race_file(path: &Path) -> Result<RaceData> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read race data: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    parse_race_data(value)
}

/// Validate a raw race-data document, dropping invalid entries.
pub fn parse_race_data(value: Value) -> Result<RaceData> {
    let Value::Object(mut doc) = value else {
        anyhow::bail!("Race data must be a JSON object");
    };

    let race_info = match doc.remove("race_info") {
        Some(v) => match serde_json::from_value::<RaceInfo>(v) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Unreadable race_info ({e}); using defaults");
                RaceInfo::default()
            }
        },
        None => RaceInfo::default(),
    };

    let distance = doc
        .remove("distance")
        .and_then(|v| v.as_u64())
        .map(|d| d as u32)
        .unwrap_or(DEFAULT_DISTANCE);

    let raw_horses = match doc.remove("horses") {
        Some(Value::Array(entries)) => entries,
        Some(_) => anyhow::bail!("\"horses\" must be an array"),
        None => Vec::new(),
    };

    let mut horses: Vec<HorseEntry> = Vec::with_capacity(raw_horses.len());
    for entry in raw_horses {
        match serde_json::from_value::<HorseEntry>(entry) {
            Ok(h) => {
                if h.name.is_empty() || h.odds <= 0.0 {
                    tracing::warn!("Dropping entry #{} without usable name/odds", h.number);
                } else {
                    horses.push(h);
                }
            }
            Err(e) => {
                tracing::warn!("Dropping structurally invalid entry: {e}");
            }
        }
    }

    Ok(RaceData {
        race_info,
        distance,
        horses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_complete_document() {
        let doc = json!({
            "race_info": {
                "name": "有馬記念",
                "date": "2025-12-28",
                "track": "中山",
                "track_condition": "良",
                "grade": "GI"
            },
            "distance": 2500,
            "horses": [
                {
                    "name": "テスト馬",
                    "number": 1,
                    "odds": 4.2,
                    "jockey": "武豊",
                    "weight": 486,
                    "weight_change": -2,
                    "recent_races": [
                        {
                            "date": "2025-11-30",
                            "race": "ジャパンカップ(GI)",
                            "distance": 2400,
                            "track": "東京",
                            "track_condition": "良",
                            "finish": 3,
                            "runners": 17,
                            "time_margin_pace": "2:24.1 4-4-3 3F 33.9",
                            "position_runners_pop": "3着 17頭 2番人気"
                        }
                    ]
                }
            ]
        });

        let race = parse_race_data(doc).unwrap();
        assert_eq!(race.race_info.name, "有馬記念");
        assert_eq!(race.race_info.venue, "中山");
        assert_eq!(race.distance, 2500);
        assert_eq!(race.horses.len(), 1);
        assert_eq!(race.horses[0].recent_races[0].finish, Some(3));
    }

    #[test]
    fn test_invalid_entries_are_dropped() {
        let doc = json!({
            "horses": [
                {"name": "Valid", "number": 1, "odds": 3.0},
                {"number": 2, "odds": 5.0},
                {"name": "NoOdds", "number": 3},
                {"name": "ZeroOdds", "number": 4, "odds": 0.0},
                {"name": "AlsoValid", "number": 5, "odds": 12.0}
            ]
        });

        let race = parse_race_data(doc).unwrap();
        let names: Vec<&str> = race.horses.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Valid", "AlsoValid"]);
    }

    #[test]
    fn test_missing_sections_default() {
        let race = parse_race_data(json!({})).unwrap();
        assert!(race.horses.is_empty());
        assert_eq!(race.distance, DEFAULT_DISTANCE);
        assert_eq!(race.race_info.track_condition, "良");
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        assert!(parse_race_data(json!([1, 2, 3])).is_err());
        assert!(parse_race_data(json!("race")).is_err());
    }

    #[test]
    fn test_garbled_race_info_defaults() {
        let doc = json!({
            "race_info": "不明",
            "horses": [{"name": "A", "number": 1, "odds": 2.0}]
        });

        let race = parse_race_data(doc).unwrap();
        assert!(race.race_info.name.is_empty());
        assert_eq!(race.horses.len(), 1);
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(load_race_file(Path::new("/nonexistent/race.json")).is_err());
    }
}
