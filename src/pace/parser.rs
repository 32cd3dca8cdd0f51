//! Pace-note parsing: corner positions, closing splits, finish descriptors.
//!
//! Notes are best-effort free text like `"1:59.3 3-3-4 3F 33.8"`. Parsing
//! never fails; anything the regexes cannot pick up degrades to `None`.

use regex::Regex;

use crate::types::PastRace;

/// Number of recent starts considered for style aggregation.
pub const STYLE_WINDOW: usize = 5;

/// Averaged corner position at or below this counts as front-running.
const FRONT_POSITION_MAX: u32 = 5;

/// Parse a raw pace note into `(avg_corner_position, last_3f)`.
///
/// The corner run is a dash-separated digit sequence ("3-3-4"); its values
/// are averaged and rounded to the nearest rank. The closing split follows
/// a literal `3F`. Either side is `None` when the note does not carry it.
pub fn parse_pace_note(note: &str) -> (Option<u32>, Option<f64>) {
    if note.is_empty() {
        return (None, None);
    }

    let corner_re = Regex::new(r"(\d+(?:-\d+)+)").unwrap();
    let avg_pos = corner_re.captures(note).and_then(|caps| {
        let ranks: Vec<u32> = caps[1].split('-').filter_map(|p| p.parse().ok()).collect();
        if ranks.is_empty() {
            None
        } else {
            let mean = ranks.iter().sum::<u32>() as f64 / ranks.len() as f64;
            Some(mean.round() as u32)
        }
    });

    let split_re = Regex::new(r"3F\s+([\d.]+)").unwrap();
    let last_3f = split_re
        .captures(note)
        .and_then(|caps| caps[1].parse::<f64>().ok());

    (avg_pos, last_3f)
}

/// Extract a finish position from a result note like `"3着 13頭 9番人気"`.
pub fn parse_finish_note(note: &str) -> Option<u32> {
    let re = Regex::new(r"(\d+)着").unwrap();
    re.captures(note).and_then(|caps| caps[1].parse().ok())
}

/// Aggregated running-position features over a horse's recent starts.
///
/// Computed fresh for every evaluation call; nothing here outlives a race.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StyleFeatures {
    /// Starts run at or ahead of the front threshold.
    pub front_count: u32,
    /// Starts run behind it.
    pub close_count: u32,
    /// Mean finish position, when any result note parsed.
    pub avg_finish: Option<f64>,
    /// Mean closing split in seconds, when any pace note parsed.
    pub avg_last_3f: Option<f64>,
}

/// Tally front/close counts and averaged splits over the most recent
/// [`STYLE_WINDOW`] starts. A start whose notes fail to parse simply drops
/// out of the respective tallies.
pub fn aggregate_recent(past_races: &[PastRace]) -> StyleFeatures {
    let mut features = StyleFeatures::default();
    let mut splits = Vec::new();
    let mut finishes = Vec::new();

    for race in past_races.iter().take(STYLE_WINDOW) {
        let (corner_pos, last_3f) = parse_pace_note(&race.pace_note);

        if let Some(pos) = corner_pos {
            if pos <= FRONT_POSITION_MAX {
                features.front_count += 1;
            } else {
                features.close_count += 1;
            }
        }

        if let Some(split) = last_3f {
            splits.push(split);
        }

        if let Some(finish) = parse_finish_note(&race.result_note) {
            finishes.push(finish as f64);
        }
    }

    if !splits.is_empty() {
        features.avg_last_3f = Some(splits.iter().sum::<f64>() / splits.len() as f64);
    }
    if !finishes.is_empty() {
        features.avg_finish = Some(finishes.iter().sum::<f64>() / finishes.len() as f64);
    }

    features
}
