//! Console and Markdown rendering of evaluation results.

use std::fmt::Write;

use crate::betting::{
    estimate_combined_odds, popularity_correction, synthetic_odds, CombinedBet, TicketPlan,
};
use crate::config::ReferenceData;
use crate::types::{EvaluationOutcome, RaceData, ScoreBreakdown};

/// Letter grade for a final score.
fn grade(score: f64) -> &'static str {
    if score >= 90.0 {
        "S"
    } else if score >= 80.0 {
        "A"
    } else if score >= 70.0 {
        "B"
    } else if score >= 60.0 {
        "C"
    } else if score >= 50.0 {
        "D"
    } else {
        "E"
    }
}

/// Tier of a jockey in the curated top list: 1 for the first three names,
/// 2 for the next five, 3 for the rest of the list.
fn jockey_tier(jockey: &str, reference: &ReferenceData) -> Option<u8> {
    if jockey.is_empty() {
        return None;
    }
    let position = reference
        .top_jockeys
        .iter()
        .position(|top| jockey.contains(top.as_str()))?;
    Some(match position {
        0..=2 => 1,
        3..=7 => 2,
        _ => 3,
    })
}

/// Aptitude tags from the pedigree lists, given the race conditions.
fn pedigree_tags(race: &RaceData, pedigree: &str, reference: &ReferenceData) -> Vec<&'static str> {
    let mut tags = Vec::new();
    if pedigree.is_empty() {
        return tags;
    }

    if race.distance <= 1400 && reference.sprint_sires.iter().any(|s| s == pedigree) {
        tags.push("sprint pedigree");
    }
    if matches!(race.race_info.track_condition.as_str(), "稍重" | "重" | "不良")
        && reference.mud_sires.iter().any(|s| s == pedigree)
    {
        tags.push("mud pedigree");
    }
    if reference.turf_sires.iter().any(|s| s == pedigree) {
        tags.push("proven turf line");
    }
    tags
}

fn header_line(race: &RaceData) -> String {
    format!(
        "{} ({} {}m, {}{})",
        race.race_info.name,
        race.race_info.venue,
        race.distance,
        race.race_info.track_condition,
        if race.race_info.grade.is_empty() {
            String::new()
        } else {
            format!(", {}", race.race_info.grade)
        }
    )
}

fn ranking_row(rank: usize, r: &ScoreBreakdown) -> String {
    format!(
        "  {:2}. [{}] #{:<2} {:<12} odds {:>6.1}  final {:>6.2}  (past {:>5.1} / course {:>5.1} / odds-val {:>5.1} / dark {:>5.1})",
        rank,
        grade(r.final_score),
        r.number,
        r.name,
        r.odds,
        r.final_score,
        r.performance_score,
        r.course_fit_score,
        r.odds_value_score,
        r.dark_horse_score,
    )
}

/// Render the dual ranking and plan as a console table.
pub fn render_table(race: &RaceData, outcome: &EvaluationOutcome, plan: Option<&TicketPlan>) -> String {
    let mut out = String::new();

    writeln!(out, "Race: {}", header_line(race)).ok();
    writeln!(
        out,
        "Pace forecast: {} (front {:.3} / close {:.3})",
        outcome.pace_analysis.pace,
        outcome.pace_analysis.metadata.front_top_sum,
        outcome.pace_analysis.metadata.close_top_sum,
    )
    .ok();
    writeln!(out).ok();

    writeln!(out, "=== Ability ranking ===").ok();
    for (i, r) in outcome.ability_results.iter().take(10).enumerate() {
        writeln!(out, "{}", ranking_row(i + 1, r)).ok();
    }
    writeln!(out).ok();

    writeln!(out, "=== Value ranking ===").ok();
    for (i, r) in outcome.value_results.iter().take(5).enumerate() {
        writeln!(out, "{}", ranking_row(i + 1, r)).ok();
    }
    writeln!(out).ok();

    if let Some(plan) = plan {
        writeln!(out, "=== Ticket plan ({}) ===", plan.strategy).ok();
        for (i, t) in plan.tickets.iter().enumerate() {
            writeln!(
                out,
                "  {}. win #{:<2} {:<12} {:>6} yen",
                i + 1,
                t.horse_number,
                t.horse_name,
                t.stake
            )
            .ok();
        }
        writeln!(out, "  Total: {} yen", plan.total_stake).ok();
    }

    out
}

/// Render a Markdown report for note-keeping, with reference-data tags as
/// commentary on the picks.
pub fn render_markdown(
    race: &RaceData,
    outcome: &EvaluationOutcome,
    plan: Option<&TicketPlan>,
    reference: &ReferenceData,
) -> String {
    let mut out = String::new();

    writeln!(out, "# {}", header_line(race)).ok();
    writeln!(out).ok();
    writeln!(
        out,
        "**Pace forecast:** {} (front top-sum {:.3}, close top-sum {:.3})",
        outcome.pace_analysis.pace,
        outcome.pace_analysis.metadata.front_top_sum,
        outcome.pace_analysis.metadata.close_top_sum,
    )
    .ok();
    writeln!(out).ok();

    writeln!(out, "## Ability ranking").ok();
    writeln!(out).ok();
    writeln!(out, "| # | No | Horse | Odds | Final | Grade | Past | Course | Track | Dark |").ok();
    writeln!(out, "|---|----|-------|------|-------|-------|------|--------|-------|------|").ok();
    for (i, r) in outcome.ability_results.iter().take(10).enumerate() {
        writeln!(
            out,
            "| {} | {} | {} | {:.1} | {:.2} | {} | {:.1} | {:.1} | {:.1} | {:.1} |",
            i + 1,
            r.number,
            r.name,
            r.odds,
            r.final_score,
            grade(r.final_score),
            r.performance_score,
            r.course_fit_score,
            r.track_condition_score,
            r.dark_horse_score,
        )
        .ok();
    }
    writeln!(out).ok();

    writeln!(out, "## Value ranking").ok();
    writeln!(out).ok();
    for (i, r) in outcome.value_results.iter().take(5).enumerate() {
        writeln!(
            out,
            "{}. #{} {}: odds {:.1}, value score {:.2}",
            i + 1,
            r.number,
            r.name,
            r.odds,
            r.final_score,
        )
        .ok();
    }
    writeln!(out).ok();

    // Commentary from the curated reference lists.
    let mut notes = Vec::new();
    for r in outcome.ability_results.iter().take(3) {
        if let Some(tier) = jockey_tier(&r.jockey, reference) {
            notes.push(format!("#{} {}: tier-{} jockey ({})", r.number, r.name, tier, r.jockey));
        }
        if let Some(entry) = race.horses.iter().find(|h| h.number == r.number) {
            if let Some(pedigree) = entry.pedigree.as_deref() {
                for tag in pedigree_tags(race, pedigree, reference) {
                    notes.push(format!("#{} {}: {} ({})", r.number, r.name, tag, pedigree));
                }
            }
        }
    }
    if let Some(plan) = plan {
        for pick in &plan.picks.longshots {
            let last_finish = race
                .horses
                .iter()
                .find(|h| h.number == pick.number)
                .and_then(|h| h.recent_races.first())
                .and_then(|r| r.finish);
            if let (Some(finish), Some(popularity)) = (last_finish, pick.popularity) {
                let corrected = popularity_correction(pick.final_score, finish, popularity);
                if corrected > pick.final_score {
                    notes.push(format!(
                        "#{} {}: beat its popularity last start, longshot signal",
                        pick.number, pick.name
                    ));
                }
            }
        }
    }
    if !notes.is_empty() {
        writeln!(out, "## Notes").ok();
        writeln!(out).ok();
        for note in notes {
            writeln!(out, "- {}", note).ok();
        }
        writeln!(out).ok();
    }

    if let Some(plan) = plan {
        writeln!(out, "## Ticket plan ({})", plan.strategy).ok();
        writeln!(out).ok();
        for (i, t) in plan.tickets.iter().enumerate() {
            writeln!(out, "{}. Win #{} {}: {} yen", i + 1, t.horse_number, t.horse_name, t.stake).ok();
        }
        writeln!(out).ok();
        writeln!(out, "Total stake: {} yen", plan.total_stake).ok();

        // Rough combination prices for the top two, advisory only.
        if let Some(rival) = plan.picks.rivals.first() {
            let quinella = estimate_combined_odds(
                plan.picks.favorite.odds,
                rival.odds,
                CombinedBet::Quinella,
            );
            let wide =
                estimate_combined_odds(plan.picks.favorite.odds, rival.odds, CombinedBet::Wide);
            let exacta =
                estimate_combined_odds(plan.picks.favorite.odds, rival.odds, CombinedBet::Exacta);
            writeln!(out).ok();
            writeln!(
                out,
                "Estimated quinella #{}-#{}: ~{:.1}x, wide ~{:.1}x, exacta ~{:.1}x",
                plan.picks.favorite.number, rival.number, quinella, wide, exacta
            )
            .ok();
        }

        // Synthetic price of the whole ticket spread; 0 means the spread
        // is too short to be worth splitting.
        let ticket_odds: Vec<f64> = plan
            .tickets
            .iter()
            .filter_map(|t| {
                race.horses
                    .iter()
                    .find(|h| h.number == t.horse_number)
                    .map(|h| h.odds)
            })
            .collect();
        let combined = synthetic_odds(&ticket_odds);
        if combined > 0.0 {
            writeln!(out, "Synthetic odds across all tickets: ~{:.1}x", combined).ok();
        }
    }

    out
}
