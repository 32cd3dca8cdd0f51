//! Ticket-plan generation under a fixed budget, plus odds helpers.
//!
//! Plans are win bets only: the favorite and rivals come from the ability
//! ranking, longshots from the value ranking minus the ability top three.
//! No expected-value guarantee is implied; these are editorial heuristics.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::config::BettingConfig;
use crate::types::{EvaluationOutcome, ScoreBreakdown};

/// One win ticket in a plan.
#[derive(Debug, Clone, Serialize)]
pub struct Ticket {
    pub horse_number: u32,
    pub horse_name: String,
    /// Stake in yen.
    pub stake: u32,
}

/// Role-tagged picks backing a plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanPicks {
    pub favorite: ScoreBreakdown,
    pub rivals: Vec<ScoreBreakdown>,
    pub longshots: Vec<ScoreBreakdown>,
}

/// Win-bet purchase plan spending the whole budget.
#[derive(Debug, Clone, Serialize)]
pub struct TicketPlan {
    pub strategy: String,
    pub tickets: Vec<Ticket>,
    pub total_stake: u32,
    pub picks: PlanPicks,
}

fn ticket(pick: &ScoreBreakdown, stake: u32) -> Ticket {
    Ticket {
        horse_number: pick.number,
        horse_name: pick.name.clone(),
        stake,
    }
}

/// Build a ticket plan from the dual ranking.
///
/// Budget tiers: under 300 yen buys the favorite alone, under 500 spreads
/// 50/30/20 over three horses, anything larger spreads 35/25/15/15/10 over
/// five. Stakes are then rescaled so the full budget is spent in bet-unit
/// increments, remainder on the last ticket.
pub fn generate_plan(outcome: &EvaluationOutcome, config: &BettingConfig) -> Result<TicketPlan> {
    let ability = &outcome.ability_results;
    let value = &outcome.value_results;

    if ability.len() < 3 {
        bail!("Need at least 3 scored horses to build a plan");
    }

    let budget = config.total_budget;
    let unit = config.bet_unit.max(1);
    if budget < unit {
        bail!("Budget {budget} is below the {unit} yen ticket minimum");
    }

    let favorite = ability[0].clone();
    let rivals: Vec<ScoreBreakdown> = ability[1..3].to_vec();

    let top_numbers: Vec<u32> = ability[..3].iter().map(|h| h.number).collect();
    let longshots: Vec<ScoreBreakdown> = value
        .iter()
        .filter(|h| !top_numbers.contains(&h.number))
        .take(2)
        .cloned()
        .collect();

    let mut tickets = if budget < 300 {
        vec![ticket(&favorite, budget)]
    } else if budget < 500 {
        let third = longshots.first().unwrap_or(&rivals[1]);
        vec![
            ticket(&favorite, budget * 50 / 100),
            ticket(&rivals[0], budget * 30 / 100),
            ticket(third, budget * 20 / 100),
        ]
    } else {
        let mut t = vec![
            ticket(&favorite, budget * 35 / 100),
            ticket(&rivals[0], budget * 25 / 100),
            ticket(&rivals[1], budget * 15 / 100),
        ];
        match longshots.len() {
            2 => {
                t.push(ticket(&longshots[0], budget * 15 / 100));
                t.push(ticket(&longshots[1], budget * 10 / 100));
            }
            1 => t.push(ticket(&longshots[0], budget * 25 / 100)),
            _ => {}
        }
        t
    };

    adjust_to_budget(&mut tickets, budget, unit);
    let total_stake = tickets.iter().map(|t| t.stake).sum();

    Ok(TicketPlan {
        strategy: format!("{}-point win", tickets.len()),
        tickets,
        total_stake,
        picks: PlanPicks {
            favorite,
            rivals,
            longshots,
        },
    })
}

/// Rescale stakes proportionally to spend the whole budget, in unit
/// increments with the remainder on the last ticket.
fn adjust_to_budget(tickets: &mut [Ticket], budget: u32, unit: u32) {
    if tickets.is_empty() {
        return;
    }

    let current: u32 = tickets.iter().map(|t| t.stake).sum();
    if current == 0 {
        let per = budget / tickets.len() as u32;
        let remainder = budget % tickets.len() as u32;
        for (i, t) in tickets.iter_mut().enumerate() {
            t.stake = per + u32::from((i as u32) < remainder);
        }
        return;
    }

    let ratio = budget as f64 / current as f64;
    let mut allocated = 0;
    let last = tickets.len() - 1;
    for (i, t) in tickets.iter_mut().enumerate() {
        if i < last {
            let scaled = ((t.stake as f64 * ratio) as u32 / unit) * unit;
            t.stake = scaled.max(unit);
        } else {
            t.stake = budget.saturating_sub(allocated).max(unit);
        }
        allocated += t.stake;
    }
}

/// Bet type for rough combined-odds estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinedBet {
    Quinella,
    Wide,
    Exacta,
}

/// Rough combined odds for a two-horse ticket from the win odds.
///
/// Divisors are house rules, not market math; real odds will differ.
pub fn estimate_combined_odds(odds1: f64, odds2: f64, bet_type: CombinedBet) -> f64 {
    let divisor = match bet_type {
        CombinedBet::Quinella => 2.5,
        CombinedBet::Wide => 5.5,
        CombinedBet::Exacta => 2.0,
    };
    ((odds1 * odds2 / divisor) * 10.0).round() / 10.0
}

/// Synthetic odds of backing several horses at once: 1 / sum(1/odds).
/// A combination under 2.0 is not worth splitting the stake and maps to 0.
pub fn synthetic_odds(odds: &[f64]) -> f64 {
    if odds.is_empty() || odds.iter().any(|&o| o <= 0.0) {
        return 0.0;
    }

    let inverse_sum: f64 = odds.iter().map(|o| 1.0 / o).sum();
    let combined = 1.0 / inverse_sum;
    if combined >= 2.0 {
        combined
    } else {
        0.0
    }
}

/// Round a stake to the nearest 100 yen, never below the ticket minimum.
pub fn round_to_hundred(amount: u32) -> u32 {
    if amount < 100 {
        return 100;
    }
    ((amount + 50) / 100) * 100
}

/// Longshot signal: a past finish read against its popularity. Beating low
/// expectations raises the score, capped at 100.
pub fn popularity_correction(score: f64, finish: u32, popularity: u32) -> f64 {
    let corrected = if popularity <= 3 && finish <= 3 {
        score + 10.0
    } else if popularity >= 8 && finish <= 3 {
        score + 20.0
    } else if popularity >= 12 && finish <= 5 {
        score + 15.0
    } else {
        score
    };
    corrected.min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breakdown(name: &str, number: u32, odds: f64, final_score: f64) -> ScoreBreakdown {
        ScoreBreakdown {
            name: name.to_string(),
            number,
            odds,
            jockey: String::new(),
            weight: None,
            weight_change: None,
            popularity: None,
            final_score,
            performance_score: 0.0,
            course_fit_score: 0.0,
            track_condition_score: 0.0,
            weight_change_score: 0.0,
            interval_score: 0.0,
            odds_value_score: 0.0,
            dark_horse_score: 0.0,
            class_penalty: 0.0,
            pace_adjustment: 1.0,
        }
    }

    fn outcome() -> EvaluationOutcome {
        EvaluationOutcome {
            ability_results: vec![
                breakdown("Favorite", 1, 2.5, 72.0),
                breakdown("RivalA", 2, 5.0, 65.0),
                breakdown("RivalB", 3, 8.0, 61.0),
                breakdown("Filler", 4, 15.0, 48.0),
            ],
            value_results: vec![
                breakdown("LongshotA", 5, 32.0, 66.0),
                breakdown("Favorite", 1, 2.5, 60.0),
                breakdown("LongshotB", 6, 41.0, 58.0),
                breakdown("RivalA", 2, 5.0, 52.0),
            ],
            pace_analysis: Default::default(),
        }
    }

    #[test]
    fn test_plan_needs_three_horses() {
        let mut small = outcome();
        small.ability_results.truncate(2);
        assert!(generate_plan(&small, &BettingConfig::default()).is_err());
    }

    #[test]
    fn test_plan_rejects_tiny_budget() {
        let config = BettingConfig {
            total_budget: 80,
            bet_unit: 100,
        };
        assert!(generate_plan(&outcome(), &config).is_err());
    }

    #[test]
    fn test_small_budget_single_ticket() {
        let config = BettingConfig {
            total_budget: 200,
            bet_unit: 100,
        };
        let plan = generate_plan(&outcome(), &config).unwrap();

        assert_eq!(plan.tickets.len(), 1);
        assert_eq!(plan.tickets[0].horse_name, "Favorite");
        assert_eq!(plan.total_stake, 200);
    }

    #[test]
    fn test_mid_budget_three_tickets() {
        let config = BettingConfig {
            total_budget: 400,
            bet_unit: 100,
        };
        let plan = generate_plan(&outcome(), &config).unwrap();

        assert_eq!(plan.tickets.len(), 3);
        assert_eq!(plan.tickets[0].horse_name, "Favorite");
        assert_eq!(plan.tickets[1].horse_name, "RivalA");
        // Third slot goes to the best longshot, not the second rival.
        assert_eq!(plan.tickets[2].horse_name, "LongshotA");
        assert_eq!(plan.total_stake, 400);
    }

    #[test]
    fn test_large_budget_five_tickets() {
        let config = BettingConfig {
            total_budget: 1000,
            bet_unit: 100,
        };
        let plan = generate_plan(&outcome(), &config).unwrap();

        assert_eq!(plan.tickets.len(), 5);
        let names: Vec<&str> = plan.tickets.iter().map(|t| t.horse_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Favorite", "RivalA", "RivalB", "LongshotA", "LongshotB"]
        );
        assert_eq!(plan.total_stake, 1000);
        // 35/25/15/15/10 splits land exactly on the unit at this budget.
        let stakes: Vec<u32> = plan.tickets.iter().map(|t| t.stake).collect();
        assert_eq!(stakes, vec![300, 200, 100, 100, 300]);
    }

    #[test]
    fn test_longshots_exclude_ability_top_three() {
        let config = BettingConfig {
            total_budget: 1000,
            bet_unit: 100,
        };
        let plan = generate_plan(&outcome(), &config).unwrap();

        let longshot_numbers: Vec<u32> =
            plan.picks.longshots.iter().map(|h| h.number).collect();
        assert_eq!(longshot_numbers, vec![5, 6]);
    }

    #[test]
    fn test_budget_fully_spent() {
        for budget in [300, 450, 500, 777, 2000] {
            let config = BettingConfig {
                total_budget: budget,
                bet_unit: 100,
            };
            let plan = generate_plan(&outcome(), &config).unwrap();
            let sum: u32 = plan.tickets.iter().map(|t| t.stake).sum();
            // The proportional adjustment spends the budget, modulo the
            // minimum-ticket floor on the last slot.
            assert!(sum >= budget);
            assert_eq!(sum, plan.total_stake);
        }
    }

    #[test]
    fn test_estimate_combined_odds() {
        let q = estimate_combined_odds(4.0, 10.0, CombinedBet::Quinella);
        assert!((q - 16.0).abs() < 1e-9);
        let w = estimate_combined_odds(4.0, 11.0, CombinedBet::Wide);
        assert!((w - 8.0).abs() < 1e-9);
        let e = estimate_combined_odds(4.0, 10.0, CombinedBet::Exacta);
        assert!((e - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_synthetic_odds() {
        // 1 / (1/4 + 1/12) = 3.0
        let combined = synthetic_odds(&[4.0, 12.0]);
        assert!((combined - 3.0).abs() < 1e-9);

        // Below the 2.0 floor maps to zero.
        assert_eq!(synthetic_odds(&[2.0, 3.0]), 0.0);
        assert_eq!(synthetic_odds(&[]), 0.0);
        assert_eq!(synthetic_odds(&[4.0, 0.0]), 0.0);
    }

    #[test]
    fn test_round_to_hundred() {
        assert_eq!(round_to_hundred(40), 100);
        assert_eq!(round_to_hundred(149), 100);
        assert_eq!(round_to_hundred(150), 200);
        assert_eq!(round_to_hundred(1000), 1000);
    }

    #[test]
    fn test_popularity_correction() {
        // Popular horse placing: mild bump.
        assert_eq!(popularity_correction(60.0, 2, 1), 70.0);
        // Unpopular horse placing: the longshot signal.
        assert_eq!(popularity_correction(60.0, 3, 9), 80.0);
        // Deep longshot hitting the board.
        assert_eq!(popularity_correction(60.0, 5, 14), 75.0);
        // Nothing notable.
        assert_eq!(popularity_correction(60.0, 9, 5), 60.0);
        // Capped at 100.
        assert_eq!(popularity_correction(95.0, 1, 10), 100.0);
    }
}
