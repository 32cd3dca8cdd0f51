//! CLI commands for keiba-handicap.
//!
//! Supports API server mode and file-based prediction mode.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::betting::{generate_plan, round_to_hundred};
use crate::config::AppConfig;
use crate::evaluator::HorseScoreEvaluator;
use crate::loader::load_race_file;
use crate::report;
use crate::storage::DarkHorseStore;

#[derive(Parser)]
#[command(name = "keiba-handicap")]
#[command(
    version,
    about = "Heuristic horse-race handicapping: scoring, pace analysis, ticket plans",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },

    /// Score a race JSON file and print rankings and a ticket plan
    Predict {
        /// Path to race data JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output format (json, table, markdown)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Betting budget override (yen)
        #[arg(short, long)]
        budget: Option<u32>,

        /// Dark-horse database override
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

/// Run file-based prediction.
pub fn run_predict(
    input: PathBuf,
    format: String,
    budget: Option<u32>,
    db: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(b) = budget {
        // Tickets are sold in 100 yen steps; snap the override to the grid.
        config.betting.total_budget = round_to_hundred(b);
    }
    if let Some(path) = db {
        config.store.dark_horse_db = path.to_string_lossy().to_string();
    }

    let store = Arc::new(DarkHorseStore::open(std::path::Path::new(
        &config.store.dark_horse_db,
    )));
    eprintln!("Dark-horse store: {} entries", store.len());

    let race = load_race_file(&input)?;
    eprintln!("Processing race: {}", race.race_info.name);
    eprintln!("Horses: {}", race.horses.len());

    let evaluator =
        HorseScoreEvaluator::new(store, config.pace.clone(), config.profiles.clone());
    let outcome = evaluator.evaluate_horses(&race);

    let plan = match generate_plan(&outcome, &config.betting) {
        Ok(plan) => Some(plan),
        Err(e) => {
            eprintln!("No ticket plan: {e}");
            None
        }
    };

    match format.as_str() {
        "json" => {
            let doc = serde_json::json!({
                "race": race.race_info.name,
                "ability_results": outcome.ability_results,
                "value_results": outcome.value_results,
                "pace_analysis": outcome.pace_analysis,
                "ticket_plan": plan,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        "markdown" => {
            println!(
                "{}",
                report::render_markdown(&race, &outcome, plan.as_ref(), &config.reference)
            );
        }
        "table" => {
            println!("{}", report::render_table(&race, &outcome, plan.as_ref()));
        }
        other => {
            eprintln!("Unknown format: {}. Using table.", other);
            println!("{}", report::render_table(&race, &outcome, plan.as_ref()));
        }
    }

    Ok(())
}
