//! Keiba-Handicap
//!
//! REST API and CLI for heuristic horse-race handicapping: weighted
//! ability/value scoring with a pace-interaction adjustment and
//! betting-ticket suggestions under a fixed budget.

mod betting;
mod cli;
mod config;
mod evaluator;
mod loader;
mod pace;
mod report;
mod routes;
mod storage;
mod types;

use axum::{routing::get, routing::post, Router};
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::evaluator::HorseScoreEvaluator;
use crate::routes::AppState;
use crate::storage::DarkHorseStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => run_server(Some(host), Some(port)).await,
        Commands::Predict {
            input,
            format,
            budget,
            db,
        } => cli::run_predict(input, format, budget, db),
    }
}

/// Run the API server.
async fn run_server(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keiba_handicap=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = AppConfig::load()?;

    // Override with CLI args
    if let Some(h) = host {
        config.server.host = h;
    }
    if let Some(p) = port {
        config.server.port = p;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("Dark-horse store: {}", config.store.dark_horse_db);

    // Load the dark-horse store up front; scoring never touches the disk.
    let store = Arc::new(DarkHorseStore::open(Path::new(&config.store.dark_horse_db)));
    if store.is_empty() {
        tracing::warn!("Dark-horse store is empty; odds-bucket fallback only");
    } else {
        tracing::info!("Dark-horse store loaded: {} entries", store.len());
    }

    let evaluator =
        HorseScoreEvaluator::new(store, config.pace.clone(), config.profiles.clone());

    // Create application state
    let state = Arc::new(AppState {
        evaluator,
        config: config.clone(),
    });

    // Build router
    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/evaluate", post(routes::evaluate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
