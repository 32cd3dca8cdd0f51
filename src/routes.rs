//! API route handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::betting::{generate_plan, TicketPlan};
use crate::config::AppConfig;
use crate::evaluator::HorseScoreEvaluator;
use crate::loader::parse_race_data;
use crate::types::{ErrorResponse, EvaluationOutcome, HealthResponse};

/// Application state shared across handlers.
pub struct AppState {
    pub evaluator: HorseScoreEvaluator,
    pub config: AppConfig,
}

/// Error type for API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.status.to_string(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Evaluation response: dual ranking, pace analysis, optional ticket plan.
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub race: String,
    #[serde(flatten)]
    pub outcome: EvaluationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_plan: Option<TicketPlan>,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Evaluation endpoint.
///
/// Accepts a raw race-data document; structurally invalid horse entries
/// are dropped rather than rejecting the request, and a field too small
/// for a ticket plan still returns its rankings.
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let race = parse_race_data(payload).map_err(|e| ApiError::bad_request(e.to_string()))?;

    tracing::debug!(
        "Evaluating race '{}' with {} horses",
        race.race_info.name,
        race.horses.len()
    );

    let outcome = state.evaluator.evaluate_horses(&race);
    let ticket_plan = generate_plan(&outcome, &state.config.betting).ok();

    Ok(Json(EvaluateResponse {
        race: race.race_info.name,
        outcome,
        ticket_plan,
    }))
}
