// HTTP request handlers
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use centric_etl_shared::{Stage, StageSet};
use serde_json::json;
use tracing::{error, info};

use crate::server::state::AppState;

/// Trigger recorded on runs started over HTTP.
pub const API_TRIGGER: &str = "api";

/// Health check endpoint, also reports the queue depth
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "Running!",
            "queue": state.queue.status(),
        })),
    )
}

pub async fn etl_all(State(state): State<AppState>) -> impl IntoResponse {
    start_run(&state, StageSet::all())
}

pub async fn etl_extract(State(state): State<AppState>) -> impl IntoResponse {
    start_run(&state, StageSet::only(Stage::Extract))
}

pub async fn etl_transform(State(state): State<AppState>) -> impl IntoResponse {
    start_run(&state, StageSet::only(Stage::Transform))
}

pub async fn etl_load(State(state): State<AppState>) -> impl IntoResponse {
    start_run(&state, StageSet::only(Stage::Load))
}

/// Recurring job status
pub async fn jobs_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(json!(state.schedule.status())))
}

pub async fn jobs_activate(State(state): State<AppState>) -> impl IntoResponse {
    let changed = state.schedule.activate();
    (
        StatusCode::OK,
        Json(json!({
            "changed": changed,
            "schedule": state.schedule.status(),
        })),
    )
}

pub async fn jobs_deactivate(State(state): State<AppState>) -> impl IntoResponse {
    let changed = state.schedule.deactivate();
    (
        StatusCode::OK,
        Json(json!({
            "changed": changed,
            "schedule": state.schedule.status(),
        })),
    )
}

/// Queue a run; the response does not wait for it.
fn start_run(state: &AppState, stages: StageSet) -> (StatusCode, Json<serde_json::Value>) {
    match state.queue.submit(stages.clone(), API_TRIGGER) {
        Ok(()) => {
            info!(stages = %stages, "Run requested over HTTP");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "started",
                    "stages": stages,
                })),
            )
        }
        Err(e) => {
            error!(stages = %stages, error = %e, "Failed to queue run");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "error",
                    "message": e.to_string(),
                })),
            )
        }
    }
}
