//! Health endpoint.

use crate::state::AppState;
use crate::types::HealthResponse;
use axum::{extract::State, Json};

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", uptime_secs: state.start_time.elapsed().as_secs() })
}
