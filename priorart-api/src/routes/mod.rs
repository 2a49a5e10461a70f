//! REST route handlers and router assembly.

pub mod assessment;
pub mod bundle;
pub mod health;
pub mod run;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/v1/bundles", post(bundle::create_bundle))
        .route("/api/v1/bundles/:id", get(bundle::get_bundle))
        .route("/api/v1/bundles/:id/submit", post(bundle::submit_bundle))
        .route("/api/v1/bundles/:id/approve", post(bundle::approve_bundle))
        .route("/api/v1/runs", post(run::start_run).get(run::list_runs))
        .route("/api/v1/runs/:id", get(run::run_status))
        .route("/api/v1/runs/:id/assessment", post(assessment::start_assessment))
        .route("/api/v1/runs/:id/report", get(run::generate_report))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
