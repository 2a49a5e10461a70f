//! Novelty assessment REST routes.

use crate::error::ApiResult;
use crate::extract::CallerId;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use priorart_core::RunId;
use priorart_engine::{report, AssessmentView};

/// POST /api/v1/runs/:id/assessment
///
/// Runs the two-stage protocol to completion before responding; the
/// LLM gateway is the latency here, not the pipeline. 400 unless the
/// run completed.
pub async fn start_assessment(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(run_id): Path<RunId>,
) -> ApiResult<impl IntoResponse> {
    let assessment = state.engine.start_assessment(user_id, run_id).await?;
    let view = AssessmentView { report_url: report::report_url_for(&assessment), assessment };
    Ok((StatusCode::CREATED, Json(view)))
}
