//! Run REST routes: start, poll, list, report.

use crate::error::ApiResult;
use crate::extract::CallerId;
use crate::state::AppState;
use crate::types::{ReportResponse, StartRunRequest, StartRunResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use priorart_core::RunId;

/// POST /api/v1/runs
///
/// Admits and starts a run. 202: the pipeline continues detached and
/// the caller polls. 402 when the credit gate refuses.
pub async fn start_run(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Json(request): Json<StartRunRequest>,
) -> ApiResult<impl IntoResponse> {
    let run = state.engine.start_run(user_id, request.bundle_id, request.include_scholar)?;
    let response =
        StartRunResponse { run_id: run.run_id, status: run.status, started_at: run.started_at };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /api/v1/runs
pub async fn list_runs(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
) -> ApiResult<impl IntoResponse> {
    let runs = state.engine.list_runs(user_id)?;
    Ok(Json(runs))
}

/// GET /api/v1/runs/:id
pub async fn run_status(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(run_id): Path<RunId>,
) -> ApiResult<impl IntoResponse> {
    let payload = state.engine.run_status(user_id, run_id)?;
    Ok(Json(payload))
}

/// GET /api/v1/runs/:id/report
///
/// 410 until the run's assessment reaches a terminal determination.
pub async fn generate_report(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(run_id): Path<RunId>,
) -> ApiResult<impl IntoResponse> {
    let report_url = state.engine.generate_report(user_id, run_id).await?;
    Ok(Json(ReportResponse { report_url }))
}
