//! Bundle REST routes: create, read, submit, approve.

use crate::error::ApiResult;
use crate::extract::CallerId;
use crate::state::AppState;
use crate::types::ApproveBundleResponse;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use priorart_core::BundleId;
use priorart_engine::NewBundle;

/// POST /api/v1/bundles
pub async fn create_bundle(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Json(request): Json<NewBundle>,
) -> ApiResult<impl IntoResponse> {
    let bundle = state.engine.create_bundle(user_id, request)?;
    Ok((StatusCode::CREATED, Json(bundle)))
}

/// GET /api/v1/bundles/:id
pub async fn get_bundle(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(bundle_id): Path<BundleId>,
) -> ApiResult<impl IntoResponse> {
    let bundle = state.engine.get_bundle(user_id, bundle_id)?;
    Ok(Json(bundle))
}

/// POST /api/v1/bundles/:id/submit
pub async fn submit_bundle(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(bundle_id): Path<BundleId>,
) -> ApiResult<impl IntoResponse> {
    let bundle = state.engine.submit_bundle(user_id, bundle_id)?;
    Ok(Json(bundle))
}

/// POST /api/v1/bundles/:id/approve
///
/// Hard validation failures come back 400 with the itemized list;
/// guardrail findings ride along as warnings on success.
pub async fn approve_bundle(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(bundle_id): Path<BundleId>,
) -> ApiResult<impl IntoResponse> {
    let (bundle, warnings) = state.engine.approve_bundle(user_id, bundle_id)?;
    Ok(Json(ApproveBundleResponse { bundle, warnings }))
}
