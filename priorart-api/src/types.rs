//! Request/response DTOs for the REST surface.
//!
//! Entity payloads reuse the `priorart-core` types directly; this
//! module only adds the thin request wrappers and envelope responses
//! the routes need.

use priorart_core::{BundleId, RunId, RunStatus, Timestamp};
use priorart_engine::GuardrailWarning;
use serde::{Deserialize, Serialize};

/// POST /api/v1/runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRunRequest {
    pub bundle_id: BundleId,
    #[serde(default)]
    pub include_scholar: bool,
}

/// 202 body for an admitted run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRunResponse {
    pub run_id: RunId,
    pub status: RunStatus,
    pub started_at: Timestamp,
}

/// 200 body for bundle approval.
#[derive(Debug, Clone, Serialize)]
pub struct ApproveBundleResponse {
    pub bundle: priorart_core::Bundle,
    pub warnings: Vec<GuardrailWarning>,
}

/// 200 body for report generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report_url: String,
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
}
