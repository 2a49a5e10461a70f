//! Error taxonomy for PriorArt operations

use crate::{AssessmentStatus, BundleStatus, RunStatus};
use thiserror::Error;
use uuid::Uuid;

/// Convenience alias used across the workspace.
pub type EngineResult<T> = Result<T, EngineError>;

/// Bundle validation errors. Itemized per field; never retried
/// automatically.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Query for variant '{label}' exceeds {max} characters ({actual})")]
    QueryTooLong { label: String, max: usize, actual: usize },

    #[error("Bundle must carry exactly 3 variants labeled broad/baseline/narrow: {reason}")]
    BadVariantSet { reason: String },

    #[error("Sensitive tokens present: {tokens:?}")]
    SensitiveTokens { tokens: Vec<String> },
}

/// Atomic validation failure carrying every itemized error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Bundle validation failed: {}", errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
pub struct ValidationFailure {
    pub errors: Vec<ValidationError>,
}

/// External provider errors (search or LLM).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed { provider: String, status: u16, message: String },

    #[error("Rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("Request to {provider} timed out")]
    Timeout { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Invalid API key for {provider}")]
    InvalidApiKey { provider: String },

    #[error("No healthy provider available for {capability}")]
    NoHealthyProvider { capability: String },
}

impl ProviderError {
    /// Whether a retry with identical parameters can reasonably succeed.
    pub fn transient(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. } | ProviderError::Timeout { .. } => true,
            ProviderError::RequestFailed { status, .. } => *status >= 500,
            ProviderError::InvalidResponse { .. }
            | ProviderError::InvalidApiKey { .. }
            | ProviderError::NoHealthyProvider { .. } => false,
        }
    }
}

/// Admission control errors. Surfaced before any provider call; the
/// refused run is recorded in the credit-exhausted terminal state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("Insufficient credit for user {user_id}: used {used} of {total}")]
    InsufficientCredit { user_id: Uuid, total: u32, used: u32 },
}

/// Operation requested against a run/assessment/bundle not in the
/// required state. Surfaced, never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Run {run_id} is {status:?}; an assessment requires a completed run")]
    RunNotCompleted { run_id: Uuid, status: RunStatus },

    #[error("Bundle {bundle_id} is {status:?}; execution requires an approved bundle")]
    BundleNotApproved { bundle_id: Uuid, status: BundleStatus },

    #[error("Assessment {assessment_id} is {status:?}; report generation requires a terminal determination")]
    ReportNotAvailable { assessment_id: Uuid, status: AssessmentStatus },

    #[error("Run {run_id} already has an assessment attached")]
    AssessmentAlreadyAttached { run_id: Uuid },
}

/// Persistence errors. Fatal to the current step; already-completed
/// steps are not rolled back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Storage backend error: {reason}")]
    Backend { reason: String },
}

/// Top-level error wrapping the taxonomy.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}
