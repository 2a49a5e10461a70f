//! Error types for the PriorArt API
//!
//! `ApiError` is the structured JSON error every endpoint returns, and
//! `ErrorCode` categorizes it onto an HTTP status. The `From` impl off
//! `EngineError` is the single place the engine taxonomy is mapped to
//! the wire; internal detail is logged, never leaked.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use priorart_core::{EngineError, PersistenceError, StateError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses. Each maps to one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request lacks a valid caller identity
    Unauthorized,

    /// Bundle failed hard validation
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Operation requested against an entity in the wrong state
    StateConflict,

    /// User has no remaining run credit
    CreditExhausted,

    /// Requested entity does not exist (or is not visible to the caller)
    EntityNotFound,

    /// Report not available: the assessment has no terminal determination
    ReportNotAvailable,

    /// An upstream provider call failed
    ProviderError,

    /// No provider is currently able to serve the capability
    ProviderUnavailable,

    /// Internal server error
    InternalError,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::ValidationFailed | ErrorCode::InvalidInput | ErrorCode::StateConflict => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::CreditExhausted => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ReportNotAvailable => StatusCode::GONE,
            ErrorCode::ProviderError => StatusCode::BAD_GATEWAY,
            ErrorCode::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    /// Itemized detail, e.g. per-field validation errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), details: None }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EntityNotFound, message)
    }

    pub fn internal() -> Self {
        Self::new(ErrorCode::InternalError, "Internal server error")
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status_code(), Json(self)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(failure) => {
                let details = serde_json::json!({
                    "errors": failure.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>()
                });
                ApiError::new(ErrorCode::ValidationFailed, "Bundle validation failed")
                    .with_details(details)
            }
            EngineError::Admission(refusal) => {
                ApiError::new(ErrorCode::CreditExhausted, refusal.to_string())
            }
            EngineError::State(state) => {
                let code = match state {
                    StateError::ReportNotAvailable { .. } => ErrorCode::ReportNotAvailable,
                    _ => ErrorCode::StateConflict,
                };
                ApiError::new(code, state.to_string())
            }
            EngineError::Persistence(PersistenceError::NotFound { entity, id }) => {
                ApiError::not_found(format!("{entity} not found: {id}"))
            }
            EngineError::Provider(provider) => {
                let code = match provider {
                    priorart_core::ProviderError::NoHealthyProvider { .. } => {
                        ErrorCode::ProviderUnavailable
                    }
                    _ => ErrorCode::ProviderError,
                };
                error!(error = %provider, "provider error surfaced to API");
                ApiError::new(code, "Upstream provider request failed")
            }
            EngineError::Persistence(other) => {
                error!(error = %other, "persistence error surfaced to API");
                ApiError::internal()
            }
            EngineError::Internal { message } => {
                error!(error = %message, "internal error surfaced to API");
                ApiError::internal()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use priorart_core::{AdmissionError, ValidationError, ValidationFailure};

    #[test]
    fn credit_exhaustion_maps_to_402() {
        let err: ApiError = EngineError::from(AdmissionError::InsufficientCredit {
            user_id: priorart_core::new_entity_id(),
            total: 5,
            used: 5,
        })
        .into();
        assert_eq!(err.code, ErrorCode::CreditExhausted);
        assert_eq!(err.code.status_code(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn validation_failure_carries_itemized_details() {
        let err: ApiError = EngineError::from(ValidationFailure {
            errors: vec![ValidationError::RequiredFieldMissing {
                field: "source_summary.title".to_string(),
            }],
        })
        .into();
        assert_eq!(err.code.status_code(), StatusCode::BAD_REQUEST);
        let details = err.details.expect("itemized");
        assert_eq!(details["errors"].as_array().map(|a| a.len()), Some(1));
    }

    #[test]
    fn report_gate_maps_to_410() {
        let err: ApiError = EngineError::from(StateError::ReportNotAvailable {
            assessment_id: priorart_core::new_entity_id(),
            status: priorart_core::AssessmentStatus::Doubt,
        })
        .into();
        assert_eq!(err.code.status_code(), StatusCode::GONE);
    }

    #[test]
    fn not_found_never_leaks_ownership() {
        let err: ApiError = EngineError::from(PersistenceError::NotFound {
            entity: "Run",
            id: "abc".to_string(),
        })
        .into();
        assert_eq!(err.code.status_code(), StatusCode::NOT_FOUND);
    }
}
