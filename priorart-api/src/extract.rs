//! Caller identity extraction
//!
//! Session issuance lives upstream; the gateway forwards the
//! authenticated user as an `X-User-Id` header. Every route takes the
//! caller through this extractor, and ownership checks downstream make
//! other users' entities read as absent.

use crate::error::{ApiError, ErrorCode};
use axum::{extract::FromRequestParts, http::request::Parts};
use priorart_core::UserId;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller, extracted from the gateway-injected header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub UserId);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                ApiError::new(ErrorCode::Unauthorized, "Missing X-User-Id header")
            })?;

        let user_id = Uuid::parse_str(raw).map_err(|_| {
            ApiError::new(ErrorCode::Unauthorized, "X-User-Id is not a valid UUID")
        })?;

        Ok(CallerId(user_id))
    }
}
