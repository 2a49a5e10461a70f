//! PriorArt API - REST surface over the engine
//!
//! Thin `axum` layer: extract the caller, call the engine, map the
//! error taxonomy onto HTTP statuses. All pipeline behavior lives in
//! `priorart-engine`.

pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;
pub use state::AppState;
