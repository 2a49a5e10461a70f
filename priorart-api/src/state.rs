//! Shared application state for the Axum router.

use priorart_engine::PriorArtEngine;
use std::sync::Arc;

/// Application-wide state shared across all routes. The engine carries
/// every injected collaborator; the API layer adds nothing stateful of
/// its own.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PriorArtEngine>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(engine: Arc<PriorArtEngine>) -> Self {
        Self { engine, start_time: std::time::Instant::now() }
    }
}
