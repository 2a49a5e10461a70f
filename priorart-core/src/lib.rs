//! PriorArt Core - Entity Types
//!
//! Pure data structures shared by every other crate in the workspace.
//! This crate contains data types, identifiers and the error taxonomy -
//! no pipeline logic.

pub mod entities;
pub mod enums;
pub mod error;

pub use entities::*;
pub use enums::*;
pub use error::*;

use chrono::{DateTime, Utc};
use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

pub type BundleId = Uuid;
pub type RunId = Uuid;
pub type UserId = Uuid;
pub type AssessmentId = Uuid;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Current UTC timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}
