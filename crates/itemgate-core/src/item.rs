use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A durably saved item.
///
/// The id is assigned by the backend and is opaque to callers; the content
/// is the deduplication identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// How a save attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveStatus {
    /// The item was persisted and assigned an id.
    Saved,
    /// An item with this content already exists in the backend.
    DuplicatePersisted,
    /// Another caller currently holds the lock for this content.
    DuplicateInFlight,
    /// The backend failed while persisting.
    PersistenceFailed,
    /// The shared lock store could not be reached.
    LockUnavailable,
}

/// Outcome of a single `save_item` call, produced exactly once and never
/// mutated. All failure modes are folded into this value; no error escapes
/// the service boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub succeeded: bool,
    pub status: SaveStatus,
    pub message: String,
}

impl SaveOutcome {
    pub fn saved(item: &Item) -> Self {
        Self {
            succeeded: true,
            status: SaveStatus::Saved,
            message: format!("saved with id {}", item.id),
        }
    }

    pub fn duplicate_persisted() -> Self {
        Self {
            succeeded: false,
            status: SaveStatus::DuplicatePersisted,
            message: "duplicate: already persisted".to_string(),
        }
    }

    pub fn duplicate_in_flight() -> Self {
        Self {
            succeeded: false,
            status: SaveStatus::DuplicateInFlight,
            message: "duplicate: currently being processed".to_string(),
        }
    }

    pub fn persistence_failed(err: &StoreError) -> Self {
        Self {
            succeeded: false,
            status: SaveStatus::PersistenceFailed,
            message: format!("save failed: {err}"),
        }
    }

    pub fn lock_unavailable(err: &StoreError) -> Self {
        Self {
            succeeded: false,
            status: SaveStatus::LockUnavailable,
            message: format!("lock store unavailable: {err}"),
        }
    }
}
