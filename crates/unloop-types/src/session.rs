//! Session record types for Unloop.
//!
//! A `SessionRecord` is the persisted unit: created when the first model
//! reply arrives, upgraded in place as the snapshot, mentor, and booking
//! become available. The persisted collection has no schema versioning, so
//! every optional field carries `#[serde(default)]` -- older blobs must
//! keep decoding after fields are added.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mentor::Mentor;
use crate::snapshot::LifeSnapshot;
use crate::turn::ConversationTurn;

/// The persisted state of one reflection session.
///
/// Invariants enforced by the store on every mutation:
/// - `booked_time` requires `selected_mentor`;
/// - a `snapshot` requires non-empty `history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Defaults to the snapshot's primary theme the first time a snapshot
    /// is produced; user renames are never overwritten afterwards.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    #[serde(default)]
    pub snapshot: Option<LifeSnapshot>,
    #[serde(default)]
    pub selected_mentor: Option<Mentor>,
    #[serde(default)]
    pub booked_time: Option<String>,
    #[serde(default)]
    pub consent_given: bool,
    #[serde(default)]
    pub user_mood: Option<String>,
    #[serde(default)]
    pub user_priority: Option<String>,
    #[serde(default)]
    pub user_notes: Option<String>,
}

impl SessionRecord {
    /// Create an empty record for a freshly minted session id.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            label: None,
            history: Vec::new(),
            snapshot: None,
            selected_mentor: None,
            booked_time: None,
            consent_given: false,
            user_mood: None,
            user_priority: None,
            user_notes: None,
        }
    }
}

/// Partial fields merged into an existing record by `SessionStore::patch`.
///
/// `None` means "leave the field alone" -- there is no way to clear a field
/// through a patch, matching the upgrade-only lifecycle of a record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionPatch {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub selected_mentor: Option<Mentor>,
    #[serde(default)]
    pub booked_time: Option<String>,
}

impl SessionPatch {
    /// A patch that only renames the record.
    pub fn rename(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// A patch that books a time slot.
    pub fn booking(time: impl Into<String>) -> Self {
        Self {
            booked_time: Some(time.into()),
            ..Self::default()
        }
    }

    /// Apply this patch to a record, merging only the set fields.
    pub fn apply_to(&self, record: &mut SessionRecord) {
        if let Some(label) = &self.label {
            record.label = Some(label.clone());
        }
        if let Some(mentor) = &self.selected_mentor {
            record.selected_mentor = Some(mentor.clone());
        }
        if let Some(time) = &self.booked_time {
            record.booked_time = Some(time.clone());
        }
    }
}
