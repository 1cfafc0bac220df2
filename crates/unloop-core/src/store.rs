//! Session store trait and the in-memory implementation.
//!
//! The store holds the full collection of session records. `load` returns
//! them most-recent-first; `upsert` inserts or replaces whole records;
//! `patch` merges partial fields into an existing record. The JSON-file
//! implementation lives in unloop-infra; the in-memory one here backs
//! tests and ephemeral runs.

use std::sync::Mutex;

use uuid::Uuid;

use unloop_types::error::StoreError;
use unloop_types::session::{SessionPatch, SessionRecord};

/// Trait for session persistence backends.
pub trait SessionStore: Send + Sync {
    /// Load every record, most recently created first.
    fn load(&self) -> impl Future<Output = Result<Vec<SessionRecord>, StoreError>> + Send;

    /// Insert the record, or replace the existing record with the same id.
    ///
    /// Replacement keeps the record's position in the collection; a
    /// record does not become "newest" by being updated.
    fn upsert(&self, record: &SessionRecord) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Merge the patch into the record with the given id.
    ///
    /// Patching an id that is not in the store is a no-op, not an error:
    /// the flow may try to persist a rename before the record's first
    /// upsert has happened.
    fn patch(
        &self,
        id: Uuid,
        patch: &SessionPatch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Reject records that violate the cross-field invariants.
///
/// Shared by every backend so a malformed record can never be persisted
/// regardless of which implementation is wired in.
pub fn validate_record(record: &SessionRecord) -> Result<(), StoreError> {
    if record.booked_time.is_some() && record.selected_mentor.is_none() {
        return Err(StoreError::Conflict(
            "booked_time requires a selected mentor".to_string(),
        ));
    }
    if record.snapshot.is_some() && record.history.is_empty() {
        return Err(StoreError::Conflict(
            "a snapshot requires a non-empty history".to_string(),
        ));
    }
    Ok(())
}

/// In-memory store. Records live in insertion order; `load` sorts by
/// creation time on the way out.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    records: Mutex<Vec<SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store, mainly for tests.
    pub fn with_records(records: Vec<SessionRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    async fn load(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let records = self.records.lock().expect("store mutex poisoned");
        let mut out = records.clone();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn upsert(&self, record: &SessionRecord) -> Result<(), StoreError> {
        validate_record(record)?;
        let mut records = self.records.lock().expect("store mutex poisoned");
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn patch(&self, id: Uuid, patch: &SessionPatch) -> Result<(), StoreError> {
        let mut records = self.records.lock().expect("store mutex poisoned");
        let Some(existing) = records.iter_mut().find(|r| r.id == id) else {
            tracing::debug!(session_id = %id, "Patch for unknown session id ignored");
            return Ok(());
        };
        let mut updated = existing.clone();
        patch.apply_to(&mut updated);
        validate_record(&updated)?;
        *existing = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use unloop_types::mentor::{Mentor, MentorType};
    use unloop_types::turn::{ConversationTurn, TurnRole};

    fn record_created_at(offset_minutes: i64) -> SessionRecord {
        let mut record = SessionRecord::new(Uuid::now_v7());
        record.created_at = Utc::now() + Duration::minutes(offset_minutes);
        record
            .history
            .push(ConversationTurn::new(TurnRole::User, "hello"));
        record
    }

    fn mentor() -> Mentor {
        Mentor {
            id: "listener-1".to_string(),
            name: "Maya Chen".to_string(),
            mentor_type: MentorType::Listener,
            tagline: "Space to think out loud".to_string(),
            specialty: "burnout".to_string(),
            match_reason: "You named exhaustion first".to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_returns_most_recent_first() {
        let older = record_created_at(-10);
        let newer = record_created_at(0);
        let store =
            InMemorySessionStore::with_records(vec![older.clone(), newer.clone()]);

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded[0].id, newer.id);
        assert_eq!(loaded[1].id, older.id);
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let first = record_created_at(-10);
        let second = record_created_at(0);
        let store =
            InMemorySessionStore::with_records(vec![first.clone(), second.clone()]);

        let mut updated = first.clone();
        updated
            .history
            .push(ConversationTurn::new(TurnRole::Model, "a reply"));
        store.upsert(&updated).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        // Same ordering as before the update; only the content changed.
        assert_eq!(loaded[1].id, first.id);
        assert_eq!(loaded[1].history.len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_inserts_new_record() {
        let store = InMemorySessionStore::new();
        store.upsert(&record_created_at(0)).await.unwrap();
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_booking_without_mentor() {
        let store = InMemorySessionStore::new();
        let mut record = record_created_at(0);
        record.booked_time = Some("Tue 14:00".to_string());

        let err = store.upsert(&record).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_accepts_booking_with_mentor() {
        let store = InMemorySessionStore::new();
        let mut record = record_created_at(0);
        record.selected_mentor = Some(mentor());
        record.booked_time = Some("Tue 14:00".to_string());
        store.upsert(&record).await.unwrap();
    }

    #[tokio::test]
    async fn test_patch_unknown_id_is_noop() {
        let store = InMemorySessionStore::with_records(vec![record_created_at(0)]);
        store
            .patch(Uuid::now_v7(), &SessionPatch::rename("ghost"))
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].label.is_none());
    }

    #[tokio::test]
    async fn test_patch_merges_fields() {
        let record = record_created_at(0);
        let id = record.id;
        let store = InMemorySessionStore::with_records(vec![record]);

        store
            .patch(id, &SessionPatch::rename("Career crossroads"))
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded[0].label.as_deref(), Some("Career crossroads"));
    }

    #[tokio::test]
    async fn test_patch_booking_without_mentor_conflicts() {
        let record = record_created_at(0);
        let id = record.id;
        let store = InMemorySessionStore::with_records(vec![record]);

        let err = store
            .patch(id, &SessionPatch::booking("Tue 14:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // The failed patch must not half-apply.
        let loaded = store.load().await.unwrap();
        assert!(loaded[0].booked_time.is_none());
    }
}
