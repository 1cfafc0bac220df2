//! JSON-file session store.
//!
//! Records are indexed by id in memory (a `BTreeMap`, so mutations touch
//! one entry instead of scanning a list) and flushed to a single
//! `sessions.json` under the data directory. Every mutation is a flush
//! boundary: the CLI is a short-lived process per command, so deferring
//! serialization any further would trade durability for nothing.
//!
//! Flushes go through a temp file plus rename so a crash mid-write never
//! leaves a truncated collection behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use unloop_core::store::{SessionStore, validate_record};
use unloop_types::error::StoreError;
use unloop_types::session::{SessionPatch, SessionRecord};

const STORE_FILE: &str = "sessions.json";

/// Durable session store backed by a single JSON file.
#[derive(Debug)]
pub struct JsonSessionStore {
    path: PathBuf,
    records: Mutex<BTreeMap<Uuid, SessionRecord>>,
}

impl JsonSessionStore {
    /// Open (or create) the store under the given data directory.
    ///
    /// An unreadable or malformed file logs a warning and starts empty
    /// rather than failing: losing old sessions is better than refusing
    /// to start. There is no schema versioning; tolerant record decoding
    /// is what keeps old blobs loadable.
    pub async fn open(data_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(data_dir)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        let path = data_dir.join(STORE_FILE);

        let records: BTreeMap<Uuid, SessionRecord> = match fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<Vec<SessionRecord>>(&raw) {
                Ok(records) => records.into_iter().map(|r| (r.id, r)).collect(),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Session file unparseable, starting with an empty collection"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        tracing::debug!(path = %path.display(), count = records.len(), "Session store opened");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Serialize the full collection to disk, atomically. The on-disk
    /// form is a plain array ordered most-recent-first, matching what
    /// `load` returns.
    async fn flush(&self, records: &BTreeMap<Uuid, SessionRecord>) -> Result<(), StoreError> {
        let ordered = ordered_records(records);
        let json = serde_json::to_string_pretty(&ordered)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }
}

fn ordered_records(records: &BTreeMap<Uuid, SessionRecord>) -> Vec<SessionRecord> {
    let mut out: Vec<SessionRecord> = records.values().cloned().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

impl SessionStore for JsonSessionStore {
    async fn load(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(ordered_records(&records))
    }

    async fn upsert(&self, record: &SessionRecord) -> Result<(), StoreError> {
        validate_record(record)?;
        let mut records = self.records.lock().await;
        records.insert(record.id, record.clone());
        self.flush(&records).await
    }

    async fn patch(&self, id: Uuid, patch: &SessionPatch) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let Some(existing) = records.get(&id) else {
            tracing::debug!(session_id = %id, "Patch for unknown session id ignored");
            return Ok(());
        };
        let mut updated = existing.clone();
        patch.apply_to(&mut updated);
        validate_record(&updated)?;
        records.insert(id, updated);
        self.flush(&records).await
    }
}
