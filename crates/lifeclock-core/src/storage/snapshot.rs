//! Persistence for the scheduler's recovery snapshot.
//!
//! Stores hold the serialized [`TimerState`] as an opaque string; parsing and
//! invariant checks happen on load through [`protocol::reconcile_json`], so a
//! corrupt or stale snapshot reads as "no session".
//!
//! [`protocol::reconcile_json`]: crate::timer::protocol::reconcile_json

use std::sync::{Arc, Mutex};

use tracing::warn;

use super::Database;
use crate::error::StorageError;
use crate::timer::protocol::reconcile_json;
use crate::timer::TimerState;

pub const SNAPSHOT_KEY: &str = "timer_snapshot";

pub trait SnapshotStore: Send {
    fn read(&self) -> Result<Option<String>, StorageError>;
    fn write(&mut self, raw: &str) -> Result<(), StorageError>;
    fn clear(&mut self) -> Result<(), StorageError>;

    fn save(&mut self, state: &TimerState) -> Result<(), StorageError> {
        let raw = serde_json::to_string(state)
            .map_err(|e| StorageError::QueryFailed(format!("encode snapshot: {e}")))?;
        self.write(&raw)
    }

    /// Load and validate the persisted snapshot. Invalid snapshots are
    /// cleared so they are not retried on every start.
    fn restore(&mut self) -> Option<TimerState> {
        let raw = match self.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("failed to read timer snapshot: {e}");
                return None;
            }
        };
        let state = reconcile_json(&raw);
        if state.is_none() {
            warn!("discarding invalid timer snapshot");
            if let Err(e) = self.clear() {
                warn!("failed to clear timer snapshot: {e}");
            }
        }
        state
    }
}

/// Snapshot store in the SQLite kv table.
pub struct SqliteSnapshotStore {
    db: Database,
}

impl SqliteSnapshotStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open() -> Result<Self, StorageError> {
        Ok(Self::new(Database::open()?))
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn read(&self) -> Result<Option<String>, StorageError> {
        self.db.kv_get(SNAPSHOT_KEY)
    }

    fn write(&mut self, raw: &str) -> Result<(), StorageError> {
        self.db.kv_set(SNAPSHOT_KEY, raw)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.db.kv_delete(SNAPSHOT_KEY).map(|_| ())
    }
}

/// In-memory store. Clones share the same slot, so a test can keep one
/// clone to inspect what the scheduler persisted.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    slot: Arc<Mutex<Option<String>>>,
    writes: Arc<Mutex<u64>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        let store = Self::default();
        if let Ok(mut slot) = store.slot.lock() {
            *slot = Some(raw.into());
        }
        store
    }

    /// Number of writes and clears performed so far.
    pub fn write_count(&self) -> u64 {
        self.writes.lock().map(|n| *n).unwrap_or(0)
    }

    pub fn snapshot(&self) -> Option<TimerState> {
        let raw = self.read().ok().flatten()?;
        serde_json::from_str(&raw).ok()
    }

    fn bump(&self) {
        if let Ok(mut n) = self.writes.lock() {
            *n += 1;
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read(&self) -> Result<Option<String>, StorageError> {
        self.slot
            .lock()
            .map(|slot| slot.clone())
            .map_err(|_| StorageError::Locked)
    }

    fn write(&mut self, raw: &str) -> Result<(), StorageError> {
        *self.slot.lock().map_err(|_| StorageError::Locked)? = Some(raw.to_string());
        self.bump();
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        *self.slot.lock().map_err(|_| StorageError::Locked)? = None;
        self.bump();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{SegmentEngine, TimerConfiguration};

    fn running_state() -> TimerState {
        let mut engine = SegmentEngine::new();
        engine.start(&TimerConfiguration::new(95, 20, 5).unwrap(), 42);
        engine.state().unwrap().clone()
    }

    #[test]
    fn sqlite_store_roundtrip() {
        let mut store = SqliteSnapshotStore::new(Database::open_memory().unwrap());
        assert!(store.restore().is_none());

        let state = running_state();
        store.save(&state).unwrap();
        assert_eq!(store.restore(), Some(state));

        store.clear().unwrap();
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn invalid_snapshot_is_cleared() {
        let mut store = MemorySnapshotStore::with_raw(r#"{"totalMinutes":1}"#);
        assert!(store.restore().is_none());
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn memory_clones_share_slot() {
        let observer = MemorySnapshotStore::new();
        let mut writer = observer.clone();
        writer.save(&running_state()).unwrap();
        assert_eq!(observer.write_count(), 1);
        assert_eq!(observer.snapshot().unwrap().block_count, 3);
    }
}
