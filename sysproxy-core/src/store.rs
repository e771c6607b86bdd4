//! Where the snapshot lives between apply and restore.

use std::sync::{Arc, Mutex};

use crate::codec::{decode_snapshot, encode_snapshot, SnapshotDecodeError};
use crate::snapshot::Snapshot;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot unreadable: {0}")]
    Decode(#[from] SnapshotDecodeError),
}

pub trait SnapshotStore {
    fn exists(&self) -> bool;
    /// `Ok(None)` when nothing is stored.
    fn load(&self) -> Result<Option<Snapshot>, StoreError>;
    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// Keeps the encoded text in memory. Clones share the same slot, which lets a
/// test stand in for a file that survives a process restart.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    text: Arc<Mutex<Option<String>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored text, as it would appear on disk.
    pub fn contents(&self) -> Option<String> {
        self.slot().clone()
    }

    pub fn set_contents(&self, text: impl Into<String>) {
        *self.slot() = Some(text.into());
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.text.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn exists(&self) -> bool {
        self.slot().is_some()
    }

    fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        match self.slot().as_deref() {
            Some(text) => Ok(Some(decode_snapshot(text)?)),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        *self.slot() = Some(encode_snapshot(snapshot));
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot() = None;
        Ok(())
    }
}
