//! Persistent backend abstraction for the snapshot store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{StorageError, StorageResult};

/// Thread-safe key-value backend the snapshot store persists into. The
/// production implementation wraps the node's evolution database; the
/// engine only relies on single-key reads and idempotent writes.
pub trait SnapshotBackend: Send + Sync {
    /// Reads the value stored under `key`. A missing key is `Ok(None)`.
    fn read(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn write(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;
}

/// In-memory backend used in tests and by tooling that does not persist.
#[derive(Default)]
pub struct MemorySnapshotBackend {
    entries: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemorySnapshotBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent reads fail, for exercising error paths.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent writes fail, for exercising error paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotBackend for MemorySnapshotBackend {
    fn read(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::ReadFailed("injected read failure".into()));
        }
        let entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed("injected write failure".into()));
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_back_what_was_written() {
        let backend = MemorySnapshotBackend::new();
        assert_eq!(backend.read(b"k").unwrap(), None);
        backend.write(b"k", b"v").unwrap();
        assert_eq!(backend.read(b"k").unwrap(), Some(b"v".to_vec()));
        backend.write(b"k", b"w").unwrap();
        assert_eq!(backend.read(b"k").unwrap(), Some(b"w".to_vec()));
    }

    #[test]
    fn failure_injection() {
        let backend = MemorySnapshotBackend::new();
        backend.set_fail_writes(true);
        assert!(backend.write(b"k", b"v").is_err());
        backend.set_fail_writes(false);
        backend.write(b"k", b"v").unwrap();
        backend.set_fail_reads(true);
        assert!(backend.read(b"k").is_err());
    }
}
