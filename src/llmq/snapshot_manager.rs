//! The snapshot store: a write-through cache over the persistent
//! backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use hashes::Hash;
use tracing::debug;

use crate::cache::UnorderedLruCache;
use crate::consensus::encode::{deserialize, serialize};
use crate::error::{RotationError, RotationResult, StorageError};
use crate::hash_types::{BlockHash, SnapshotHash};
use crate::llmq::params::LLMQType;
use crate::llmq::snapshot::QuorumSnapshot;
use crate::store::SnapshotBackend;

/// Namespace prefix of snapshot keys in the persistent store.
const DB_QUORUM_SNAPSHOT: &[u8] = b"llmq_S";

type SnapshotCaches = HashMap<LLMQType, UnorderedLruCache<SnapshotHash, QuorumSnapshot>>;

/// Stores one immutable snapshot per `(llmq_type, block_hash)`, caching
/// the `signing_active_quorum_count + 1` most recently touched snapshots
/// per type in memory.
pub struct QuorumSnapshotManager {
    backend: Arc<dyn SnapshotBackend>,
    caches: Mutex<SnapshotCaches>,
}

impl QuorumSnapshotManager {
    pub fn new(backend: Arc<dyn SnapshotBackend>) -> Self {
        QuorumSnapshotManager {
            backend,
            caches: Mutex::new(HashMap::new()),
        }
    }

    /// The persistent key of a snapshot: the namespace string (length
    /// prefixed, as the store serializes string keys) followed by the
    /// salted hash of `(llmq_type, block_hash)`.
    fn db_key(snapshot_hash: &SnapshotHash) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + DB_QUORUM_SNAPSHOT.len() + 32);
        key.push(DB_QUORUM_SNAPSHOT.len() as u8);
        key.extend_from_slice(DB_QUORUM_SNAPSHOT);
        key.extend_from_slice(&snapshot_hash.to_byte_array());
        key
    }

    fn lock(&self) -> RotationResult<MutexGuard<'_, SnapshotCaches>> {
        self.caches
            .lock()
            .map_err(|e| RotationError::Storage(StorageError::LockPoisoned(e.to_string())))
    }

    /// Fetches the snapshot for a block, consulting the cache before the
    /// backend and promoting backend hits into the cache. A snapshot
    /// that was never stored is `None`, not an error.
    pub fn get_snapshot_for_block(
        &self,
        llmq_type: LLMQType,
        block_hash: &BlockHash,
    ) -> RotationResult<Option<QuorumSnapshot>> {
        let snapshot_hash = SnapshotHash::for_snapshot(llmq_type, block_hash);
        {
            let mut caches = self.lock()?;
            if let Some(cache) = caches.get_mut(&llmq_type) {
                if let Some(snapshot) = cache.get(&snapshot_hash) {
                    return Ok(Some(snapshot.clone()));
                }
            }
        }

        let Some(bytes) = self.backend.read(&Self::db_key(&snapshot_hash))? else {
            return Ok(None);
        };
        let snapshot: QuorumSnapshot = deserialize(&bytes).map_err(|e| {
            RotationError::MalformedSnapshot(format!(
                "stored snapshot of type {} at block {} does not decode: {}",
                llmq_type, block_hash, e
            ))
        })?;
        debug!(%llmq_type, block = %block_hash, "promoted quorum snapshot from disk");

        let mut caches = self.lock()?;
        Self::cache_for_type(&mut caches, llmq_type).insert(snapshot_hash, snapshot.clone());
        Ok(Some(snapshot))
    }

    /// Persists a snapshot and installs it into the cache. The write
    /// goes to the backend first; on failure the cache is left
    /// untouched. Rewriting an identical value is a no-op semantically.
    pub fn store_snapshot_for_block(
        &self,
        llmq_type: LLMQType,
        block_hash: &BlockHash,
        snapshot: &QuorumSnapshot,
    ) -> RotationResult<()> {
        let snapshot_hash = SnapshotHash::for_snapshot(llmq_type, block_hash);
        let mut caches = self.lock()?;
        self.backend
            .write(&Self::db_key(&snapshot_hash), &serialize(snapshot))?;
        Self::cache_for_type(&mut caches, llmq_type).insert(snapshot_hash, snapshot.clone());
        debug!(%llmq_type, block = %block_hash, "stored quorum snapshot");
        Ok(())
    }

    fn cache_for_type(
        caches: &mut SnapshotCaches,
        llmq_type: LLMQType,
    ) -> &mut UnorderedLruCache<SnapshotHash, QuorumSnapshot> {
        caches.entry(llmq_type).or_insert_with(|| {
            UnorderedLruCache::with_capacity(
                llmq_type.params().signing_active_quorum_count as usize + 1,
            )
        })
    }
}
