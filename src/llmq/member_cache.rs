//! The two-tier quorum membership cache.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::warn;

use crate::cache::UnorderedLruCache;
use crate::hash_types::BlockHash;
use crate::llmq::params::LLMQType;
use crate::masternode::entry::MasternodeListEntry;

type ByBlock = HashMap<LLMQType, UnorderedLruCache<BlockHash, Vec<MasternodeListEntry>>>;
type ByIndex = HashMap<LLMQType, UnorderedLruCache<(BlockHash, u32), Vec<MasternodeListEntry>>>;

struct CacheInner {
    by_block: ByBlock,
    by_index: ByIndex,
}

/// Caches quorum members twice: by the quorum block hash, and by
/// `(cycle base hash, quorum index)`. Both tiers keep the
/// `signing_active_quorum_count + 1` most recently used entries per
/// type. Members are stored by value; the caches never alias registry
/// records.
pub struct QuorumMembersCache {
    inner: Mutex<CacheInner>,
}

impl Default for QuorumMembersCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QuorumMembersCache {
    pub fn new() -> Self {
        QuorumMembersCache {
            inner: Mutex::new(CacheInner {
                by_block: HashMap::new(),
                by_index: HashMap::new(),
            }),
        }
    }

    fn capacity(llmq_type: LLMQType) -> usize {
        llmq_type.params().signing_active_quorum_count as usize + 1
    }

    pub fn get_by_block(
        &self,
        llmq_type: LLMQType,
        block_hash: &BlockHash,
    ) -> Option<Vec<MasternodeListEntry>> {
        let Ok(mut inner) = self.inner.lock() else {
            warn!("membership cache lock poisoned, treating lookup as a miss");
            return None;
        };
        inner
            .by_block
            .get_mut(&llmq_type)
            .and_then(|cache| cache.get(block_hash).cloned())
    }

    pub fn get_by_index(
        &self,
        llmq_type: LLMQType,
        cycle_base_hash: &BlockHash,
        quorum_index: u32,
    ) -> Option<Vec<MasternodeListEntry>> {
        let Ok(mut inner) = self.inner.lock() else {
            warn!("membership cache lock poisoned, treating lookup as a miss");
            return None;
        };
        inner
            .by_index
            .get_mut(&llmq_type)
            .and_then(|cache| cache.get(&(*cycle_base_hash, quorum_index)).cloned())
    }

    pub fn insert_by_block(
        &self,
        llmq_type: LLMQType,
        block_hash: BlockHash,
        members: Vec<MasternodeListEntry>,
    ) {
        let Ok(mut inner) = self.inner.lock() else {
            warn!("membership cache lock poisoned, dropping insert");
            return;
        };
        inner
            .by_block
            .entry(llmq_type)
            .or_insert_with(|| UnorderedLruCache::with_capacity(Self::capacity(llmq_type)))
            .insert(block_hash, members);
    }

    pub fn insert_by_index(
        &self,
        llmq_type: LLMQType,
        cycle_base_hash: BlockHash,
        quorum_index: u32,
        members: Vec<MasternodeListEntry>,
    ) {
        let Ok(mut inner) = self.inner.lock() else {
            warn!("membership cache lock poisoned, dropping insert");
            return;
        };
        inner
            .by_index
            .entry(llmq_type)
            .or_insert_with(|| UnorderedLruCache::with_capacity(Self::capacity(llmq_type)))
            .insert((cycle_base_hash, quorum_index), members);
    }
}

#[cfg(test)]
mod tests {
    use hashes::Hash;

    use super::*;
    use crate::hash_types::ProTxHash;

    fn member(tag: u8) -> MasternodeListEntry {
        MasternodeListEntry {
            pro_reg_tx_hash: ProTxHash::from_byte_array([tag; 32]),
            service_address: ([10, 0, 0, tag], 19999).into(),
            is_valid: true,
        }
    }

    fn block(tag: u8) -> BlockHash {
        BlockHash::from_byte_array([tag; 32])
    }

    const TYPE: LLMQType = LLMQType::LlmqtypeTestDIP0024;

    #[test]
    fn tiers_are_independent() {
        let cache = QuorumMembersCache::new();
        cache.insert_by_block(TYPE, block(1), vec![member(1)]);
        cache.insert_by_index(TYPE, block(2), 0, vec![member(2)]);
        assert_eq!(cache.get_by_block(TYPE, &block(1)), Some(vec![member(1)]));
        assert_eq!(cache.get_by_block(TYPE, &block(2)), None);
        assert_eq!(cache.get_by_index(TYPE, &block(2), 0), Some(vec![member(2)]));
        assert_eq!(cache.get_by_index(TYPE, &block(2), 1), None);
    }

    #[test]
    fn bounded_per_type() {
        let cache = QuorumMembersCache::new();
        // capacity is signing_active_quorum_count + 1 = 2 for the test type
        for tag in 1..=4u8 {
            cache.insert_by_block(TYPE, block(tag), vec![member(tag)]);
        }
        assert_eq!(cache.get_by_block(TYPE, &block(1)), None);
        assert!(cache.get_by_block(TYPE, &block(4)).is_some());
    }
}
