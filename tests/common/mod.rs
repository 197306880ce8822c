//! Deterministic in-memory chain harness shared by the integration
//! tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use hashes::Hash;

use dash_quorum_rotation::chain::{
    BlockInfo, ChainSource, CommitmentProvider, MasternodeListProvider, MinedCommitment,
    MnListDiffBuilder, QuorumIndexObserver,
};
use dash_quorum_rotation::error::{RotationError, RotationResult};
use dash_quorum_rotation::hash_types::{BlockHash, ProTxHash, QuorumHash};
use dash_quorum_rotation::llmq::params::LLMQType;
use dash_quorum_rotation::masternode::{MasternodeList, MasternodeListEntry};
use dash_quorum_rotation::messages::MnListDiffBytes;
use dash_quorum_rotation::store::{MemorySnapshotBackend, SnapshotBackend};
use dash_quorum_rotation::{QuorumRotationEngine, RotationConfig};

/// Deterministic hash for the block at a height.
pub fn block_hash_at(height: u32) -> BlockHash {
    let mut bytes = [0xB0u8; 32];
    bytes[0..4].copy_from_slice(&height.to_le_bytes());
    BlockHash::from_byte_array(bytes)
}

/// A masternode with a tag-derived identity.
pub fn masternode(tag: u8) -> MasternodeListEntry {
    MasternodeListEntry {
        pro_reg_tx_hash: ProTxHash::from_byte_array([tag; 32]),
        service_address: ([10, 0, tag, 1], 19999).into(),
        is_valid: true,
    }
}

pub fn tag_of(entry: &MasternodeListEntry) -> u8 {
    entry.pro_reg_tx_hash.to_byte_array()[0]
}

struct ChainData {
    blocks: Vec<BlockInfo>,
    by_hash: HashMap<BlockHash, usize>,
    side_blocks: HashMap<BlockHash, BlockInfo>,
    commitments: Vec<MinedCommitment>,
    commitment_heights: Vec<u32>,
    registry: BTreeMap<ProTxHash, MasternodeListEntry>,
}

/// Single-chain test fixture implementing every interface the engine
/// consumes. The masternode registry is uniform across heights, which
/// keeps snapshot bit-sets comparable between cycles.
pub struct TestChain {
    data: Mutex<ChainData>,
}

impl TestChain {
    /// A chain of `height + 1` blocks with the given registered
    /// masternodes.
    pub fn new(height: u32, masternodes: Vec<MasternodeListEntry>) -> Self {
        let mut blocks = Vec::with_capacity(height as usize + 1);
        let mut by_hash = HashMap::new();
        for h in 0..=height {
            let info = BlockInfo {
                hash: block_hash_at(h),
                height: h,
                prev: if h == 0 { BlockHash::all_zeros() } else { block_hash_at(h - 1) },
            };
            by_hash.insert(info.hash, blocks.len());
            blocks.push(info);
        }
        TestChain {
            data: Mutex::new(ChainData {
                blocks,
                by_hash,
                side_blocks: HashMap::new(),
                commitments: Vec::new(),
                commitment_heights: Vec::new(),
                registry: masternodes
                    .into_iter()
                    .map(|m| (m.pro_reg_tx_hash, m))
                    .collect(),
            }),
        }
    }

    /// Registers a mined commitment for the quorum based at `height`.
    pub fn add_commitment(&self, llmq_type: LLMQType, height: u32) {
        let mut data = self.data.lock().unwrap();
        let quorum_hash = block_hash_at(height);
        data.commitments.push(MinedCommitment { llmq_type, quorum_hash });
        data.commitment_heights.push(height);
    }

    /// A block that exists in the index but is not part of the active
    /// chain.
    pub fn add_side_block(&self, tag: u8, height: u32) -> BlockHash {
        let mut data = self.data.lock().unwrap();
        let hash = BlockHash::from_byte_array([tag; 32]);
        let info = BlockInfo {
            hash,
            height,
            prev: if height == 0 { BlockHash::all_zeros() } else { block_hash_at(height - 1) },
        };
        data.side_blocks.insert(hash, info);
        hash
    }

    /// Removes a masternode from the registry, as a deregistration
    /// between cycles would.
    pub fn remove_masternode(&self, tag: u8) {
        let mut data = self.data.lock().unwrap();
        data.registry.remove(&ProTxHash::from_byte_array([tag; 32]));
    }
}

impl ChainSource for TestChain {
    fn lookup(&self, hash: &BlockHash) -> Option<BlockInfo> {
        let data = self.data.lock().unwrap();
        data.by_hash
            .get(hash)
            .map(|&index| data.blocks[index])
            .or_else(|| data.side_blocks.get(hash).copied())
    }

    fn tip(&self) -> Option<BlockInfo> {
        self.data.lock().unwrap().blocks.last().copied()
    }

    fn genesis(&self) -> Option<BlockInfo> {
        self.data.lock().unwrap().blocks.first().copied()
    }

    fn contains(&self, hash: &BlockHash) -> bool {
        self.data.lock().unwrap().by_hash.contains_key(hash)
    }

    fn ancestor(&self, of: &BlockHash, height: u32) -> Option<BlockInfo> {
        let data = self.data.lock().unwrap();
        let index = *data.by_hash.get(of)?;
        if height > data.blocks[index].height {
            return None;
        }
        data.blocks.get(height as usize).copied()
    }
}

impl MasternodeListProvider for TestChain {
    fn list_at(&self, block_hash: &BlockHash) -> RotationResult<MasternodeList> {
        let data = self.data.lock().unwrap();
        let index = data
            .by_hash
            .get(block_hash)
            .ok_or(RotationError::UnknownBlock(*block_hash))?;
        Ok(MasternodeList::new(
            data.registry.clone(),
            *block_hash,
            data.blocks[*index].height,
        ))
    }
}

impl CommitmentProvider for TestChain {
    fn mined_and_active_commitments_up_to(
        &self,
        block_hash: &BlockHash,
    ) -> RotationResult<BTreeMap<LLMQType, Vec<MinedCommitment>>> {
        let data = self.data.lock().unwrap();
        let index = data
            .by_hash
            .get(block_hash)
            .ok_or(RotationError::UnknownBlock(*block_hash))?;
        let up_to = data.blocks[*index].height;
        let mut map: BTreeMap<LLMQType, Vec<MinedCommitment>> = BTreeMap::new();
        // walk newest first so each list comes out most recent first
        for (commitment, height) in data
            .commitments
            .iter()
            .zip(data.commitment_heights.iter())
            .rev()
        {
            if *height <= up_to {
                map.entry(commitment.llmq_type).or_default().push(*commitment);
            }
        }
        Ok(map)
    }
}

/// Encodes the requested diff anchors verbatim so tests can assert which
/// bases the builder picked.
pub struct RecordingDiffBuilder;

impl MnListDiffBuilder for RecordingDiffBuilder {
    fn build_diff(&self, base: &BlockHash, target: &BlockHash) -> RotationResult<MnListDiffBytes> {
        let mut bytes = Vec::with_capacity(64);
        bytes.extend_from_slice(&base.to_byte_array());
        bytes.extend_from_slice(&target.to_byte_array());
        Ok(MnListDiffBytes(bytes))
    }
}

/// Collects every `quorum_index → quorum_hash` observation.
#[derive(Default)]
pub struct RecordingObserver {
    pub seen: Mutex<Vec<(LLMQType, QuorumHash, u32)>>,
}

impl QuorumIndexObserver for RecordingObserver {
    fn record_quorum_index(&self, llmq_type: LLMQType, quorum_hash: &QuorumHash, quorum_index: u32) {
        self.seen.lock().unwrap().push((llmq_type, *quorum_hash, quorum_index));
    }
}

/// An engine over a fresh chain, returning the shared pieces tests poke
/// at.
pub fn engine_over(
    chain: Arc<TestChain>,
    llmq_type: LLMQType,
) -> (QuorumRotationEngine, Arc<MemorySnapshotBackend>, Arc<RecordingObserver>) {
    let backend = Arc::new(MemorySnapshotBackend::new());
    let observer = Arc::new(RecordingObserver::default());
    let engine = QuorumRotationEngine::new(
        RotationConfig::new(llmq_type),
        Arc::clone(&chain) as Arc<dyn ChainSource>,
        Arc::clone(&chain) as Arc<dyn MasternodeListProvider>,
        Arc::clone(&chain) as Arc<dyn CommitmentProvider>,
        Arc::new(RecordingDiffBuilder),
        Arc::clone(&observer) as Arc<dyn QuorumIndexObserver>,
        Arc::clone(&backend) as Arc<dyn SnapshotBackend>,
    );
    (engine, backend, observer)
}
