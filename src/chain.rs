//! Interfaces consumed from the surrounding node.
//!
//! The engine never owns the chain, the masternode registry or the diff
//! builder; it reads them through the traits below. Implementations are
//! expected to be consistent with a single canonical chain: every node
//! answering these queries identically derives identical quorums.

use std::collections::BTreeMap;

use crate::error::RotationResult;
use crate::hash_types::{BlockHash, QuorumHash};
use crate::llmq::params::LLMQType;
use crate::masternode::list::MasternodeList;
use crate::messages::qrinfo::MnListDiffBytes;

/// Position of a block on the chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockInfo {
    pub hash: BlockHash,
    pub height: u32,
    pub prev: BlockHash,
}

/// Read-only view of the block index and the active chain.
pub trait ChainSource: Send + Sync {
    /// Resolves a block hash to its index entry, if known.
    fn lookup(&self, hash: &BlockHash) -> Option<BlockInfo>;

    /// The active chain tip.
    fn tip(&self) -> Option<BlockInfo>;

    /// The genesis block.
    fn genesis(&self) -> Option<BlockInfo>;

    /// Whether the block is part of the active chain.
    fn contains(&self, hash: &BlockHash) -> bool;

    /// The ancestor of `of` at the given height, walking the chain the
    /// block is on.
    fn ancestor(&self, of: &BlockHash, height: u32) -> Option<BlockInfo>;
}

/// Read-only façade over the external masternode registry.
pub trait MasternodeListProvider: Send + Sync {
    /// The deterministic masternode list at a block.
    fn list_at(&self, block_hash: &BlockHash) -> RotationResult<MasternodeList>;
}

/// A mined and active quorum commitment, reduced to what the rotation
/// engine consumes: the quorum type and the hash of the quorum block the
/// commitment finalized.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MinedCommitment {
    pub llmq_type: LLMQType,
    pub quorum_hash: QuorumHash,
}

/// Access to the mined quorum commitments recorded on chain.
pub trait CommitmentProvider: Send + Sync {
    /// All mined-and-active commitments at or before the given block,
    /// grouped by quorum type, most recent first.
    fn mined_and_active_commitments_up_to(
        &self,
        block_hash: &BlockHash,
    ) -> RotationResult<BTreeMap<LLMQType, Vec<MinedCommitment>>>;
}

/// Collaborator that builds simplified masternode-list diffs. The diff
/// format is owned by the collaborator; the engine embeds the returned
/// buffer without interpreting it.
pub trait MnListDiffBuilder: Send + Sync {
    fn build_diff(&self, base: &BlockHash, target: &BlockHash) -> RotationResult<MnListDiffBytes>;
}

/// Sink for the `quorum_index → quorum_hash` observations the membership
/// cache produces when serving a block from the indexed tier.
pub trait QuorumIndexObserver: Send + Sync {
    fn record_quorum_index(&self, llmq_type: LLMQType, quorum_hash: &QuorumHash, quorum_index: u32);
}

/// Observer that discards all observations.
pub struct NoopQuorumIndexObserver;

impl QuorumIndexObserver for NoopQuorumIndexObserver {
    fn record_quorum_index(
        &self,
        _llmq_type: LLMQType,
        _quorum_hash: &QuorumHash,
        _quorum_index: u32,
    ) {
    }
}
