//! The rotation engine: wires the caches, the snapshot store and the
//! consumed node interfaces around the quarter algorithms.

use std::sync::Arc;

use tracing::debug;

use crate::chain::{BlockInfo, ChainSource, CommitmentProvider, MasternodeListProvider, MnListDiffBuilder, QuorumIndexObserver};
use crate::config::RotationConfig;
use crate::error::{RotationError, RotationResult};
use crate::hash_types::BlockHash;
use crate::llmq::member_cache::QuorumMembersCache;
use crate::llmq::params::{LLMQParams, LLMQType};
use crate::llmq::rotation;
use crate::llmq::snapshot_manager::QuorumSnapshotManager;
use crate::masternode::entry::MasternodeListEntry;
use crate::store::SnapshotBackend;

/// Deterministic rotating-quorum membership engine.
///
/// The engine is a shared-memory library: it owns no threads and can be
/// called concurrently from chain-validation and network threads. The
/// snapshot store and the membership caches are each guarded by their
/// own mutex.
pub struct QuorumRotationEngine {
    config: RotationConfig,
    pub(crate) chain: Arc<dyn ChainSource>,
    pub(crate) masternode_lists: Arc<dyn MasternodeListProvider>,
    pub(crate) commitments: Arc<dyn CommitmentProvider>,
    pub(crate) diff_builder: Arc<dyn MnListDiffBuilder>,
    quorum_index_observer: Arc<dyn QuorumIndexObserver>,
    snapshot_manager: QuorumSnapshotManager,
    members_cache: QuorumMembersCache,
}

impl QuorumRotationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RotationConfig,
        chain: Arc<dyn ChainSource>,
        masternode_lists: Arc<dyn MasternodeListProvider>,
        commitments: Arc<dyn CommitmentProvider>,
        diff_builder: Arc<dyn MnListDiffBuilder>,
        quorum_index_observer: Arc<dyn QuorumIndexObserver>,
        backend: Arc<dyn SnapshotBackend>,
    ) -> Self {
        QuorumRotationEngine {
            config,
            chain,
            masternode_lists,
            commitments,
            diff_builder,
            quorum_index_observer,
            snapshot_manager: QuorumSnapshotManager::new(backend),
            members_cache: QuorumMembersCache::new(),
        }
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    pub fn snapshot_manager(&self) -> &QuorumSnapshotManager {
        &self.snapshot_manager
    }

    /// Members of the rotated quorum whose quorum block is `block_hash`.
    ///
    /// Consults the by-block cache first, then the indexed cache keyed by
    /// the cycle base, and only on a full miss derives the whole cycle,
    /// populating both tiers.
    pub fn quorum_members_for_block(
        &self,
        llmq_type: LLMQType,
        block_hash: &BlockHash,
    ) -> RotationResult<Vec<MasternodeListEntry>> {
        let block = self
            .chain
            .lookup(block_hash)
            .ok_or(RotationError::UnknownBlock(*block_hash))?;
        if let Some(members) = self.members_cache.get_by_block(llmq_type, block_hash) {
            return Ok(members);
        }

        let params = llmq_type.params();
        let quorum_index = block.height % params.dkg_params.interval;
        if quorum_index >= params.signing_active_quorum_count {
            return Err(RotationError::InvalidRequest(format!(
                "block {} at height {} is not a quorum block of {}",
                block_hash, block.height, llmq_type
            )));
        }
        let cycle_base_height = block.height - quorum_index;
        let cycle_base = self
            .chain
            .ancestor(block_hash, cycle_base_height)
            .ok_or(RotationError::UnknownBlock(*block_hash))?;

        if let Some(members) =
            self.members_cache.get_by_index(llmq_type, &cycle_base.hash, quorum_index)
        {
            self.members_cache.insert_by_block(llmq_type, *block_hash, members.clone());
            self.quorum_index_observer.record_quorum_index(llmq_type, block_hash, quorum_index);
            return Ok(members);
        }

        let quorums = self.compute_rotated_quorums(&params, &cycle_base)?;
        for (index, members) in quorums.iter().enumerate() {
            self.members_cache.insert_by_index(
                llmq_type,
                cycle_base.hash,
                index as u32,
                members.clone(),
            );
        }
        let members = quorums.into_iter().nth(quorum_index as usize).unwrap_or_default();
        self.members_cache.insert_by_block(llmq_type, *block_hash, members.clone());
        Ok(members)
    }

    /// Members of all `signing_active_quorum_count` quorums of the cycle
    /// based at `cycle_base_hash`, indexed by quorum index.
    pub fn quorum_members_at_cycle(
        &self,
        llmq_type: LLMQType,
        cycle_base_hash: &BlockHash,
    ) -> RotationResult<Vec<Vec<MasternodeListEntry>>> {
        let cycle_base = self
            .chain
            .lookup(cycle_base_hash)
            .ok_or(RotationError::UnknownBlock(*cycle_base_hash))?;
        let params = llmq_type.params();
        if cycle_base.height % params.dkg_params.interval != 0 {
            return Err(RotationError::InvalidRequest(format!(
                "block {} at height {} is not a cycle base of {}",
                cycle_base_hash, cycle_base.height, llmq_type
            )));
        }

        let cached: Vec<Option<Vec<MasternodeListEntry>>> = (0..params
            .signing_active_quorum_count)
            .map(|index| self.members_cache.get_by_index(llmq_type, cycle_base_hash, index))
            .collect();
        if cached.iter().all(Option::is_some) {
            return Ok(cached.into_iter().flatten().collect());
        }

        let quorums = self.compute_rotated_quorums(&params, &cycle_base)?;
        for (index, members) in quorums.iter().enumerate() {
            self.members_cache.insert_by_index(
                llmq_type,
                cycle_base.hash,
                index as u32,
                members.clone(),
            );
        }
        Ok(quorums)
    }

    /// Reconstructs the quarter produced `cycles_back` cycles before the
    /// cycle base. A missing ancestor block or snapshot yields empty
    /// quarters: the cycle simply inherits nothing from that ancestor.
    fn previous_quarter(
        &self,
        params: &LLMQParams,
        cycle_base: &BlockInfo,
        cycles_back: u32,
    ) -> RotationResult<Vec<Vec<MasternodeListEntry>>> {
        let quorum_count = params.signing_active_quorum_count as usize;
        let empty = vec![Vec::new(); quorum_count];

        let Some(height) =
            cycle_base.height.checked_sub(cycles_back * params.dkg_params.interval)
        else {
            return Ok(empty);
        };
        let Some(ancestor) = self.chain.ancestor(&cycle_base.hash, height) else {
            return Ok(empty);
        };
        let Some(snapshot) =
            self.snapshot_manager.get_snapshot_for_block(params.quorum_type, &ancestor.hash)?
        else {
            debug!(
                llmq_type = %params.quorum_type,
                block = %ancestor.hash,
                height,
                "no snapshot for ancestor cycle, treating its quarter as empty"
            );
            return Ok(empty);
        };
        let list = self.masternode_lists.list_at(&ancestor.hash)?;
        rotation::quorum_quarter_members_by_snapshot(params, &ancestor.hash, &list, &snapshot)
    }

    /// Derives the full membership of every quorum of the cycle: three
    /// reconstructed quarters plus the newly built one, concatenated
    /// oldest first. Persists the snapshot emitted at the cycle base.
    fn compute_rotated_quorums(
        &self,
        params: &LLMQParams,
        cycle_base: &BlockInfo,
    ) -> RotationResult<Vec<Vec<MasternodeListEntry>>> {
        let q_h_m_3c = self.previous_quarter(params, cycle_base, 3)?;
        let q_h_m_2c = self.previous_quarter(params, cycle_base, 2)?;
        let q_h_m_c = self.previous_quarter(params, cycle_base, 1)?;

        let list = self.masternode_lists.list_at(&cycle_base.hash)?;
        let new_quarter = rotation::build_new_quorum_quarter_members(
            params,
            &cycle_base.hash,
            &list,
            [&q_h_m_c, &q_h_m_2c, &q_h_m_3c],
        );
        self.snapshot_manager.store_snapshot_for_block(
            params.quorum_type,
            &cycle_base.hash,
            &new_quarter.snapshot,
        )?;

        let quorum_count = params.signing_active_quorum_count as usize;
        let mut quorums = Vec::with_capacity(quorum_count);
        for index in 0..quorum_count {
            let mut members = Vec::with_capacity(params.size as usize);
            for quarter in [&q_h_m_3c, &q_h_m_2c, &q_h_m_c, &new_quarter.quarters] {
                if let Some(quorum_quarter) = quarter.get(index) {
                    members.extend(quorum_quarter.iter().cloned());
                }
            }
            quorums.push(members);
        }
        debug!(
            llmq_type = %params.quorum_type,
            cycle_base = %cycle_base.hash,
            height = cycle_base.height,
            "derived rotated quorum members"
        );
        Ok(quorums)
    }
}
