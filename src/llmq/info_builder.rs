//! Assembly of rotation-info responses.

use hashes::Hash;

use crate::chain::BlockInfo;
use crate::engine::QuorumRotationEngine;
use crate::error::{RotationError, RotationResult};
use crate::hash_types::BlockHash;
use crate::messages::qrinfo::{GetQuorumRotationInfo, QuorumRotationInfo};

impl QuorumRotationEngine {
    /// Serves a `getqrinfo` request: packages the three snapshots of the
    /// most recent rotation cycle at or before the requested block, plus
    /// masternode-list diffs anchored at the requester's base blocks.
    ///
    /// Every error renders to the single string the wire response
    /// reports.
    pub fn build_quorum_rotation_info(
        &self,
        request: &GetQuorumRotationInfo,
    ) -> RotationResult<QuorumRotationInfo> {
        if request.base_block_hashes_count > 4 {
            return Err(RotationError::InvalidRequest(
                "more than 4 base block hashes requested".into(),
            ));
        }
        if request.base_block_hashes_count as usize != request.base_block_hashes.len() {
            return Err(RotationError::InvalidRequest(
                "base block hashes count does not match the hashes present".into(),
            ));
        }

        let llmq_type = self.config().rotation_llmq_type;

        let bases: Vec<BlockInfo> = if request.base_block_hashes.is_empty() {
            let genesis = self
                .chain
                .genesis()
                .ok_or(RotationError::UnknownBlock(BlockHash::all_zeros()))?;
            vec![genesis]
        } else {
            let mut bases = Vec::with_capacity(request.base_block_hashes.len());
            for hash in &request.base_block_hashes {
                let block = self
                    .chain
                    .lookup(hash)
                    .ok_or(RotationError::UnknownBlock(*hash))?;
                if !self.chain.contains(hash) {
                    return Err(RotationError::NotOnActiveChain(*hash));
                }
                bases.push(block);
            }
            bases.sort_by_key(|block| block.height);
            bases
        };
        let highest_base = bases[bases.len() - 1];

        // the tip diff is always anchored at the highest known base
        let tip = self
            .chain
            .tip()
            .ok_or(RotationError::UnknownBlock(BlockHash::all_zeros()))?;
        let mn_list_diff_tip = self.diff_builder.build_diff(&highest_base.hash, &tip.hash)?;

        let request_block = self
            .chain
            .lookup(&request.block_request_hash)
            .ok_or(RotationError::UnknownBlock(request.block_request_hash))?;

        let commitments = self
            .commitments
            .mined_and_active_commitments_up_to(&request_block.hash)?;
        let commitments = commitments.get(&llmq_type).cloned().unwrap_or_default();
        if commitments.len() < 4 {
            return Err(RotationError::ChainTooYoung {
                required: 4,
                found: commitments.len(),
            });
        }

        // commitments are returned most recent first: index 0 is H
        let h_block = self
            .chain
            .lookup(&commitments[0].quorum_hash)
            .ok_or(RotationError::UnknownBlock(commitments[0].quorum_hash))?;
        let creation_height = h_block.height as i32;

        let mut snapshots = Vec::with_capacity(3);
        let mut diffs = Vec::with_capacity(3);
        for commitment in &commitments[1..4] {
            let block = self
                .chain
                .lookup(&commitment.quorum_hash)
                .ok_or(RotationError::UnknownBlock(commitment.quorum_hash))?;
            let base_hash = last_base_block_hash(&bases, &block);
            diffs.push(self.diff_builder.build_diff(&base_hash, &block.hash)?);
            let snapshot = self
                .snapshot_manager()
                .get_snapshot_for_block(llmq_type, &block.hash)?
                .ok_or(RotationError::SnapshotMissing {
                    llmq_type,
                    block_hash: block.hash,
                })?;
            snapshots.push(snapshot);
        }

        let quorum_snapshot_at_h_minus_3c = snapshots.pop().expect("three snapshots collected");
        let quorum_snapshot_at_h_minus_2c = snapshots.pop().expect("three snapshots collected");
        let quorum_snapshot_at_h_minus_c = snapshots.pop().expect("three snapshots collected");
        let mn_list_diff_at_h_minus_3c = diffs.pop().expect("three diffs collected");
        let mn_list_diff_at_h_minus_2c = diffs.pop().expect("three diffs collected");
        let mn_list_diff_at_h_minus_c = diffs.pop().expect("three diffs collected");

        Ok(QuorumRotationInfo {
            creation_height,
            quorum_snapshot_at_h_minus_c,
            quorum_snapshot_at_h_minus_2c,
            quorum_snapshot_at_h_minus_3c,
            mn_list_diff_tip,
            mn_list_diff_at_h_minus_c,
            mn_list_diff_at_h_minus_2c,
            mn_list_diff_at_h_minus_3c,
        })
    }
}

/// The highest base block not above `block`, or the zero hash when every
/// base is younger. The bases must be sorted by ascending height.
fn last_base_block_hash(bases: &[BlockInfo], block: &BlockInfo) -> BlockHash {
    let mut hash = BlockHash::all_zeros();
    for base in bases {
        if base.height > block.height {
            break;
        }
        hash = base.hash;
    }
    hash
}
