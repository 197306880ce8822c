//! The deterministic masternode list at a block.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::RotationError;
use crate::hash_types::{BlockHash, ProTxHash, QuorumModifierHash, ScoreHash};
use crate::llmq::snapshot::QuorumSnapshot;
use crate::masternode::entry::MasternodeListEntry;

/// Ordered collection of masternodes at a block. Canonical iteration
/// order is the `ProTxHash` order of the map, which is chain-
/// deterministic; snapshot bit positions refer to this order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MasternodeList {
    pub block_hash: BlockHash,
    pub known_height: u32,
    pub masternodes: BTreeMap<ProTxHash, MasternodeListEntry>,
}

impl MasternodeList {
    pub fn empty(block_hash: BlockHash, known_height: u32) -> Self {
        MasternodeList {
            block_hash,
            known_height,
            masternodes: BTreeMap::new(),
        }
    }

    pub fn new(
        masternodes: BTreeMap<ProTxHash, MasternodeListEntry>,
        block_hash: BlockHash,
        known_height: u32,
    ) -> Self {
        MasternodeList {
            block_hash,
            known_height,
            masternodes,
        }
    }

    /// Adds a masternode while building a list.
    pub fn add_masternode(&mut self, entry: MasternodeListEntry) {
        self.masternodes.insert(entry.pro_reg_tx_hash, entry);
    }

    pub fn masternode_count(&self) -> usize {
        self.masternodes.len()
    }

    pub fn has_masternode(&self, pro_tx_hash: &ProTxHash) -> bool {
        self.masternodes.contains_key(pro_tx_hash)
    }

    /// Canonical-order iteration over every registered masternode,
    /// regardless of validity.
    pub fn masternodes_inclusive(&self) -> impl Iterator<Item = &MasternodeListEntry> {
        self.masternodes.values()
    }

    /// Canonical-order iteration restricted to valid masternodes.
    pub fn valid_masternodes(&self) -> impl Iterator<Item = &MasternodeListEntry> {
        self.masternodes.values().filter(|entry| entry.is_valid)
    }

    /// Scores the given masternodes under a modifier. The returned map
    /// iterates in ascending score order; including the `ProTxHash` in
    /// the key makes the tie-break structural.
    pub fn scores_for_masternodes<'a, I>(
        entries: I,
        modifier: &QuorumModifierHash,
    ) -> BTreeMap<(ScoreHash, ProTxHash), &'a MasternodeListEntry>
    where
        I: IntoIterator<Item = &'a MasternodeListEntry>,
    {
        entries
            .into_iter()
            .map(|entry| ((entry.score(modifier), entry.pro_reg_tx_hash), entry))
            .collect()
    }

    /// The top `count` masternodes of this list ranked by ascending
    /// score under `modifier`.
    pub fn calculate_quorum(
        &self,
        count: usize,
        modifier: &QuorumModifierHash,
    ) -> Vec<&MasternodeListEntry> {
        Self::scores_for_masternodes(self.masternodes_inclusive(), modifier)
            .into_values()
            .take(count)
            .collect()
    }

    /// Splits this list into the masternodes marked used by the snapshot
    /// bit-set and the rest, both in canonical order. The bit-set length
    /// must match the list size.
    pub fn used_and_unused_for_snapshot(
        &self,
        snapshot: &QuorumSnapshot,
    ) -> Result<(Vec<&MasternodeListEntry>, Vec<&MasternodeListEntry>), RotationError> {
        if snapshot.active_quorum_members.len() != self.masternode_count() {
            return Err(RotationError::MalformedSnapshot(format!(
                "bitset length {} does not match masternode list size {} at block {}",
                snapshot.active_quorum_members.len(),
                self.masternode_count(),
                self.block_hash,
            )));
        }
        let mut used = Vec::new();
        let mut unused = Vec::new();
        for (index, entry) in self.masternodes_inclusive().enumerate() {
            if snapshot.active_quorum_members[index] {
                used.push(entry);
            } else {
                unused.push(entry);
            }
        }
        Ok((used, unused))
    }

    /// Splits this list into the masternodes already placed in one of
    /// the given previous quarters and the rest, both in canonical
    /// order. Quarter members no longer present in this list are
    /// ignored; iteration is inclusive of banned or paused masternodes,
    /// matching how the quarters were populated.
    pub fn usage_info(
        &self,
        previous_quarters: [&Vec<Vec<MasternodeListEntry>>; 3],
    ) -> (Vec<&MasternodeListEntry>, Vec<&MasternodeListEntry>) {
        let mut used_hashes = BTreeSet::new();
        for quarter in previous_quarters {
            for quorum in quarter {
                for node in quorum {
                    if self.has_masternode(&node.pro_reg_tx_hash) {
                        used_hashes.insert(node.pro_reg_tx_hash);
                    }
                }
            }
        }
        self.masternodes_inclusive()
            .partition(|entry| used_hashes.contains(&entry.pro_reg_tx_hash))
    }
}
