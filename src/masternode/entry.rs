//! A single deterministic masternode record.

use std::net::SocketAddr;

use crate::hash_types::{ProTxHash, QuorumModifierHash, ScoreHash};

/// Record of a registered masternode at a given block.
///
/// The `pro_reg_tx_hash` is the stable identity used for equality,
/// ordering and hashing everywhere in the engine; the address only
/// matters to the connection layer. `is_valid` mirrors the registry's
/// ban/pause state; rotation iterates inclusively and ignores it, while
/// connection consumers may filter on it.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MasternodeListEntry {
    pub pro_reg_tx_hash: ProTxHash,
    pub service_address: SocketAddr,
    pub is_valid: bool,
}

impl MasternodeListEntry {
    /// Ranking score of this masternode under a modifier.
    pub fn score(&self, modifier: &QuorumModifierHash) -> ScoreHash {
        ScoreHash::create_score(&self.pro_reg_tx_hash, modifier)
    }
}
