//! Hash types used throughout the engine.
//!
//! This module defines newtypes for hashes so that data of the same hash
//! format but different meaning (block hashes, masternode identifiers,
//! ranking scores) cannot be mixed up.

use hashes::{hash_newtype, sha256d, Hash};

use crate::consensus::encode::{self, write_compact_size, Decodable, Encodable};
use crate::llmq::params::LLMQType;

hash_newtype! {
    /// A block hash.
    pub struct BlockHash(sha256d::Hash);

    /// The provider-registration transaction hash identifying a
    /// registered masternode. Ordered by unsigned big-endian comparison
    /// of the raw bytes.
    #[hash_newtype(forward)]
    pub struct ProTxHash(sha256d::Hash);

    /// The deterministic salt modulating quorum member ordering.
    pub struct QuorumModifierHash(sha256d::Hash);

    /// The ranking score of a masternode under a modifier.
    pub struct ScoreHash(sha256d::Hash);

    /// The salted lookup key of a stored quorum snapshot.
    pub struct SnapshotHash(sha256d::Hash);
}

/// A hash used to identify a quorum; quorums are identified by the hash
/// of their cycle-relative base block.
pub type QuorumHash = BlockHash;

macro_rules! impl_hashencode {
    ($hashtype:ident) => {
        impl Encodable for $hashtype {
            fn consensus_encode<W: std::io::Write + ?Sized>(
                &self,
                w: &mut W,
            ) -> Result<usize, std::io::Error> {
                self.to_byte_array().consensus_encode(w)
            }
        }

        impl Decodable for $hashtype {
            fn consensus_decode<R: std::io::Read + ?Sized>(
                r: &mut R,
            ) -> Result<Self, encode::Error> {
                Ok(Self::from_byte_array(<[u8; 32]>::consensus_decode(r)?))
            }
        }
    };
}

impl_hashencode!(BlockHash);
impl_hashencode!(ProTxHash);
impl_hashencode!(QuorumModifierHash);
impl_hashencode!(ScoreHash);
impl_hashencode!(SnapshotHash);

/// Double-SHA256 over the concatenation of the given parts.
pub(crate) fn sha256d_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
    for part in parts {
        buf.extend_from_slice(part);
    }
    sha256d::Hash::hash(&buf).to_byte_array()
}

impl QuorumModifierHash {
    /// Builds the modifier for a quorum type at a block:
    /// `H(compact_size(llmq_type) ‖ block_hash)`.
    pub fn for_block(llmq_type: LLMQType, block_hash: &BlockHash) -> Self {
        let mut writer = Vec::with_capacity(33);
        write_compact_size(&mut writer, llmq_type as u64)
            .expect("writing to a Vec never fails");
        writer.extend_from_slice(&block_hash.to_byte_array());
        QuorumModifierHash::from_byte_array(sha256d_concat(&[&writer]))
    }
}

impl ScoreHash {
    /// Creates the ranking score of a masternode under a modifier:
    /// `H(pro_tx_hash ‖ modifier)`.
    pub fn create_score(pro_tx_hash: &ProTxHash, modifier: &QuorumModifierHash) -> Self {
        ScoreHash::from_byte_array(sha256d_concat(&[
            &pro_tx_hash.to_byte_array(),
            &modifier.to_byte_array(),
        ]))
    }
}

impl SnapshotHash {
    /// Builds the salted store key of a snapshot:
    /// `H(compact_size(llmq_type) ‖ block_hash)`.
    pub fn for_snapshot(llmq_type: LLMQType, block_hash: &BlockHash) -> Self {
        let mut writer = Vec::with_capacity(33);
        write_compact_size(&mut writer, llmq_type as u64)
            .expect("writing to a Vec never fails");
        writer.extend_from_slice(&block_hash.to_byte_array());
        SnapshotHash::from_byte_array(sha256d_concat(&[&writer]))
    }
}
