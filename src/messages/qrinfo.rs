//! The `getqrinfo` request and `qrinfo` response.

use std::io;

use crate::consensus::encode::{self, read_compact_size, write_compact_size, Decodable, Encodable};
use crate::hash_types::BlockHash;
use crate::llmq::snapshot::QuorumSnapshot;

/// Requests the rotation information needed to verify quorums formed by
/// the quarter rotation process.
///
/// `base_block_hashes` lists up to four base blocks the requester
/// already knows masternode lists for; an empty list means the requester
/// synced from genesis. The count travels on the wire ahead of the
/// hashes and is validated against them when the request is served.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GetQuorumRotationInfo {
    pub base_block_hashes_count: u32,
    pub base_block_hashes: Vec<BlockHash>,
    pub block_request_hash: BlockHash,
}

impl GetQuorumRotationInfo {
    pub fn new(base_block_hashes: Vec<BlockHash>, block_request_hash: BlockHash) -> Self {
        GetQuorumRotationInfo {
            base_block_hashes_count: base_block_hashes.len() as u32,
            base_block_hashes,
            block_request_hash,
        }
    }
}

impl Encodable for GetQuorumRotationInfo {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = write_compact_size(w, self.base_block_hashes_count as u64)?;
        for hash in &self.base_block_hashes {
            len += hash.consensus_encode(w)?;
        }
        len += self.block_request_hash.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for GetQuorumRotationInfo {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let count = read_compact_size(r)?;
        if count > 64 {
            return Err(encode::Error::ParseFailed("too many base block hashes"));
        }
        let mut base_block_hashes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            base_block_hashes.push(BlockHash::consensus_decode(r)?);
        }
        let block_request_hash = BlockHash::consensus_decode(r)?;
        Ok(GetQuorumRotationInfo {
            base_block_hashes_count: count as u32,
            base_block_hashes,
            block_request_hash,
        })
    }
}

/// An opaque simplified masternode-list diff, produced by the external
/// diff builder. The rotation engine embeds the buffer without
/// interpreting it; only the builder and its light clients know the
/// layout.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MnListDiffBytes(pub Vec<u8>);

impl Encodable for MnListDiffBytes {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        w.write_all(&self.0)?;
        Ok(self.0.len())
    }
}

/// The rotation information for one cycle: the three snapshots needed to
/// reconstruct the inherited quarters plus four masternode-list diffs
/// anchored at the requester's base blocks.
///
/// The response is encode-only: the embedded diffs carry no framing the
/// engine knows about, so decoding belongs to clients that understand
/// the diff format.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QuorumRotationInfo {
    pub creation_height: i32,
    pub quorum_snapshot_at_h_minus_c: QuorumSnapshot,
    pub quorum_snapshot_at_h_minus_2c: QuorumSnapshot,
    pub quorum_snapshot_at_h_minus_3c: QuorumSnapshot,
    pub mn_list_diff_tip: MnListDiffBytes,
    pub mn_list_diff_at_h_minus_c: MnListDiffBytes,
    pub mn_list_diff_at_h_minus_2c: MnListDiffBytes,
    pub mn_list_diff_at_h_minus_3c: MnListDiffBytes,
}

impl Encodable for QuorumRotationInfo {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.creation_height.consensus_encode(w)?;
        len += self.quorum_snapshot_at_h_minus_c.consensus_encode(w)?;
        len += self.quorum_snapshot_at_h_minus_2c.consensus_encode(w)?;
        len += self.quorum_snapshot_at_h_minus_3c.consensus_encode(w)?;
        len += self.mn_list_diff_tip.consensus_encode(w)?;
        len += self.mn_list_diff_at_h_minus_c.consensus_encode(w)?;
        len += self.mn_list_diff_at_h_minus_2c.consensus_encode(w)?;
        len += self.mn_list_diff_at_h_minus_3c.consensus_encode(w)?;
        Ok(len)
    }
}
