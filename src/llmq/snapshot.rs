//! Quorum snapshots.
//!
//! A snapshot is the compact record emitted at every cycle base which,
//! together with the masternode list at that block, deterministically
//! reconstructs the quarter of members the cycle introduced.

use std::fmt;
use std::io;

use crate::consensus::encode::{
    self, read_compact_size, read_fixed_bitset, write_compact_size, write_fixed_bitset, Decodable,
    Encodable,
};

/// Interpretation of the skip list carried by a snapshot.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum MnSkipListMode {
    /// The skip list is empty; quarters are sliced straight off the
    /// sorted list.
    #[default]
    NoSkipping = 0,
    /// The skip list holds the entries that must be removed before
    /// slicing.
    SkippingEntries = 1,
    /// The skip list holds the entries that are kept.
    NoSkippingEntries = 2,
    /// Every node was skipped; the cycle produced no quarter.
    AllSkipped = 3,
}

impl Encodable for MnSkipListMode {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        (*self as i32).consensus_encode(w)
    }
}

impl Decodable for MnSkipListMode {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        match i32::consensus_decode(r)? {
            0 => Ok(MnSkipListMode::NoSkipping),
            1 => Ok(MnSkipListMode::SkippingEntries),
            2 => Ok(MnSkipListMode::NoSkippingEntries),
            3 => Ok(MnSkipListMode::AllSkipped),
            _ => Err(encode::Error::ParseFailed("invalid skip list mode")),
        }
    }
}

/// A snapshot of quarter usage at a cycle base block.
///
/// `active_quorum_members` has one bit per masternode in the canonical
/// list order at the anchoring block; bit `i` is set iff that masternode
/// was already placed in one of the three inherited quarters when the
/// new quarter was built.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct QuorumSnapshot {
    pub mn_skip_list_mode: MnSkipListMode,
    pub active_quorum_members: Vec<bool>,
    pub mn_skip_list: Vec<i32>,
}

impl Encodable for QuorumSnapshot {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.mn_skip_list_mode.consensus_encode(w)?;
        len += write_compact_size(w, self.active_quorum_members.len() as u64)?;
        len += write_fixed_bitset(w, &self.active_quorum_members)?;
        len += self.mn_skip_list.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for QuorumSnapshot {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let mn_skip_list_mode = MnSkipListMode::consensus_decode(r)?;
        let member_count = read_compact_size(r)?;
        let active_quorum_members = read_fixed_bitset(r, member_count as usize)?;
        let mn_skip_list = Vec::consensus_decode(r)?;
        Ok(QuorumSnapshot {
            mn_skip_list_mode,
            active_quorum_members,
            mn_skip_list,
        })
    }
}

impl fmt::Debug for QuorumSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bitset = vec![0u8; (self.active_quorum_members.len() + 7) / 8];
        for (i, bit) in self.active_quorum_members.iter().enumerate() {
            if *bit {
                bitset[i / 8] |= 1 << (i % 8);
            }
        }
        f.debug_struct("QuorumSnapshot")
            .field("mn_skip_list_mode", &self.mn_skip_list_mode)
            .field("member_count", &self.active_quorum_members.len())
            .field(
                "active_quorum_members",
                &bitset.iter().map(|b| format!("{:02x}", b)).collect::<String>(),
            )
            .field("mn_skip_list", &self.mn_skip_list)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::encode::{deserialize, serialize};

    fn round_trip(snapshot: &QuorumSnapshot) {
        let bytes = serialize(snapshot);
        let decoded: QuorumSnapshot = deserialize(&bytes).unwrap();
        assert_eq!(&decoded, snapshot);
        assert_eq!(serialize(&decoded), bytes);
    }

    #[test]
    fn codec_round_trip() {
        round_trip(&QuorumSnapshot::default());
        round_trip(&QuorumSnapshot {
            mn_skip_list_mode: MnSkipListMode::SkippingEntries,
            active_quorum_members: (0..19).map(|i| i % 2 == 0).collect(),
            mn_skip_list: vec![4, -1, -3],
        });
        round_trip(&QuorumSnapshot {
            mn_skip_list_mode: MnSkipListMode::NoSkippingEntries,
            active_quorum_members: vec![true; 400],
            mn_skip_list: (0..50).map(|i| 50 - i).collect(),
        });
        round_trip(&QuorumSnapshot {
            mn_skip_list_mode: MnSkipListMode::AllSkipped,
            active_quorum_members: vec![false; 1],
            mn_skip_list: vec![],
        });
    }

    #[test]
    fn serialization_fixture() {
        // active bits 0b10110010 (bit 0 first), mode 1, skip list [2, -1]
        let snapshot = QuorumSnapshot {
            mn_skip_list_mode: MnSkipListMode::SkippingEntries,
            active_quorum_members: vec![true, false, true, true, false, false, true, false],
            mn_skip_list: vec![2, -1],
        };
        let expected = hex::decode("01000000084d0202000000ffffffff").unwrap();
        assert_eq!(serialize(&snapshot), expected);
    }

    #[test]
    fn invalid_mode_is_rejected() {
        let mut bytes = serialize(&QuorumSnapshot::default());
        bytes[0] = 7;
        assert!(deserialize::<QuorumSnapshot>(&bytes).is_err());
    }

    #[test]
    fn bitset_length_is_preserved() {
        for size in [0usize, 1, 7, 8, 9, 63, 64, 65] {
            let snapshot = QuorumSnapshot {
                mn_skip_list_mode: MnSkipListMode::NoSkipping,
                active_quorum_members: vec![true; size],
                mn_skip_list: vec![],
            };
            let decoded: QuorumSnapshot = deserialize(&serialize(&snapshot)).unwrap();
            assert_eq!(decoded.active_quorum_members.len(), size);
        }
    }
}
