//! Deterministic quorum-connection planning.
//!
//! Every node derives the same connection graph from the same member
//! list, so two members that should be connected agree on who dials
//! whom without coordination.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use hashes::Hash;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::consensus::encode::write_compact_size;
use crate::hash_types::{sha256d_concat, BlockHash, ProTxHash};
use crate::llmq::params::LLMQType;
use crate::masternode::entry::MasternodeListEntry;

/// Deterministically selects which of two masternodes initiates the
/// outbound connection between them.
///
/// Simply taking `min(a, b)` would bias initiation toward masternodes
/// with numerically low hashes, so the initiator is the side whose salted
/// hash `H(min ‖ max ‖ side)` is lower.
pub fn deterministic_outbound_connection(
    pro_tx_hash_1: &ProTxHash,
    pro_tx_hash_2: &ProTxHash,
) -> ProTxHash {
    let (low, high) = if pro_tx_hash_1 < pro_tx_hash_2 {
        (pro_tx_hash_1, pro_tx_hash_2)
    } else {
        (pro_tx_hash_2, pro_tx_hash_1)
    };
    let h1 = sha256d_concat(&[
        &low.to_byte_array(),
        &high.to_byte_array(),
        &pro_tx_hash_1.to_byte_array(),
    ]);
    let h2 = sha256d_concat(&[
        &low.to_byte_array(),
        &high.to_byte_array(),
        &pro_tx_hash_2.to_byte_array(),
    ]);
    if h1 < h2 {
        *pro_tx_hash_1
    } else {
        *pro_tx_hash_2
    }
}

/// Outbound ring-gap peers of the member at `index`: the members at
/// `(index + 2^k) mod n` for `k = 0, 1, …` while `⌊(n−1)/2^k⌋ > 0` or
/// `k ≤ 1`, excluding the member itself.
fn ring_gap_outbound(
    members: &[MasternodeListEntry],
    index: usize,
    pro_tx_hash: &ProTxHash,
) -> BTreeSet<ProTxHash> {
    let mut peers = BTreeSet::new();
    let count = members.len();
    if count < 2 {
        return peers;
    }
    let mut k = 0u32;
    loop {
        let gap_max = (count as u64 - 1) >> k;
        if gap_max == 0 && k > 1 {
            break;
        }
        let gap = 1usize << k;
        let other = &members[(index + gap) % count];
        if other.pro_reg_tx_hash != *pro_tx_hash {
            peers.insert(other.pro_reg_tx_hash);
        }
        k += 1;
    }
    peers
}

/// Relay peers of `for_member` inside a quorum, by the ring-gap scheme.
/// With `only_outbound` the set is limited to connections the member
/// itself initiates; otherwise members that relay *to* it are included
/// as well.
pub fn quorum_relay_members(
    members: &[MasternodeListEntry],
    for_member: &ProTxHash,
    only_outbound: bool,
) -> BTreeSet<ProTxHash> {
    let mut result = BTreeSet::new();
    for (index, member) in members.iter().enumerate() {
        if member.pro_reg_tx_hash == *for_member {
            result.extend(ring_gap_outbound(members, index, for_member));
        } else if !only_outbound {
            let outbound = ring_gap_outbound(members, index, &member.pro_reg_tx_hash);
            if outbound.contains(for_member) {
                result.insert(member.pro_reg_tx_hash);
            }
        }
    }
    result
}

/// Connection set of `for_member` when every pair of quorum members is
/// connected. With `only_outbound` a peer is included only when the
/// deterministic choice makes it the side `for_member` dials.
pub fn quorum_all_connections(
    members: &[MasternodeListEntry],
    for_member: &ProTxHash,
    only_outbound: bool,
) -> BTreeSet<ProTxHash> {
    let mut result = BTreeSet::new();
    for member in members {
        if member.pro_reg_tx_hash == *for_member {
            continue;
        }
        if !only_outbound
            || deterministic_outbound_connection(for_member, &member.pro_reg_tx_hash)
                == member.pro_reg_tx_hash
        {
            result.insert(member.pro_reg_tx_hash);
        }
    }
    result
}

static QWATCH_CONNECTION_SEED: OnceLock<[u8; 32]> = OnceLock::new();

fn qwatch_connection_seed() -> &'static [u8; 32] {
    QWATCH_CONNECTION_SEED.get_or_init(|| {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        seed
    })
}

/// Member indices a non-member watching the quorum probes. The selection
/// chains the platform hash from a per-process random seed, so it is
/// stable within a process but not across nodes.
pub fn quorum_watch_connections(
    llmq_type: LLMQType,
    quorum_block_hash: &BlockHash,
    member_count: usize,
    connection_count: usize,
) -> BTreeSet<usize> {
    let mut result = BTreeSet::new();
    if member_count == 0 {
        return result;
    }
    let mut type_tag = Vec::with_capacity(1);
    write_compact_size(&mut type_tag, llmq_type as u64).expect("writing to a Vec never fails");
    let mut rnd = *qwatch_connection_seed();
    for _ in 0..connection_count {
        rnd = sha256d_concat(&[&rnd, &type_tag, &quorum_block_hash.to_byte_array()]);
        let index = u64::from_le_bytes(rnd[0..8].try_into().expect("slice is 8 bytes"));
        result.insert((index % member_count as u64) as usize);
    }
    result
}
