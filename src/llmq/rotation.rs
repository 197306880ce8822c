//! Quarter reconstruction and construction.
//!
//! Membership of a rotated quorum is three quarters inherited from the
//! previous three cycles plus one newly selected quarter. The functions
//! here implement both directions: rebuilding a historic quarter from
//! its persisted snapshot, and selecting a fresh quarter at a new cycle
//! base while emitting the snapshot that lets everyone else rebuild it.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::{RotationError, RotationResult};
use crate::hash_types::{BlockHash, ProTxHash, QuorumModifierHash};
use crate::llmq::params::LLMQParams;
use crate::llmq::snapshot::{MnSkipListMode, QuorumSnapshot};
use crate::masternode::entry::MasternodeListEntry;
use crate::masternode::list::MasternodeList;

/// Result of building the new quarter at a cycle base: one quarter per
/// quorum index plus the snapshot to persist at that block.
#[derive(Clone, Debug)]
pub struct NewQuarterMembers {
    pub quarters: Vec<Vec<MasternodeListEntry>>,
    pub snapshot: QuorumSnapshot,
}

/// Delta-encodes skip list entries the way snapshots store them: the
/// first recorded index travels absolute, every later one as
/// `first − index`. While no skip has been recorded at a nonzero index
/// the encoder keeps writing absolutes, mirroring the decoder's
/// sentinel.
#[derive(Default)]
struct SkipListEncoder {
    first_entry_index: i32,
    entries: Vec<i32>,
}

impl SkipListEncoder {
    fn record(&mut self, index: usize) {
        let index = index as i32;
        if self.first_entry_index == 0 {
            self.first_entry_index = index;
            self.entries.push(index);
        } else {
            self.entries.push(self.first_entry_index - index);
        }
    }

    fn into_entries(self) -> Vec<i32> {
        self.entries
    }
}

/// Decodes a skip list into the set of absolute indices it references.
/// Indices outside `[0, bound)` make the snapshot malformed.
fn decode_skip_list(mn_skip_list: &[i32], bound: usize) -> RotationResult<BTreeSet<usize>> {
    let mut indices = BTreeSet::new();
    let mut first_entry_index: i32 = 0;
    for &entry in mn_skip_list {
        let absolute = if first_entry_index == 0 {
            first_entry_index = entry;
            entry
        } else {
            // entries come straight off the wire; a delta near the i32
            // limits must fail as malformed, not wrap back into range
            first_entry_index.checked_sub(entry).ok_or_else(|| {
                RotationError::MalformedSnapshot(format!(
                    "skip list delta {} relative to first entry {} overflows",
                    entry, first_entry_index
                ))
            })?
        };
        if absolute < 0 || absolute as usize >= bound {
            return Err(RotationError::MalformedSnapshot(format!(
                "skip list references index {} outside the sorted list of {} masternodes",
                absolute, bound
            )));
        }
        indices.insert(absolute as usize);
    }
    Ok(indices)
}

/// Orders the used and unused masternodes by ascending score and
/// concatenates them, non-used first. Skip-list indices are interpreted
/// against exactly this ordering.
fn sorted_combined_masternodes<'a>(
    used: Vec<&'a MasternodeListEntry>,
    unused: Vec<&'a MasternodeListEntry>,
    modifier: &QuorumModifierHash,
) -> Vec<&'a MasternodeListEntry> {
    let sorted_unused = MasternodeList::scores_for_masternodes(unused, modifier);
    let sorted_used = MasternodeList::scores_for_masternodes(used, modifier);
    sorted_unused
        .into_values()
        .chain(sorted_used.into_values())
        .collect()
}

fn slice_quarters(
    entries: &[&MasternodeListEntry],
    quorum_count: usize,
    quarter_size: usize,
) -> RotationResult<Vec<Vec<MasternodeListEntry>>> {
    let needed = quorum_count * quarter_size;
    if entries.len() < needed {
        return Err(RotationError::MalformedSnapshot(format!(
            "{} masternodes remain after applying the skip list, {} needed",
            entries.len(),
            needed
        )));
    }
    Ok(entries[..needed]
        .chunks(quarter_size)
        .map(|chunk| chunk.iter().map(|entry| (*entry).clone()).collect())
        .collect())
}

/// Recovers the quarters produced at `block_hash` from the masternode
/// list at that block and the snapshot persisted there.
pub fn quorum_quarter_members_by_snapshot(
    params: &LLMQParams,
    block_hash: &BlockHash,
    masternode_list: &MasternodeList,
    snapshot: &QuorumSnapshot,
) -> RotationResult<Vec<Vec<MasternodeListEntry>>> {
    let quorum_count = params.signing_active_quorum_count as usize;
    let quarter_size = params.quarter_size();
    let modifier = QuorumModifierHash::for_block(params.quorum_type, block_hash);
    let (used, unused) = masternode_list.used_and_unused_for_snapshot(snapshot)?;
    let sorted_combined = sorted_combined_masternodes(used, unused, &modifier);

    match snapshot.mn_skip_list_mode {
        MnSkipListMode::NoSkipping => {
            slice_quarters(&sorted_combined, quorum_count, quarter_size)
        }
        MnSkipListMode::SkippingEntries => {
            let skipped = decode_skip_list(&snapshot.mn_skip_list, sorted_combined.len())?;
            let remaining: Vec<&MasternodeListEntry> = sorted_combined
                .iter()
                .enumerate()
                .filter(|(index, _)| !skipped.contains(index))
                .map(|(_, entry)| *entry)
                .collect();
            slice_quarters(&remaining, quorum_count, quarter_size)
        }
        MnSkipListMode::NoSkippingEntries => {
            let kept = decode_skip_list(&snapshot.mn_skip_list, sorted_combined.len())?;
            // stable partition: kept entries first, both groups in their
            // original relative order, then slice the whole list
            let (mut front, rest): (Vec<(usize, &MasternodeListEntry)>, Vec<_>) = sorted_combined
                .iter()
                .enumerate()
                .map(|(index, entry)| (index, *entry))
                .partition(|(index, _)| kept.contains(index));
            front.extend(rest);
            let partitioned: Vec<&MasternodeListEntry> =
                front.into_iter().map(|(_, entry)| entry).collect();
            slice_quarters(&partitioned, quorum_count, quarter_size)
        }
        MnSkipListMode::AllSkipped => Ok(vec![Vec::new(); quorum_count]),
    }
}

/// Selects the new quarter for every quorum index at a cycle base block
/// and emits the snapshot describing the selection.
///
/// `previous_quarters` are the reconstructed quarters of the three
/// preceding cycles; a missing ancestor snapshot is represented by empty
/// quarters. The pass is a single deterministic cursor over the
/// score-sorted list; if it ends before every quarter is full the cycle
/// is unrecoverable at this type and an `AllSkipped` snapshot is
/// emitted.
pub fn build_new_quorum_quarter_members(
    params: &LLMQParams,
    block_hash: &BlockHash,
    masternode_list: &MasternodeList,
    previous_quarters: [&Vec<Vec<MasternodeListEntry>>; 3],
) -> NewQuarterMembers {
    let quorum_count = params.signing_active_quorum_count as usize;
    let quarter_size = params.quarter_size();
    let needed = quorum_count * quarter_size;
    let modifier = QuorumModifierHash::for_block(params.quorum_type, block_hash);

    let (used, unused) = masternode_list.usage_info(previous_quarters);
    let used_hashes: BTreeSet<ProTxHash> =
        used.iter().map(|entry| entry.pro_reg_tx_hash).collect();
    let used_count = used.len();
    let sorted_combined = sorted_combined_masternodes(used, unused, &modifier);

    let active_quorum_members: Vec<bool> = masternode_list
        .masternodes_inclusive()
        .map(|entry| used_hashes.contains(&entry.pro_reg_tx_hash))
        .collect();

    let mut selected: Vec<&MasternodeListEntry> = Vec::with_capacity(needed);
    let mut encoder = SkipListEncoder::default();

    let mode = if used_count == 0 {
        selected.extend(sorted_combined.iter().take(needed).copied());
        MnSkipListMode::NoSkipping
    } else if used_count < sorted_combined.len() / 2 {
        // few used nodes: record the entries that get skipped
        for (index, &entry) in sorted_combined.iter().enumerate() {
            if selected.len() == needed {
                break;
            }
            if used_hashes.contains(&entry.pro_reg_tx_hash) {
                encoder.record(index);
            } else {
                selected.push(entry);
            }
        }
        MnSkipListMode::SkippingEntries
    } else {
        // used nodes dominate: record the entries that are kept
        for (index, &entry) in sorted_combined.iter().enumerate() {
            if selected.len() == needed {
                break;
            }
            if used_hashes.contains(&entry.pro_reg_tx_hash) {
                encoder.record(index);
                selected.push(entry);
            }
        }
        MnSkipListMode::NoSkippingEntries
    };

    if selected.len() < needed {
        warn!(
            llmq_type = %params.quorum_type,
            block = %block_hash,
            selected = selected.len(),
            needed,
            "not enough masternodes to fill the new quorum quarters, emitting an all-skipped snapshot"
        );
        return NewQuarterMembers {
            quarters: vec![Vec::new(); quorum_count],
            snapshot: QuorumSnapshot {
                mn_skip_list_mode: MnSkipListMode::AllSkipped,
                active_quorum_members,
                mn_skip_list: Vec::new(),
            },
        };
    }

    debug!(
        llmq_type = %params.quorum_type,
        block = %block_hash,
        mode = ?mode,
        used = used_count,
        "built new quorum quarter members"
    );

    NewQuarterMembers {
        quarters: selected
            .chunks(quarter_size)
            .map(|chunk| chunk.iter().map(|entry| (*entry).clone()).collect())
            .collect(),
        snapshot: QuorumSnapshot {
            mn_skip_list_mode: mode,
            active_quorum_members,
            mn_skip_list: encoder.into_entries(),
        },
    }
}
