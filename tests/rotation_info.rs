//! Rotation-info assembly scenarios.

mod common;

use std::sync::Arc;

use common::{block_hash_at, engine_over, masternode, TestChain};
use dash_quorum_rotation::consensus::encode::serialize;
use dash_quorum_rotation::hash_types::BlockHash;
use dash_quorum_rotation::llmq::params::LLMQType;
use dash_quorum_rotation::masternode::MasternodeListEntry;
use dash_quorum_rotation::messages::{GetQuorumRotationInfo, MnListDiffBytes};
use dash_quorum_rotation::{QuorumRotationEngine, RotationError};
use hashes::Hash;

const ROTATED: LLMQType = LLMQType::LlmqtypeTestDIP0024; // size 8, cycle 8

fn diff_anchors(diff: &MnListDiffBytes) -> (BlockHash, BlockHash) {
    let mut base = [0u8; 32];
    let mut target = [0u8; 32];
    base.copy_from_slice(&diff.0[0..32]);
    target.copy_from_slice(&diff.0[32..64]);
    (BlockHash::from_byte_array(base), BlockHash::from_byte_array(target))
}

/// A chain with `cycles` completed rotation cycles, snapshots persisted
/// and commitments mined at every cycle base.
fn chain_with_cycles(height: u32, cycles: u32) -> (Arc<TestChain>, QuorumRotationEngine) {
    let masternodes: Vec<MasternodeListEntry> = (1..=20).map(masternode).collect();
    let chain = Arc::new(TestChain::new(height, masternodes));
    let (engine, _, _) = engine_over(Arc::clone(&chain), ROTATED);
    for cycle in 0..cycles {
        let base_height = cycle * 8;
        engine.quorum_members_at_cycle(ROTATED, &block_hash_at(base_height)).unwrap();
        chain.add_commitment(ROTATED, base_height);
    }
    (chain, engine)
}

#[test]
fn response_packages_snapshots_and_diffs() {
    let (_chain, engine) = chain_with_cycles(40, 4); // bases 0, 8, 16, 24
    let tip = block_hash_at(40);

    let request = GetQuorumRotationInfo::new(vec![], tip);
    let response = engine.build_quorum_rotation_info(&request).unwrap();

    // H is the most recent commitment at or before the requested block
    assert_eq!(response.creation_height, 24);

    // the three snapshots are the stored ones at H-c, H-2c, H-3c
    for (snapshot, height) in [
        (&response.quorum_snapshot_at_h_minus_c, 16u32),
        (&response.quorum_snapshot_at_h_minus_2c, 8),
        (&response.quorum_snapshot_at_h_minus_3c, 0),
    ] {
        let stored = engine
            .snapshot_manager()
            .get_snapshot_for_block(ROTATED, &block_hash_at(height))
            .unwrap()
            .expect("snapshot stored while driving cycles");
        assert_eq!(snapshot, &stored, "snapshot mismatch at height {}", height);
    }

    // with no known bases every diff is anchored at genesis
    let genesis = block_hash_at(0);
    assert_eq!(diff_anchors(&response.mn_list_diff_tip), (genesis, tip));
    assert_eq!(
        diff_anchors(&response.mn_list_diff_at_h_minus_c),
        (genesis, block_hash_at(16))
    );
    assert_eq!(
        diff_anchors(&response.mn_list_diff_at_h_minus_2c),
        (genesis, block_hash_at(8))
    );
    assert_eq!(
        diff_anchors(&response.mn_list_diff_at_h_minus_3c),
        (genesis, block_hash_at(0))
    );

    // the response encodes, creation height first
    let bytes = serialize(&response);
    assert_eq!(&bytes[0..4], &24i32.to_le_bytes());
}

#[test]
fn known_bases_anchor_the_diffs() {
    let (_chain, engine) = chain_with_cycles(40, 4);
    let tip = block_hash_at(40);

    // the requester already knows the lists at heights 8 and 16
    let request =
        GetQuorumRotationInfo::new(vec![block_hash_at(16), block_hash_at(8)], tip);
    let response = engine.build_quorum_rotation_info(&request).unwrap();

    // the tip diff always starts at the highest base
    assert_eq!(diff_anchors(&response.mn_list_diff_tip), (block_hash_at(16), tip));
    // H-c = 16: the base at 16 is not above it
    assert_eq!(
        diff_anchors(&response.mn_list_diff_at_h_minus_c),
        (block_hash_at(16), block_hash_at(16))
    );
    // H-2c = 8
    assert_eq!(
        diff_anchors(&response.mn_list_diff_at_h_minus_2c),
        (block_hash_at(8), block_hash_at(8))
    );
    // H-3c = 0: every base is younger, the anchor degrades to zero
    assert_eq!(
        diff_anchors(&response.mn_list_diff_at_h_minus_3c),
        (BlockHash::all_zeros(), block_hash_at(0))
    );
}

#[test]
fn three_commitments_are_too_few() {
    let (_chain, engine) = chain_with_cycles(40, 3); // bases 0, 8, 16 only
    let request = GetQuorumRotationInfo::new(vec![], block_hash_at(40));
    assert_eq!(
        engine.build_quorum_rotation_info(&request),
        Err(RotationError::ChainTooYoung { required: 4, found: 3 })
    );
}

#[test]
fn commitments_are_counted_at_the_requested_block() {
    let (_chain, engine) = chain_with_cycles(40, 4);
    // at height 20 only the commitments at 0, 8 and 16 are mined
    let request = GetQuorumRotationInfo::new(vec![], block_hash_at(20));
    assert_eq!(
        engine.build_quorum_rotation_info(&request),
        Err(RotationError::ChainTooYoung { required: 4, found: 3 })
    );
}

#[test]
fn missing_snapshot_is_an_error() {
    let masternodes: Vec<MasternodeListEntry> = (1..=20).map(masternode).collect();
    let chain = Arc::new(TestChain::new(40, masternodes));
    // commitments exist but no engine ever derived the cycles, so the
    // snapshot store is empty
    for cycle in 0..4 {
        chain.add_commitment(ROTATED, cycle * 8);
    }
    let (engine, _, _) = engine_over(Arc::clone(&chain), ROTATED);
    let request = GetQuorumRotationInfo::new(vec![], block_hash_at(40));
    assert_eq!(
        engine.build_quorum_rotation_info(&request),
        Err(RotationError::SnapshotMissing {
            llmq_type: ROTATED,
            block_hash: block_hash_at(16),
        })
    );
}

#[test]
fn request_validation() {
    let (chain, engine) = chain_with_cycles(40, 4);
    let tip = block_hash_at(40);

    // more than four bases
    let request = GetQuorumRotationInfo::new((0..5).map(block_hash_at).collect(), tip);
    assert!(matches!(
        engine.build_quorum_rotation_info(&request),
        Err(RotationError::InvalidRequest(_))
    ));

    // count disagreeing with the hashes present
    let request = GetQuorumRotationInfo {
        base_block_hashes_count: 2,
        base_block_hashes: vec![block_hash_at(8)],
        block_request_hash: tip,
    };
    assert!(matches!(
        engine.build_quorum_rotation_info(&request),
        Err(RotationError::InvalidRequest(_))
    ));

    // a base block the index does not know
    let unknown = BlockHash::from_byte_array([0xEE; 32]);
    let request = GetQuorumRotationInfo::new(vec![unknown], tip);
    assert_eq!(
        engine.build_quorum_rotation_info(&request),
        Err(RotationError::UnknownBlock(unknown))
    );

    // a base block on a discarded fork
    let side = chain.add_side_block(0xDD, 12);
    let request = GetQuorumRotationInfo::new(vec![side], tip);
    assert_eq!(
        engine.build_quorum_rotation_info(&request),
        Err(RotationError::NotOnActiveChain(side))
    );

    // an unknown request block
    let request = GetQuorumRotationInfo::new(vec![], unknown);
    assert_eq!(
        engine.build_quorum_rotation_info(&request),
        Err(RotationError::UnknownBlock(unknown))
    );
}
