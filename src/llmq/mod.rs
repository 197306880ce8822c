//! Long-living masternode quorums: parameters, snapshots and the
//! rotation machinery.

pub mod connections;
mod info_builder;
pub mod member_cache;
pub mod params;
pub mod rotation;
pub mod snapshot;
pub mod snapshot_manager;

pub use params::{DKGParams, LLMQParams, LLMQType};
pub use snapshot::{MnSkipListMode, QuorumSnapshot};
pub use snapshot_manager::QuorumSnapshotManager;
