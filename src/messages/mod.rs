//! Wire messages for rotation sync.

pub mod qrinfo;

pub use qrinfo::{GetQuorumRotationInfo, MnListDiffBytes, QuorumRotationInfo};
