//! Error types for the rotation engine.

use thiserror::Error;

use crate::hash_types::BlockHash;
use crate::llmq::params::LLMQType;

/// Result alias for engine operations.
pub type RotationResult<T> = Result<T, RotationError>;

/// Result alias for persistent-backend operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Main error type for the rotation engine.
///
/// `Display` renders the single error string that rotation-info
/// responses report to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RotationError {
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("can not find quorum snapshot of type {llmq_type} at block {block_hash}")]
    SnapshotMissing {
        llmq_type: LLMQType,
        block_hash: BlockHash,
    },

    #[error("block {0} not found")]
    UnknownBlock(BlockHash),

    #[error("block {0} is not in the active chain")]
    NotOnActiveChain(BlockHash),

    #[error("chain too young: {found} mined commitments present, {required} required")]
    ChainTooYoung { required: usize, found: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors surfaced by the persistent snapshot backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("corruption detected: {0}")]
    Corruption(String),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<crate::consensus::encode::Error> for RotationError {
    fn from(e: crate::consensus::encode::Error) -> Self {
        RotationError::MalformedSnapshot(e.to_string())
    }
}
