//! Rotating quorum membership engine.
//!
//! Every `dkg_interval` blocks a masternode network must select, on
//! every node identically, the subsets of masternodes forming the
//! signing quorums of a rotation-enabled quorum type. This library
//! implements that selection and everything around it:
//!
//! - The quarter rotation algorithm: each cycle's quorums keep three
//!   quarters inherited from the previous three cycles and introduce one
//!   newly selected quarter drawn from the masternodes not already
//!   placed.
//! - Quorum snapshots: the compact bit-set plus skip-list record emitted
//!   at every cycle base, with its bit-exact wire and disk codec, from
//!   which any node can rebuild a historic quarter.
//! - The snapshot store: a per-type LRU cache over a persistent
//!   key-value backend under the `llmq_S` namespace.
//! - The two-tier membership cache keyed by quorum block and by
//!   `(cycle base, quorum index)`.
//! - Rotation-info assembly: the `getqrinfo`/`qrinfo` exchange that
//!   packages three snapshots and four masternode-list diffs for light
//!   clients.
//! - Deterministic quorum-connection planning: outbound-initiator
//!   selection, ring-gap relay sets and watch-probe sets.
//!
//! The chain, the masternode registry, the commitment index and the
//! diff builder stay outside; the engine reads them through the traits
//! in [`chain`]. Everything the engine derives is a pure function of
//! chain state: any divergence between nodes is a chain fork, not a
//! quorum-layer concern.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dash_quorum_rotation::chain::NoopQuorumIndexObserver;
//! use dash_quorum_rotation::store::MemorySnapshotBackend;
//! use dash_quorum_rotation::{QuorumRotationEngine, RotationConfig};
//! # fn providers() -> (
//! #     Arc<dyn dash_quorum_rotation::chain::ChainSource>,
//! #     Arc<dyn dash_quorum_rotation::chain::MasternodeListProvider>,
//! #     Arc<dyn dash_quorum_rotation::chain::CommitmentProvider>,
//! #     Arc<dyn dash_quorum_rotation::chain::MnListDiffBuilder>,
//! # ) { unimplemented!() }
//!
//! let (chain, masternode_lists, commitments, diff_builder) = providers();
//! let engine = QuorumRotationEngine::new(
//!     RotationConfig::mainnet(),
//!     chain,
//!     masternode_lists,
//!     commitments,
//!     diff_builder,
//!     Arc::new(NoopQuorumIndexObserver),
//!     Arc::new(MemorySnapshotBackend::new()),
//! );
//! let members = engine.quorum_members_for_block(
//!     RotationConfig::mainnet().rotation_llmq_type,
//!     &"000000000000001baf41c7654bb6b7e50e9f0403839666ac2474a1d2b1a0ee51"
//!         .parse()
//!         .expect("valid block hash"),
//! );
//! # let _ = members;
//! ```

pub mod cache;
pub mod chain;
pub mod config;
pub mod consensus;
pub mod engine;
pub mod error;
pub mod hash_types;
pub mod llmq;
pub mod masternode;
pub mod messages;
pub mod store;

pub use config::RotationConfig;
pub use engine::QuorumRotationEngine;
pub use error::{RotationError, RotationResult, StorageError};
pub use hash_types::{BlockHash, ProTxHash, QuorumHash, QuorumModifierHash, ScoreHash};
pub use llmq::{LLMQParams, LLMQType, MnSkipListMode, QuorumSnapshot};
pub use masternode::{MasternodeList, MasternodeListEntry};
pub use messages::{GetQuorumRotationInfo, MnListDiffBytes, QuorumRotationInfo};
