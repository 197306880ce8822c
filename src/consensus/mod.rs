//! Consensus-critical serialization.

pub mod encode;

pub use encode::{Decodable, Encodable};
