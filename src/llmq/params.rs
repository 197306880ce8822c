//! LLMQ types and their immutable parameters.

use std::fmt::{Display, Formatter};
use std::io;

use crate::consensus::encode::{self, Decodable, Encodable};

/// Parameters of the DKG phase of a quorum type. The `interval` is the
/// cycle length: the number of blocks between consecutive quorum-base
/// blocks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct DKGParams {
    pub interval: u32,
    pub phase_blocks: u32,
    pub mining_window_start: u32,
    pub mining_window_end: u32,
    pub bad_votes_threshold: u32,
}

/// Immutable parameters of a quorum type.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct LLMQParams {
    pub quorum_type: LLMQType,
    pub name: &'static str,
    pub size: u32,
    pub min_size: u32,
    pub threshold: u32,
    pub dkg_params: DKGParams,
    pub signing_active_quorum_count: u32,
    pub keep_old_connections: u32,
    pub recovery_members: u32,
}

impl LLMQParams {
    /// Number of members newly introduced per cycle.
    pub fn quarter_size(&self) -> usize {
        (self.size / 4) as usize
    }
}

pub const DKG_TEST: DKGParams = DKGParams {
    interval: 4,
    phase_blocks: 2,
    mining_window_start: 2,
    mining_window_end: 3,
    bad_votes_threshold: 2,
};

pub const DKG_TEST_DIP0024: DKGParams = DKGParams {
    interval: 8,
    phase_blocks: 2,
    mining_window_start: 2,
    mining_window_end: 6,
    bad_votes_threshold: 2,
};

pub const DKG_DEVNET_DIP0024: DKGParams = DKGParams {
    interval: 48,
    phase_blocks: 2,
    mining_window_start: 10,
    mining_window_end: 18,
    bad_votes_threshold: 7,
};

pub const DKG_50_60: DKGParams = DKGParams {
    interval: 24,
    phase_blocks: 2,
    mining_window_start: 10,
    mining_window_end: 18,
    bad_votes_threshold: 40,
};

pub const DKG_60_75: DKGParams = DKGParams {
    interval: 24 * 12,
    phase_blocks: 2,
    mining_window_start: 42,
    mining_window_end: 50,
    bad_votes_threshold: 48,
};

pub const DKG_100_67: DKGParams = DKGParams {
    interval: 24,
    phase_blocks: 2,
    mining_window_start: 10,
    mining_window_end: 18,
    bad_votes_threshold: 80,
};

pub const DKG_400_60: DKGParams = DKGParams {
    interval: 24 * 12,
    phase_blocks: 4,
    mining_window_start: 20,
    mining_window_end: 28,
    bad_votes_threshold: 300,
};

pub const DKG_400_85: DKGParams = DKGParams {
    interval: 24 * 24,
    phase_blocks: 4,
    mining_window_start: 20,
    mining_window_end: 48,
    bad_votes_threshold: 300,
};

pub const LLMQ_TEST_INSTANT_SEND: LLMQParams = LLMQParams {
    quorum_type: LLMQType::LlmqtypeTestInstantSend,
    name: "llmq_test_instantsend",
    size: 4,
    min_size: 2,
    threshold: 3,
    dkg_params: DKG_TEST,
    signing_active_quorum_count: 1,
    keep_old_connections: 2,
    recovery_members: 3,
};

pub const LLMQ_TEST_DIP0024: LLMQParams = LLMQParams {
    quorum_type: LLMQType::LlmqtypeTestDIP0024,
    name: "llmq_test_dip0024",
    size: 8,
    min_size: 6,
    threshold: 4,
    dkg_params: DKG_TEST_DIP0024,
    signing_active_quorum_count: 1,
    keep_old_connections: 4,
    recovery_members: 4,
};

pub const LLMQ_DEVNET_DIP0024: LLMQParams = LLMQParams {
    quorum_type: LLMQType::LlmqtypeDevnetDIP0024,
    name: "llmq_devnet_dip0024",
    size: 8,
    min_size: 6,
    threshold: 4,
    dkg_params: DKG_DEVNET_DIP0024,
    signing_active_quorum_count: 2,
    keep_old_connections: 4,
    recovery_members: 4,
};

pub const LLMQ_50_60: LLMQParams = LLMQParams {
    quorum_type: LLMQType::Llmqtype50_60,
    name: "llmq_50_60",
    size: 50,
    min_size: 40,
    threshold: 30,
    dkg_params: DKG_50_60,
    signing_active_quorum_count: 24,
    keep_old_connections: 25,
    recovery_members: 25,
};

pub const LLMQ_60_75: LLMQParams = LLMQParams {
    quorum_type: LLMQType::Llmqtype60_75,
    name: "llmq_60_75",
    size: 60,
    min_size: 50,
    threshold: 45,
    dkg_params: DKG_60_75,
    signing_active_quorum_count: 32,
    keep_old_connections: 25,
    recovery_members: 25,
};

pub const LLMQ_100_67: LLMQParams = LLMQParams {
    quorum_type: LLMQType::Llmqtype100_67,
    name: "llmq_100_67",
    size: 100,
    min_size: 80,
    threshold: 67,
    dkg_params: DKG_100_67,
    signing_active_quorum_count: 24,
    keep_old_connections: 25,
    recovery_members: 50,
};

pub const LLMQ_400_60: LLMQParams = LLMQParams {
    quorum_type: LLMQType::Llmqtype400_60,
    name: "llmq_400_60",
    size: 400,
    min_size: 300,
    threshold: 240,
    dkg_params: DKG_400_60,
    signing_active_quorum_count: 4,
    keep_old_connections: 5,
    recovery_members: 100,
};

pub const LLMQ_400_85: LLMQParams = LLMQParams {
    quorum_type: LLMQType::Llmqtype400_85,
    name: "llmq_400_85",
    size: 400,
    min_size: 350,
    threshold: 340,
    dkg_params: DKG_400_85,
    signing_active_quorum_count: 4,
    keep_old_connections: 5,
    recovery_members: 100,
};

/// Identifier of a quorum class.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum LLMQType {
    Llmqtype50_60 = 1,
    Llmqtype400_60 = 2,
    Llmqtype400_85 = 3,
    Llmqtype100_67 = 4,
    Llmqtype60_75 = 5,
    LlmqtypeTestDIP0024 = 103,
    LlmqtypeTestInstantSend = 104,
    LlmqtypeDevnetDIP0024 = 105,
}

impl LLMQType {
    /// Immutable parameters of this quorum type.
    pub fn params(&self) -> LLMQParams {
        match self {
            LLMQType::Llmqtype50_60 => LLMQ_50_60,
            LLMQType::Llmqtype400_60 => LLMQ_400_60,
            LLMQType::Llmqtype400_85 => LLMQ_400_85,
            LLMQType::Llmqtype100_67 => LLMQ_100_67,
            LLMQType::Llmqtype60_75 => LLMQ_60_75,
            LLMQType::LlmqtypeTestDIP0024 => LLMQ_TEST_DIP0024,
            LLMQType::LlmqtypeTestInstantSend => LLMQ_TEST_INSTANT_SEND,
            LLMQType::LlmqtypeDevnetDIP0024 => LLMQ_DEVNET_DIP0024,
        }
    }

    /// Whether membership for this type is derived by quarter rotation.
    pub fn is_rotated(&self) -> bool {
        matches!(
            self,
            LLMQType::Llmqtype60_75
                | LLMQType::LlmqtypeTestDIP0024
                | LLMQType::LlmqtypeTestInstantSend
                | LLMQType::LlmqtypeDevnetDIP0024
        )
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(LLMQType::Llmqtype50_60),
            2 => Some(LLMQType::Llmqtype400_60),
            3 => Some(LLMQType::Llmqtype400_85),
            4 => Some(LLMQType::Llmqtype100_67),
            5 => Some(LLMQType::Llmqtype60_75),
            103 => Some(LLMQType::LlmqtypeTestDIP0024),
            104 => Some(LLMQType::LlmqtypeTestInstantSend),
            105 => Some(LLMQType::LlmqtypeDevnetDIP0024),
            _ => None,
        }
    }
}

impl Display for LLMQType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.params().name)
    }
}

impl Encodable for LLMQType {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        (*self as u8).consensus_encode(w)
    }
}

impl Decodable for LLMQType {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let value = u8::consensus_decode(r)?;
        LLMQType::from_u8(value).ok_or(encode::Error::ParseFailed("unknown LLMQ type"))
    }
}
