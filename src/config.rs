//! Engine configuration.

use crate::llmq::params::LLMQType;

/// Configuration of the rotation engine. Constructed once at system
/// start and handed to the engine; nothing here is read from globals.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RotationConfig {
    /// The quorum type rotation-info responses are served for. Quorum
    /// rotation is enabled for the InstantSend quorum type.
    pub rotation_llmq_type: LLMQType,
}

impl RotationConfig {
    pub fn new(rotation_llmq_type: LLMQType) -> Self {
        RotationConfig { rotation_llmq_type }
    }

    /// Production configuration: the DIP-24 InstantSend type.
    pub fn mainnet() -> Self {
        Self::new(LLMQType::Llmqtype60_75)
    }

    /// Devnet configuration.
    pub fn devnet() -> Self {
        Self::new(LLMQType::LlmqtypeDevnetDIP0024)
    }
}
