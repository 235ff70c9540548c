//! Error types for protocol operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Frame too short: {size} bytes (need {min})")]
    FrameTooShort { size: usize, min: usize },

    #[error("Invalid node role: {0}")]
    InvalidRole(i32),

    #[error("Invalid message category: {0}")]
    InvalidMessageCategory(i32),

    #[error("Invalid application category: {0}")]
    InvalidAppCategory(i32),

    #[error("Invalid sensor capability: {0}")]
    InvalidCapability(i32),

    #[error("Invalid node address: {0}")]
    InvalidAddress(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
}
