//! Node error types

use canopy_core::CoreError;
use canopy_protocol::{NodeAddress, ProtocolError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Node {0} is not attached to the medium")]
    NotAttached(NodeAddress),

    #[error("Node {0} is already attached to the medium")]
    AlreadyAttached(NodeAddress),

    #[error("Unknown node: {0}")]
    UnknownNode(NodeAddress),

    #[error("Node task has stopped")]
    HandleClosed,

    #[error("Invalid deployment: {0}")]
    InvalidDeployment(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, NodeError>;
