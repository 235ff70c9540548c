//! Core error types

use canopy_protocol::NodeRole;
use canopy_topology::TopologyError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Capability can only be set on a sensor, node is a {0}")]
    NotASensor(NodeRole),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
