//! Topology error types

use thiserror::Error;

/// Topology-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for topology operations
pub type Result<T> = std::result::Result<T, TopologyError>;
