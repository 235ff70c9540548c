//! Canopy Core Library
//!
//! This is the main library that ties together all Canopy components:
//! - Protocol (packets, wire format, operator commands)
//! - Topology (parent selection, children, liveness)
//! - Routing (role-aware application forwarding)
//!
//! The [`Engine`] runs one node's protocol without doing any I/O: feed it
//! packets, timer expiries and operator commands, and execute the actions
//! it returns.

pub use canopy_protocol as protocol;
pub use canopy_routing as routing;
pub use canopy_topology as topology;

pub mod config;
pub mod engine;
pub mod error;
pub mod status;

pub use config::EngineConfig;
pub use engine::{Engine, NodeSnapshot};
pub use error::{CoreError, Result};
pub use protocol::ProtocolError;
pub use status::status_color;
pub use topology::TopologyError;
