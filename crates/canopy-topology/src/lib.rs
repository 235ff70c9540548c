//! Canopy Topology
//!
//! This module implements tree formation for a Canopy deployment:
//! - Parent acquisition by rank, then signal strength
//! - Cycle guard against adopting one of our own children
//! - Children bookkeeping on HelloAck / ChildDisconnect
//! - Snapshot-and-confirm liveness sweeps for children
//! - Restart-timer watchdog for the parent

pub mod action;
pub mod address_set;
pub mod agent;
pub mod config;
pub mod error;
pub mod liveness;
pub mod state;

pub use action::{Action, Actuator, Destination, TimerKind};
pub use address_set::AddressSet;
pub use agent::TopologyAgent;
pub use config::TopologyConfig;
pub use error::{Result, TopologyError};
pub use liveness::LivenessMonitor;
pub use state::{Attachment, ParentLink, TopologyState};
