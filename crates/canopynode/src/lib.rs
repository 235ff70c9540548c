//! Canopy node runtime
//!
//! Runs Canopy nodes as tokio tasks over an in-memory radio medium, with a
//! gateway controller and the serial line protocol of the gateway.

pub mod config;
pub mod controller;
pub mod deployment;
pub mod error;
pub mod runtime;
pub mod serial;
pub mod transport;

pub use config::Config;
pub use controller::{Controller, ControllerConfig};
pub use deployment::Deployment;
pub use error::{NodeError, Result};
pub use runtime::{NodeCommand, NodeHandle, NodeRuntime, TimerTable};
pub use transport::{InboundFrame, MediumPort, RadioMedium, Transport};
