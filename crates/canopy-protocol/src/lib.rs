//! Canopy Protocol Module
//!
//! This module defines the packet model shared by every node of a Canopy
//! sensor tree, its fixed-size wire format, the operator command line and
//! the events surfaced at the gateway.

pub mod command;
pub mod error;
pub mod event;
pub mod frame;
pub mod message;
pub mod types;

pub use command::OperatorCommand;
pub use error::{ProtocolError, Result};
pub use event::GatewayEvent;
pub use frame::{decode, encode, PACKET_SIZE};
pub use message::Packet;
pub use types::{AppCategory, MessageCategory, NodeAddress, NodeRole, SensorCapability};
