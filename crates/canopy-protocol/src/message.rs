//! Packet model

use serde::{Deserialize, Serialize};

use crate::types::{AppCategory, MessageCategory, NodeAddress, NodeRole};

/// A message exchanged between Canopy nodes
///
/// Every packet has the same shape. Control packets leave `appcat`, `value`
/// and `origin` at their defaults; application packets carry a command or a
/// reading in `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Declared role (rank) of the node that emitted this hop
    pub role: NodeRole,

    /// Control-plane category
    pub msgcat: MessageCategory,

    /// Application category (`None` for control packets)
    pub appcat: AppCategory,

    /// Reading, duration or probe phase depending on `appcat`
    pub value: i32,

    /// Reporting node, stamped only for IrrigationAck and at the gateway
    pub origin: NodeAddress,
}

impl Packet {
    /// Create a control packet (Hello, HelloAck, ChildDisconnect, Null)
    pub fn control(role: NodeRole, msgcat: MessageCategory) -> Self {
        Packet {
            role,
            msgcat,
            appcat: AppCategory::None,
            value: 0,
            origin: NodeAddress::NULL,
        }
    }

    /// Create an application packet
    pub fn application(role: NodeRole, appcat: AppCategory, value: i32) -> Self {
        Packet {
            role,
            msgcat: MessageCategory::Application,
            appcat,
            value,
            origin: NodeAddress::NULL,
        }
    }

    /// Set the origin address
    pub fn with_origin(mut self, origin: NodeAddress) -> Self {
        self.origin = origin;
        self
    }

    pub fn hello(role: NodeRole) -> Self {
        Self::control(role, MessageCategory::Hello)
    }

    pub fn hello_ack(role: NodeRole) -> Self {
        Self::control(role, MessageCategory::HelloAck)
    }

    pub fn child_disconnect(role: NodeRole) -> Self {
        Self::control(role, MessageCategory::ChildDisconnect)
    }

    pub fn is_application(&self) -> bool {
        self.msgcat == MessageCategory::Application
    }
}
