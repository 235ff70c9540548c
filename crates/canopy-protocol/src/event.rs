//! Events surfaced at the root of the tree

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::message::Packet;
use crate::types::{AppCategory, MessageCategory, NodeAddress, NodeRole};

/// A reading or report that reached the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub role: NodeRole,
    pub msgcat: MessageCategory,
    pub appcat: AppCategory,
    pub value: i32,
    pub origin: NodeAddress,
}

impl GatewayEvent {
    /// Surface a packet, reporting it as coming from `origin`
    pub fn from_packet(packet: &Packet, origin: NodeAddress) -> Self {
        GatewayEvent {
            role: packet.role,
            msgcat: packet.msgcat,
            appcat: packet.appcat,
            value: packet.value,
            origin,
        }
    }
}

impl fmt::Display for GatewayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.appcat {
            AppCategory::LightLevel => {
                write!(f, "[ADDR {}] light value: {:02}", self.origin, self.value)
            }
            AppCategory::IrrigationAck if self.value == 1 => {
                write!(f, "[ADDR {}] irrigation is on", self.origin)
            }
            AppCategory::IrrigationAck => write!(f, "[ADDR {}] irrigation is off", self.origin),
            other => write!(f, "[ADDR {}] {:?} ({})", self.origin, other, self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_packet_uses_given_origin() {
        let sender = NodeAddress::from_node_id(4);
        let packet = Packet::application(NodeRole::Subgateway, AppCategory::LightLevel, 17);

        let event = GatewayEvent::from_packet(&packet, sender);

        assert_eq!(event.origin, sender);
        assert_eq!(event.role, NodeRole::Subgateway);
        assert_eq!(event.value, 17);
        assert_eq!(event.to_string(), "[ADDR 0400.0000.0000.0000] light value: 17");
    }

    #[test]
    fn test_irrigation_display() {
        let origin = NodeAddress::from_node_id(5);
        let on = Packet::application(NodeRole::Sensor, AppCategory::IrrigationAck, 1);
        let off = Packet::application(NodeRole::Sensor, AppCategory::IrrigationAck, 0);

        assert!(GatewayEvent::from_packet(&on, origin)
            .to_string()
            .ends_with("irrigation is on"));
        assert!(GatewayEvent::from_packet(&off, origin)
            .to_string()
            .ends_with("irrigation is off"));
    }
}
