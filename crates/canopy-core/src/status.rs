//! Status colors
//!
//! Each node advertises a fixed color for its role, capability and
//! attachment. The first shade is used while in the network, the second
//! while orphaned.

use canopy_protocol::{NodeRole, SensorCapability};

/// Color code for a node in the given state
pub fn status_color(role: NodeRole, in_network: bool, capability: SensorCapability) -> &'static str {
    let (attached, orphan) = match role {
        NodeRole::Gateway => ("#888888", "#444444"),
        NodeRole::Subgateway => ("#8a10ff", "#c289f9"),
        NodeRole::Sensor => match capability {
            SensorCapability::IrrigationSystem => ("#00d4ff", "#b3ebf6"),
            SensorCapability::MobileTerminal => ("#e61142", "#f7a4b7"),
            SensorCapability::LightBulb => ("#f7ff0b", "#f2f4c0"),
            SensorCapability::LightSensor => ("#f59e0c", "#f4d39c"),
            SensorCapability::None => ("#2e8b57", "#a9d8bb"),
        },
    };

    if in_network {
        attached
    } else {
        orphan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_colors() {
        assert_eq!(status_color(NodeRole::Gateway, true, SensorCapability::None), "#888888");
        assert_eq!(status_color(NodeRole::Subgateway, false, SensorCapability::None), "#c289f9");
    }

    #[test]
    fn test_sensor_colors_follow_capability() {
        assert_eq!(
            status_color(NodeRole::Sensor, true, SensorCapability::LightSensor),
            "#f59e0c"
        );
        assert_eq!(
            status_color(NodeRole::Sensor, false, SensorCapability::IrrigationSystem),
            "#b3ebf6"
        );
        assert_ne!(
            status_color(NodeRole::Sensor, true, SensorCapability::None),
            status_color(NodeRole::Sensor, false, SensorCapability::None)
        );
    }
}
