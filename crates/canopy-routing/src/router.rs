//! Message Router
//!
//! Decides what a node does with an inbound application packet, given its
//! role, its capability and its place in the tree. The router never mutates
//! topology state; it only reads the parent slot and the children list and
//! returns the actions to perform.

use std::time::Duration;

use canopy_protocol::{AppCategory, GatewayEvent, NodeAddress, NodeRole, Packet, SensorCapability};
use canopy_topology::{Action, Actuator, TimerKind, TopologyState};
use serde::Serialize;
use tracing::debug;

/// Router statistics
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    /// Packets sent up to the parent
    pub messages_forwarded: u64,
    /// Packets flooded to the children (counted once per flood)
    pub messages_flooded: u64,
    /// Events surfaced at the gateway
    pub messages_surfaced: u64,
    /// Packets with nothing to do, or nowhere to go
    pub messages_dropped: u64,
    /// Local actuator activations
    pub actuations: u64,
}

/// Message Router
#[derive(Debug, Default)]
pub struct Router {
    stats: RouterStats,
}

impl Router {
    pub fn new() -> Self {
        Router {
            stats: RouterStats::default(),
        }
    }

    /// Route an inbound application packet heard from `sender`
    pub fn route(
        &mut self,
        state: &TopologyState,
        packet: Packet,
        sender: NodeAddress,
    ) -> Vec<Action> {
        if !packet.is_application() {
            self.stats.messages_dropped += 1;
            return Vec::new();
        }

        match state.role() {
            NodeRole::Gateway => self.route_gateway(packet, sender),
            NodeRole::Subgateway => self.route_subgateway(state, packet),
            NodeRole::Sensor => self.route_sensor(state, packet),
        }
    }

    fn route_gateway(&mut self, packet: Packet, sender: NodeAddress) -> Vec<Action> {
        let event = match packet.appcat {
            AppCategory::LightLevel => GatewayEvent::from_packet(&packet, sender),
            AppCategory::IrrigationAck => GatewayEvent::from_packet(&packet, packet.origin),
            _ => {
                self.stats.messages_dropped += 1;
                return Vec::new();
            }
        };

        self.stats.messages_surfaced += 1;
        vec![Action::Surface(event)]
    }

    fn route_subgateway(&mut self, state: &TopologyState, mut packet: Packet) -> Vec<Action> {
        match packet.appcat {
            AppCategory::LightLevel | AppCategory::IrrigationAck => {
                self.forward_to_parent(state, packet)
            }
            AppCategory::LightOn | AppCategory::IrrigationOn => self.flood(state, packet),
            AppCategory::MobileLightProbe => {
                packet.value = packet.value.saturating_add(1);
                self.flood(state, packet)
            }
            AppCategory::None => {
                self.stats.messages_dropped += 1;
                Vec::new()
            }
        }
    }

    fn route_sensor(&mut self, state: &TopologyState, mut packet: Packet) -> Vec<Action> {
        let capability = state.capability();

        match packet.appcat {
            AppCategory::LightLevel | AppCategory::IrrigationAck => {
                self.forward_to_parent(state, packet)
            }
            AppCategory::LightOn => {
                let mut actions = Vec::new();
                if capability == SensorCapability::LightBulb {
                    self.stats.actuations += 1;
                    actions.push(Action::SetActuator {
                        actuator: Actuator::Light,
                        active: true,
                    });
                    actions.push(Action::arm(TimerKind::LightOff, countdown(packet.value)));
                }
                actions.extend(self.flood(state, packet));
                actions
            }
            AppCategory::IrrigationOn => {
                let mut actions = Vec::new();
                if capability == SensorCapability::IrrigationSystem {
                    self.stats.actuations += 1;
                    actions.push(Action::SetActuator {
                        actuator: Actuator::Irrigation,
                        active: true,
                    });
                    actions.extend(self.forward_to_parent(state, irrigation_ack(state, 1)));
                    actions.push(Action::arm(
                        TimerKind::IrrigationOff,
                        countdown(packet.value),
                    ));
                }
                actions.extend(self.flood(state, packet));
                actions
            }
            AppCategory::MobileLightProbe => {
                if packet.value % 2 == 0 {
                    // Terminal side: on its way up towards the subgateway
                    self.forward_to_parent(state, packet)
                } else if packet.value == 1 && capability == SensorCapability::LightSensor {
                    packet.value = 2;
                    self.forward_to_parent(state, packet)
                } else if packet.value == 3 && capability == SensorCapability::MobileTerminal {
                    debug!(node = %state.address(), "Mobile terminal got a light sensor response");
                    Vec::new()
                } else {
                    self.flood(state, packet)
                }
            }
            AppCategory::None => {
                self.stats.messages_dropped += 1;
                Vec::new()
            }
        }
    }

    /// Light countdown expired
    pub fn on_light_off(&self) -> Vec<Action> {
        vec![Action::SetActuator {
            actuator: Actuator::Light,
            active: false,
        }]
    }

    /// Irrigation countdown expired: stop and report it upstream
    pub fn on_irrigation_off(&mut self, state: &TopologyState) -> Vec<Action> {
        let mut actions = vec![Action::SetActuator {
            actuator: Actuator::Irrigation,
            active: false,
        }];
        actions.extend(self.forward_to_parent(state, irrigation_ack(state, 0)));
        actions
    }

    /// Send a packet originated by this node up to its parent
    pub fn send_to_parent(&mut self, state: &TopologyState, packet: Packet) -> Vec<Action> {
        self.forward_to_parent(state, packet)
    }

    fn forward_to_parent(&mut self, state: &TopologyState, packet: Packet) -> Vec<Action> {
        match state.parent() {
            Some(parent) => {
                self.stats.messages_forwarded += 1;
                vec![Action::unicast(packet, parent.address)]
            }
            None => {
                debug!(
                    node = %state.address(),
                    appcat = ?packet.appcat,
                    "No parent, dropping upstream packet"
                );
                self.stats.messages_dropped += 1;
                Vec::new()
            }
        }
    }

    fn flood(&mut self, state: &TopologyState, packet: Packet) -> Vec<Action> {
        if state.children().is_empty() {
            return Vec::new();
        }

        self.stats.messages_flooded += 1;
        state
            .children()
            .iter()
            .map(|child| Action::unicast(packet, *child))
            .collect()
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }
}

fn irrigation_ack(state: &TopologyState, value: i32) -> Packet {
    Packet::application(NodeRole::Sensor, AppCategory::IrrigationAck, value)
        .with_origin(state.address())
}

/// Actuator countdown for a command value in seconds; negative means now
fn countdown(value: i32) -> Duration {
    Duration::from_secs(value.max(0) as u64)
}
