//! Per-node protocol engine
//!
//! The engine owns a node's topology state and drives the topology agent
//! and the router. It performs no I/O: every input returns the list of
//! actions the caller must execute, in order. Actuator switches are also
//! tracked here so a snapshot reports what the hardware would show.

use canopy_protocol::{
    AppCategory, MessageCategory, NodeAddress, NodeRole, OperatorCommand, Packet,
    SensorCapability,
};
use canopy_routing::{Router, RouterStats};
use canopy_topology::{Action, Actuator, TimerKind, TopologyAgent, TopologyState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{CoreError, Result};
use crate::status::status_color;

/// Point-in-time view of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub address: NodeAddress,
    pub role: NodeRole,
    pub capability: SensorCapability,
    pub in_network: bool,
    pub parent: Option<NodeAddress>,
    pub children: Vec<NodeAddress>,
    pub dead_children: Vec<NodeAddress>,
    pub light_on: bool,
    pub irrigation_on: bool,
    pub color: &'static str,
    pub router: RouterStats,
}

pub struct Engine {
    state: TopologyState,
    agent: TopologyAgent,
    router: Router,
    config: EngineConfig,
    rng: StdRng,
    light_on: bool,
    irrigation_on: bool,
}

impl Engine {
    pub fn new(address: NodeAddress, role: NodeRole, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Engine {
            state: TopologyState::new(address, role),
            agent: TopologyAgent::new(config.topology.clone()),
            router: Router::new(),
            config,
            rng,
            light_on: false,
            irrigation_on: false,
        })
    }

    pub fn address(&self) -> NodeAddress {
        self.state.address()
    }

    pub fn role(&self) -> NodeRole {
        self.state.role()
    }

    pub fn state(&self) -> &TopologyState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Timers to arm when the node boots
    pub fn start(&mut self) -> Vec<Action> {
        info!(node = %self.address(), role = %self.role(), "Node starting");

        let mut actions = self.agent.start(&self.state);
        if self.role() == NodeRole::Sensor {
            actions.push(Action::arm(
                TimerKind::AppReport,
                self.config.app_report_interval(),
            ));
        }
        actions
    }

    /// Handle a packet heard from `source` at `signal_strength`
    pub fn handle_packet(
        &mut self,
        packet: Packet,
        source: NodeAddress,
        signal_strength: i32,
    ) -> Vec<Action> {
        let actions = match packet.msgcat {
            MessageCategory::Hello => {
                self.agent
                    .on_hello(&mut self.state, &packet, source, signal_strength)
            }
            MessageCategory::HelloAck => {
                self.agent.on_hello_ack(&mut self.state, source);
                Vec::new()
            }
            MessageCategory::ChildDisconnect => {
                self.agent.on_child_disconnect(&mut self.state, source);
                Vec::new()
            }
            MessageCategory::Null => Vec::new(),
            MessageCategory::Application => self.router.route(&self.state, packet, source),
        };

        self.track(actions)
    }

    /// Handle the expiry of `timer`
    pub fn handle_timer(&mut self, timer: TimerKind) -> Vec<Action> {
        let actions = match timer {
            TimerKind::HelloBeacon => self.agent.on_hello_beacon(&self.state),
            TimerKind::ParentWatchdog => {
                self.agent.on_parent_timeout(&mut self.state);
                Vec::new()
            }
            TimerKind::LivenessRound => self.agent.on_liveness_round(&mut self.state),
            TimerKind::LivenessPrune => {
                self.agent.on_liveness_prune(&mut self.state);
                Vec::new()
            }
            TimerKind::LightOff => self.router.on_light_off(),
            TimerKind::IrrigationOff => self.router.on_irrigation_off(&self.state),
            TimerKind::AppReport => self.app_report(),
        };

        self.track(actions)
    }

    /// Execute an operator command at this node
    ///
    /// IrrigationOn goes to every child; any other application category is
    /// unicast to the command's address. Non-application commands do nothing.
    pub fn operator_command(&mut self, command: &OperatorCommand) -> Vec<Action> {
        if !command.is_application() {
            debug!(node = %self.address(), msgcat = ?command.msgcat, "Ignoring operator command");
            return Vec::new();
        }

        let packet = command.to_packet(self.role());

        if command.appcat == AppCategory::IrrigationOn {
            return self
                .state
                .children()
                .iter()
                .map(|child| Action::unicast(packet, *child))
                .collect();
        }

        vec![Action::unicast(packet, command.address)]
    }

    /// Change the sensor capability
    pub fn set_capability(&mut self, capability: SensorCapability) -> Result<()> {
        if self.role() != NodeRole::Sensor {
            return Err(CoreError::NotASensor(self.role()));
        }

        info!(node = %self.address(), capability = %capability, "Capability set");
        self.state.set_capability(capability);
        Ok(())
    }

    pub fn status_color(&self) -> &'static str {
        status_color(
            self.role(),
            self.state.is_in_network(),
            self.state.capability(),
        )
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            address: self.address(),
            role: self.role(),
            capability: self.state.capability(),
            in_network: self.state.is_in_network(),
            parent: self.state.parent().map(|p| p.address),
            children: self.state.children().as_slice().to_vec(),
            dead_children: self.state.dead_children().as_slice().to_vec(),
            light_on: self.light_on,
            irrigation_on: self.irrigation_on,
            color: self.status_color(),
            router: self.router.stats().clone(),
        }
    }

    fn app_report(&mut self) -> Vec<Action> {
        let mut actions = vec![Action::arm(
            TimerKind::AppReport,
            self.config.app_report_interval(),
        )];

        if !self.state.is_in_network() {
            return actions;
        }

        match self.state.capability() {
            SensorCapability::LightSensor => {
                let reading = self.rng.gen_range(0..100);
                let packet = Packet::application(self.role(), AppCategory::LightLevel, reading);
                actions.extend(self.router.send_to_parent(&self.state, packet));
            }
            SensorCapability::MobileTerminal => {
                let probe = Packet::application(self.role(), AppCategory::MobileLightProbe, 0);
                for _ in 0..self.config.probe_burst {
                    actions.extend(self.router.send_to_parent(&self.state, probe));
                }
            }
            _ => {}
        }

        actions
    }

    fn track(&mut self, actions: Vec<Action>) -> Vec<Action> {
        for action in &actions {
            if let Action::SetActuator { actuator, active } = action {
                match actuator {
                    Actuator::Light => self.light_on = *active,
                    Actuator::Irrigation => self.irrigation_on = *active,
                }
            }
        }
        actions
    }
}
