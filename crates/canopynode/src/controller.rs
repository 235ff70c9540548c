//! Gateway-side controller
//!
//! Watches the events surfaced at the gateway and answers with operator
//! commands: dim light readings switch the lights on near the reporting
//! node, and irrigation is started periodically across the whole tree.

use canopy_protocol::{
    AppCategory, GatewayEvent, MessageCategory, NodeAddress, NodeRole, OperatorCommand,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub enabled: bool,
    /// Light readings strictly below this switch the lights on
    pub light_threshold: i32,
    /// How long the lights stay on, in seconds
    pub light_on_secs: i32,
    /// Irrigation starts on the first event and then every this many events
    pub irrigation_every: u64,
    /// How long irrigation runs, in seconds
    pub irrigation_secs: i32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            light_threshold: 20,
            light_on_secs: 2,
            irrigation_every: 20,
            irrigation_secs: 10,
        }
    }
}

pub struct Controller {
    config: ControllerConfig,
    ticks: u64,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        Self { config, ticks: 0 }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Commands to run at the gateway in response to `event`
    pub fn on_event(&mut self, event: &GatewayEvent) -> Vec<OperatorCommand> {
        let mut commands = Vec::new();

        if event.role == NodeRole::Sensor && event.msgcat == MessageCategory::Application {
            match event.appcat {
                AppCategory::LightLevel if event.value < self.config.light_threshold => {
                    info!(origin = %event.origin, value = event.value, "Dim reading, switching lights on");
                    commands.push(OperatorCommand::application(
                        AppCategory::LightOn,
                        self.config.light_on_secs,
                        event.origin,
                    ));
                }
                AppCategory::IrrigationAck => {
                    let state = if event.value == 1 { "on" } else { "off" };
                    info!(origin = %event.origin, "Irrigation is {}", state);
                }
                _ => {}
            }
        }

        if self.config.irrigation_every > 0 && self.ticks % self.config.irrigation_every == 0 {
            info!(secs = self.config.irrigation_secs, "Starting irrigation");
            commands.push(OperatorCommand::application(
                AppCategory::IrrigationOn,
                self.config.irrigation_secs,
                NodeAddress::NULL,
            ));
        }

        self.ticks += 1;
        commands
    }
}
