//! Side effects requested by the protocol state machines
//!
//! The agent, the liveness monitor and the router never touch the radio or
//! the clock directly. They return a list of actions that the node runtime
//! executes in order.

use std::time::Duration;

use canopy_protocol::{GatewayEvent, NodeAddress, Packet};

/// Where an outbound packet goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Broadcast,
    Unicast(NodeAddress),
}

/// Timers a node can arm
///
/// Each kind has at most one pending deadline: arming a kind that is
/// already armed replaces its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    /// Hello broadcast (self-rearming at the gateway, one-shot relay elsewhere)
    HelloBeacon,
    /// Parent watchdog, restarted by every Hello from the parent
    ParentWatchdog,
    /// Start of a liveness round
    LivenessRound,
    /// End of a liveness round's confirmation window
    LivenessPrune,
    /// Light bulb countdown
    LightOff,
    /// Irrigation countdown
    IrrigationOff,
    /// Periodic application report
    AppReport,
}

/// Local actuators driven by application commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuator {
    Light,
    Irrigation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Transmit a packet
    Send {
        packet: Packet,
        destination: Destination,
    },
    /// Arm (or re-arm) a timer
    ArmTimer { timer: TimerKind, after: Duration },
    /// Switch an actuator on or off
    SetActuator { actuator: Actuator, active: bool },
    /// Report an event at the root of the tree
    Surface(GatewayEvent),
}

impl Action {
    pub fn broadcast(packet: Packet) -> Self {
        Action::Send {
            packet,
            destination: Destination::Broadcast,
        }
    }

    pub fn unicast(packet: Packet, to: NodeAddress) -> Self {
        Action::Send {
            packet,
            destination: Destination::Unicast(to),
        }
    }

    pub fn arm(timer: TimerKind, after: Duration) -> Self {
        Action::ArmTimer { timer, after }
    }
}
