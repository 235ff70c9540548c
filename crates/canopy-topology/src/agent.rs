//! Parent selection and children bookkeeping
//!
//! A node listens for Hello beacons and adopts the best eligible sender as
//! its parent. Lower rank wins; on equal rank the stronger signal wins.
//! The new parent learns about us through a HelloAck, the previous one
//! through a ChildDisconnect.

use canopy_protocol::{NodeAddress, NodeRole, Packet};
use tracing::{debug, info};

use crate::action::{Action, TimerKind};
use crate::config::TopologyConfig;
use crate::liveness::LivenessMonitor;
use crate::state::{ParentLink, TopologyState};

/// Topology state machine for one node
#[derive(Debug, Clone)]
pub struct TopologyAgent {
    config: TopologyConfig,
    liveness: LivenessMonitor,
}

impl TopologyAgent {
    pub fn new(config: TopologyConfig) -> Self {
        let liveness = LivenessMonitor::new(&config);
        TopologyAgent { config, liveness }
    }

    /// Timers armed when the node boots
    pub fn start(&self, state: &TopologyState) -> Vec<Action> {
        let mut actions = vec![self.liveness.start()];

        if state.is_gateway() {
            actions.push(Action::arm(
                TimerKind::HelloBeacon,
                self.config.hello_interval(),
            ));
        }

        actions
    }

    /// Hello timer fired: broadcast our own beacon
    pub fn on_hello_beacon(&self, state: &TopologyState) -> Vec<Action> {
        let mut actions = vec![Action::broadcast(Packet::hello(state.role))];

        if state.is_gateway() {
            actions.push(Action::arm(
                TimerKind::HelloBeacon,
                self.config.hello_interval(),
            ));
        }

        actions
    }

    /// Process a Hello heard from `sender` at `signal_strength`
    pub fn on_hello(
        &self,
        state: &mut TopologyState,
        packet: &Packet,
        sender: NodeAddress,
        signal_strength: i32,
    ) -> Vec<Action> {
        if self.liveness.confirm_child(state, &sender) {
            debug!(node = %state.address, child = %sender, "Child confirmed alive");
        }

        if state.is_gateway() {
            return Vec::new();
        }

        if state.parent.map(|p| p.address) == Some(sender) {
            return vec![
                self.liveness.parent_watchdog(),
                Action::arm(TimerKind::HelloBeacon, self.config.hello_relay_delay()),
            ];
        }

        if !Self::is_eligible(state.role, packet.role, sender, state.address) {
            return Vec::new();
        }

        if state.children.contains(&sender) {
            debug!(node = %state.address, sender = %sender, "Ignoring Hello from own child");
            return Vec::new();
        }

        let rank = packet.role.rank();
        if !Self::is_better_path(state, rank, signal_strength) {
            return Vec::new();
        }

        let previous = state.parent.replace(ParentLink {
            address: sender,
            rank,
            signal_strength,
        });

        info!(
            node = %state.address,
            parent = %sender,
            rank,
            signal_strength,
            "Parent selected"
        );

        let mut actions = vec![
            self.liveness.parent_watchdog(),
            Action::arm(TimerKind::HelloBeacon, self.config.hello_relay_delay()),
            Action::unicast(Packet::hello_ack(state.role), sender),
        ];

        if let Some(old) = previous {
            if !old.address.is_null() && old.address != sender {
                actions.push(Action::unicast(
                    Packet::child_disconnect(state.role),
                    old.address,
                ));
            }
        }

        actions
    }

    /// A node adopted us as its parent
    ///
    /// Returns true if `sender` became a new child.
    pub fn on_hello_ack(&self, state: &mut TopologyState, sender: NodeAddress) -> bool {
        if sender == state.address || Some(sender) == state.parent.map(|p| p.address) {
            debug!(node = %state.address, sender = %sender, "Ignoring HelloAck from parent");
            return false;
        }

        let added = state.children.add(sender);
        if added {
            info!(node = %state.address, child = %sender, "Child added");
        }
        added
    }

    /// A child moved to another parent
    pub fn on_child_disconnect(&self, state: &mut TopologyState, sender: NodeAddress) -> bool {
        let removed = state.children.remove(&sender);
        if removed {
            info!(node = %state.address, child = %sender, "Child disconnected");
        }
        removed
    }

    pub fn on_parent_timeout(&self, state: &mut TopologyState) -> Option<NodeAddress> {
        self.liveness.on_parent_timeout(state)
    }

    pub fn on_liveness_round(&self, state: &mut TopologyState) -> Vec<Action> {
        self.liveness.on_round(state)
    }

    pub fn on_liveness_prune(&self, state: &mut TopologyState) -> Vec<NodeAddress> {
        self.liveness.on_prune(state)
    }

    /// Whether a Hello declaring `declared` may make its sender our parent
    pub fn is_eligible(
        own_role: NodeRole,
        declared: NodeRole,
        sender: NodeAddress,
        own_address: NodeAddress,
    ) -> bool {
        if sender == own_address {
            return false;
        }

        match own_role {
            NodeRole::Gateway => false,
            NodeRole::Subgateway => declared == NodeRole::Gateway,
            NodeRole::Sensor => declared != NodeRole::Gateway,
        }
    }

    /// Whether a candidate of `rank` heard at `signal_strength` beats the current parent
    pub fn is_better_path(state: &TopologyState, rank: i32, signal_strength: i32) -> bool {
        match state.parent {
            None => true,
            Some(parent) => {
                rank < parent.rank
                    || (rank == parent.rank && signal_strength > parent.signal_strength)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Destination;
    use canopy_protocol::MessageCategory;
    use std::time::Duration;

    fn addr(id: u8) -> NodeAddress {
        NodeAddress::from_node_id(id)
    }

    fn agent() -> TopologyAgent {
        TopologyAgent::new(TopologyConfig::default())
    }

    fn sent(actions: &[Action]) -> Vec<(MessageCategory, Destination)> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Send {
                    packet,
                    destination,
                } => Some((packet.msgcat, *destination)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_gateway_start_arms_beacon() {
        let agent = agent();
        let state = TopologyState::new(addr(1), NodeRole::Gateway);

        let actions = agent.start(&state);

        assert!(actions.contains(&Action::arm(
            TimerKind::HelloBeacon,
            Duration::from_secs(10)
        )));

        let beacon = agent.on_hello_beacon(&state);
        assert_eq!(
            sent(&beacon),
            vec![(MessageCategory::Hello, Destination::Broadcast)]
        );
        assert!(beacon.contains(&Action::arm(
            TimerKind::HelloBeacon,
            Duration::from_secs(10)
        )));
    }

    #[test]
    fn test_relay_beacon_does_not_rearm() {
        let agent = agent();
        let state = TopologyState::new(addr(2), NodeRole::Subgateway);

        assert_eq!(agent.start(&state).len(), 1);
        assert_eq!(agent.on_hello_beacon(&state).len(), 1);
    }

    #[test]
    fn test_orphan_accepts_eligible_hello() {
        let agent = agent();
        let mut state = TopologyState::new(addr(2), NodeRole::Subgateway);

        let actions = agent.on_hello(&mut state, &Packet::hello(NodeRole::Gateway), addr(1), -60);

        assert!(state.is_in_network());
        assert_eq!(state.parent_address(), addr(1));
        assert_eq!(
            sent(&actions),
            vec![(MessageCategory::HelloAck, Destination::Unicast(addr(1)))]
        );
        assert!(actions.contains(&Action::arm(
            TimerKind::ParentWatchdog,
            Duration::from_secs(20)
        )));
        assert!(actions.contains(&Action::arm(
            TimerKind::HelloBeacon,
            Duration::from_secs(1)
        )));
    }

    #[test]
    fn test_eligibility_rules() {
        let me = addr(9);

        assert!(TopologyAgent::is_eligible(
            NodeRole::Subgateway,
            NodeRole::Gateway,
            addr(1),
            me
        ));
        assert!(!TopologyAgent::is_eligible(
            NodeRole::Subgateway,
            NodeRole::Subgateway,
            addr(1),
            me
        ));
        assert!(!TopologyAgent::is_eligible(
            NodeRole::Sensor,
            NodeRole::Gateway,
            addr(1),
            me
        ));
        assert!(TopologyAgent::is_eligible(
            NodeRole::Sensor,
            NodeRole::Sensor,
            addr(1),
            me
        ));
        assert!(!TopologyAgent::is_eligible(
            NodeRole::Sensor,
            NodeRole::Subgateway,
            me,
            me
        ));
        assert!(!TopologyAgent::is_eligible(
            NodeRole::Gateway,
            NodeRole::Gateway,
            addr(1),
            me
        ));
    }

    #[test]
    fn test_sensor_ignores_gateway_hello() {
        let agent = agent();
        let mut state = TopologyState::new(addr(5), NodeRole::Sensor);

        let actions = agent.on_hello(&mut state, &Packet::hello(NodeRole::Gateway), addr(1), -10);

        assert!(actions.is_empty());
        assert!(!state.is_in_network());
    }

    #[test]
    fn test_lower_rank_wins() {
        let agent = agent();
        let mut state = TopologyState::new(addr(5), NodeRole::Sensor);

        agent.on_hello(&mut state, &Packet::hello(NodeRole::Sensor), addr(6), -20);
        assert_eq!(state.parent_address(), addr(6));

        let actions = agent.on_hello(&mut state, &Packet::hello(NodeRole::Subgateway), addr(2), -90);

        assert_eq!(state.parent_address(), addr(2));
        assert_eq!(state.parent().map(|p| p.rank), Some(1));
        assert_eq!(
            sent(&actions),
            vec![
                (MessageCategory::HelloAck, Destination::Unicast(addr(2))),
                (MessageCategory::ChildDisconnect, Destination::Unicast(addr(6))),
            ]
        );
    }

    #[test]
    fn test_higher_rank_rejected() {
        let agent = agent();
        let mut state = TopologyState::new(addr(5), NodeRole::Sensor);

        agent.on_hello(&mut state, &Packet::hello(NodeRole::Subgateway), addr(2), -90);
        let actions = agent.on_hello(&mut state, &Packet::hello(NodeRole::Sensor), addr(6), -10);

        assert!(actions.is_empty());
        assert_eq!(state.parent_address(), addr(2));
    }

    #[test]
    fn test_equal_rank_needs_strictly_stronger_signal() {
        let agent = agent();
        let mut state = TopologyState::new(addr(5), NodeRole::Sensor);

        agent.on_hello(&mut state, &Packet::hello(NodeRole::Subgateway), addr(2), -60);

        let tie = agent.on_hello(&mut state, &Packet::hello(NodeRole::Subgateway), addr(3), -60);
        assert!(tie.is_empty());
        assert_eq!(state.parent_address(), addr(2));

        agent.on_hello(&mut state, &Packet::hello(NodeRole::Subgateway), addr(3), -40);
        assert_eq!(state.parent_address(), addr(3));
        assert_eq!(state.parent().map(|p| p.signal_strength), Some(-40));
    }

    #[test]
    fn test_cycle_guard_skips_own_child() {
        let agent = agent();
        let mut state = TopologyState::new(addr(5), NodeRole::Sensor);

        assert!(agent.on_hello_ack(&mut state, addr(7)));

        let actions = agent.on_hello(&mut state, &Packet::hello(NodeRole::Sensor), addr(7), -5);

        assert!(actions.is_empty());
        assert!(!state.is_in_network());
    }

    #[test]
    fn test_hello_from_parent_restarts_watchdog_and_relays() {
        let agent = agent();
        let mut state = TopologyState::new(addr(2), NodeRole::Subgateway);
        agent.on_hello(&mut state, &Packet::hello(NodeRole::Gateway), addr(1), -60);

        let actions = agent.on_hello(&mut state, &Packet::hello(NodeRole::Gateway), addr(1), -80);

        assert_eq!(
            actions,
            vec![
                Action::arm(TimerKind::ParentWatchdog, Duration::from_secs(20)),
                Action::arm(TimerKind::HelloBeacon, Duration::from_secs(1)),
            ]
        );
        // Refresh does not touch the recorded signal
        assert_eq!(state.parent().map(|p| p.signal_strength), Some(-60));
    }

    #[test]
    fn test_hello_ack_from_parent_ignored() {
        let agent = agent();
        let mut state = TopologyState::new(addr(5), NodeRole::Sensor);
        agent.on_hello(&mut state, &Packet::hello(NodeRole::Sensor), addr(6), -30);

        assert!(!agent.on_hello_ack(&mut state, addr(6)));
        assert!(!state.children().contains(&addr(6)));
    }

    #[test]
    fn test_child_bookkeeping() {
        let agent = agent();
        let mut state = TopologyState::new(addr(1), NodeRole::Gateway);

        assert!(agent.on_hello_ack(&mut state, addr(2)));
        assert!(!agent.on_hello_ack(&mut state, addr(2)));
        assert!(agent.on_hello_ack(&mut state, addr(3)));

        assert!(agent.on_child_disconnect(&mut state, addr(2)));
        assert!(!agent.on_child_disconnect(&mut state, addr(2)));
        assert_eq!(state.children().as_slice(), &[addr(3)]);
    }

    #[test]
    fn test_gateway_hello_confirms_child_only() {
        let agent = agent();
        let mut state = TopologyState::new(addr(1), NodeRole::Gateway);
        agent.on_hello_ack(&mut state, addr(2));
        agent.on_liveness_round(&mut state);

        let actions = agent.on_hello(&mut state, &Packet::hello(NodeRole::Subgateway), addr(2), -50);

        assert!(actions.is_empty());
        assert!(state.dead_children().is_empty());
        assert!(agent.on_liveness_prune(&mut state).is_empty());
        assert!(state.children().contains(&addr(2)));
    }

    #[test]
    fn test_parent_timeout_then_reattach() {
        let agent = agent();
        let mut state = TopologyState::new(addr(2), NodeRole::Subgateway);
        agent.on_hello(&mut state, &Packet::hello(NodeRole::Gateway), addr(1), -60);

        assert_eq!(agent.on_parent_timeout(&mut state), Some(addr(1)));
        assert!(!state.is_in_network());

        let actions = agent.on_hello(&mut state, &Packet::hello(NodeRole::Gateway), addr(1), -70);

        // No ChildDisconnect: there was no previous parent any more
        assert_eq!(
            sent(&actions),
            vec![(MessageCategory::HelloAck, Destination::Unicast(addr(1)))]
        );
        assert!(state.is_in_network());
    }
}
