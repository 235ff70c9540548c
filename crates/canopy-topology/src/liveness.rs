//! Failure detection for children and parent
//!
//! Children are checked with snapshot-and-confirm rounds: at the start of a
//! round every child is presumed dead, and any Hello heard from it before
//! the window closes confirms it alive. Whatever is left in the snapshot at
//! the end of the window is pruned.
//!
//! The parent is covered by a single restart timer that every Hello from
//! the parent pushes back.

use std::time::Duration;

use canopy_protocol::NodeAddress;
use tracing::{debug, info};

use crate::action::{Action, TimerKind};
use crate::config::TopologyConfig;
use crate::state::TopologyState;

#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    initial_delay: Duration,
    round_interval: Duration,
    timeout: Duration,
    parent_timeout: Duration,
}

impl LivenessMonitor {
    pub fn new(config: &TopologyConfig) -> Self {
        LivenessMonitor {
            initial_delay: config.liveness_initial_delay(),
            round_interval: config.liveness_round_interval(),
            timeout: config.liveness_timeout(),
            parent_timeout: config.parent_timeout(),
        }
    }

    /// Schedule the first round
    pub fn start(&self) -> Action {
        Action::arm(TimerKind::LivenessRound, self.initial_delay)
    }

    /// Open a round: snapshot the children and arm the prune
    pub fn on_round(&self, state: &mut TopologyState) -> Vec<Action> {
        state.dead_children = state.children.clone();

        debug!(
            node = %state.address,
            children = state.children.len(),
            "Liveness round started"
        );

        vec![
            Action::arm(TimerKind::LivenessPrune, self.timeout),
            Action::arm(TimerKind::LivenessRound, self.round_interval),
        ]
    }

    /// Mark `sender` alive for the current round
    ///
    /// Returns true if it was awaiting confirmation.
    pub fn confirm_child(&self, state: &mut TopologyState, sender: &NodeAddress) -> bool {
        state.dead_children.remove(sender)
    }

    /// Close the round: drop every child that stayed silent
    pub fn on_prune(&self, state: &mut TopologyState) -> Vec<NodeAddress> {
        let dead: Vec<NodeAddress> = state.dead_children.iter().copied().collect();

        for address in &dead {
            if state.children.remove(address) {
                info!(node = %state.address, child = %address, "Child pruned after silence");
            }
        }
        state.dead_children.clear();

        dead
    }

    /// (Re)start the parent watchdog
    pub fn parent_watchdog(&self) -> Action {
        Action::arm(TimerKind::ParentWatchdog, self.parent_timeout)
    }

    /// Parent watchdog expired: forget the parent
    ///
    /// No notice goes out. Returns the parent that was lost, if any.
    pub fn on_parent_timeout(&self, state: &mut TopologyState) -> Option<NodeAddress> {
        let lost = state.parent.take().map(|p| p.address);

        if let Some(parent) = lost {
            info!(node = %state.address, parent = %parent, "Parent timed out, node is orphan");
        }

        lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ParentLink;
    use canopy_protocol::NodeRole;

    fn addr(id: u8) -> NodeAddress {
        NodeAddress::from_node_id(id)
    }

    fn relay_with_children(ids: &[u8]) -> TopologyState {
        let mut state = TopologyState::new(addr(1), NodeRole::Subgateway);
        for id in ids {
            state.children.add(addr(*id));
        }
        state
    }

    #[test]
    fn test_start_arms_first_round() {
        let monitor = LivenessMonitor::new(&TopologyConfig::default());

        assert_eq!(
            monitor.start(),
            Action::arm(TimerKind::LivenessRound, Duration::from_secs(1))
        );
    }

    #[test]
    fn test_round_replaces_snapshot() {
        let monitor = LivenessMonitor::new(&TopologyConfig::default());
        let mut state = relay_with_children(&[2, 3]);
        state.dead_children.add(addr(9));

        let actions = monitor.on_round(&mut state);

        assert_eq!(state.dead_children().as_slice(), &[addr(2), addr(3)]);
        assert!(actions.contains(&Action::arm(
            TimerKind::LivenessPrune,
            Duration::from_secs(20)
        )));
        assert!(actions.contains(&Action::arm(
            TimerKind::LivenessRound,
            Duration::from_secs(21)
        )));
    }

    #[test]
    fn test_silent_child_pruned_confirmed_child_kept() {
        let monitor = LivenessMonitor::new(&TopologyConfig::default());
        let mut state = relay_with_children(&[2, 3, 4]);

        monitor.on_round(&mut state);
        assert!(monitor.confirm_child(&mut state, &addr(3)));
        assert!(!monitor.confirm_child(&mut state, &addr(3)));

        let pruned = monitor.on_prune(&mut state);

        assert_eq!(pruned, vec![addr(2), addr(4)]);
        assert_eq!(state.children().as_slice(), &[addr(3)]);
        assert!(state.dead_children().is_empty());

        // A second prune in the same round removes nothing more
        assert!(monitor.on_prune(&mut state).is_empty());
        assert_eq!(state.children().len(), 1);
    }

    #[test]
    fn test_child_that_left_before_prune() {
        let monitor = LivenessMonitor::new(&TopologyConfig::default());
        let mut state = relay_with_children(&[2]);

        monitor.on_round(&mut state);
        state.children.remove(&addr(2));

        assert_eq!(monitor.on_prune(&mut state), vec![addr(2)]);
        assert!(state.children().is_empty());
    }

    #[test]
    fn test_parent_timeout_orphans_node() {
        let monitor = LivenessMonitor::new(&TopologyConfig::default());
        let mut state = TopologyState::new(addr(5), NodeRole::Sensor);
        state.parent = Some(ParentLink {
            address: addr(1),
            rank: 1,
            signal_strength: -50,
        });

        assert_eq!(monitor.on_parent_timeout(&mut state), Some(addr(1)));
        assert!(!state.is_in_network());
        assert!(state.parent_address().is_null());

        assert_eq!(monitor.on_parent_timeout(&mut state), None);
    }
}
