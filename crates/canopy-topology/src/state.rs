//! Per-node topology state

use canopy_protocol::{NodeAddress, NodeRole, SensorCapability};
use serde::Serialize;

use crate::address_set::AddressSet;

/// The node we currently route upstream through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParentLink {
    pub address: NodeAddress,
    /// Declared rank of the parent when it was adopted
    pub rank: i32,
    /// Signal strength of the Hello that won the selection
    pub signal_strength: i32,
}

/// Attachment state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Attachment {
    Orphan,
    Attached,
}

/// Topology state owned by a single node
///
/// Being in the network is derived from the parent slot rather than stored,
/// so the two can never disagree. The gateway never has a parent and is
/// always in the network.
#[derive(Debug, Clone, Serialize)]
pub struct TopologyState {
    pub(crate) address: NodeAddress,
    pub(crate) role: NodeRole,
    pub(crate) capability: SensorCapability,
    pub(crate) parent: Option<ParentLink>,
    pub(crate) children: AddressSet,
    pub(crate) dead_children: AddressSet,
}

impl TopologyState {
    /// Fresh state at node start: orphan, no children
    pub fn new(address: NodeAddress, role: NodeRole) -> Self {
        TopologyState {
            address,
            role,
            capability: SensorCapability::None,
            parent: None,
            children: AddressSet::new(),
            dead_children: AddressSet::new(),
        }
    }

    pub fn address(&self) -> NodeAddress {
        self.address
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn is_gateway(&self) -> bool {
        self.role == NodeRole::Gateway
    }

    pub fn is_in_network(&self) -> bool {
        self.is_gateway() || self.parent.is_some()
    }

    pub fn attachment(&self) -> Attachment {
        if self.is_in_network() {
            Attachment::Attached
        } else {
            Attachment::Orphan
        }
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    /// Parent address, or the null sentinel when orphaned
    pub fn parent_address(&self) -> NodeAddress {
        self.parent.map(|p| p.address).unwrap_or(NodeAddress::NULL)
    }

    pub fn children(&self) -> &AddressSet {
        &self.children
    }

    pub fn dead_children(&self) -> &AddressSet {
        &self.dead_children
    }

    pub fn capability(&self) -> SensorCapability {
        self.capability
    }

    /// Set the sensor capability
    ///
    /// Only meaningful for sensors; callers enforce the role check.
    pub fn set_capability(&mut self, capability: SensorCapability) {
        self.capability = capability;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_orphan() {
        let state = TopologyState::new(NodeAddress::from_node_id(2), NodeRole::Sensor);

        assert_eq!(state.attachment(), Attachment::Orphan);
        assert!(!state.is_in_network());
        assert!(state.parent_address().is_null());
        assert!(state.children().is_empty());
        assert_eq!(state.capability(), SensorCapability::None);
    }

    #[test]
    fn test_gateway_always_in_network() {
        let state = TopologyState::new(NodeAddress::from_node_id(1), NodeRole::Gateway);

        assert!(state.is_in_network());
        assert_eq!(state.attachment(), Attachment::Attached);
        assert!(state.parent().is_none());
    }

    #[test]
    fn test_attachment_follows_parent_slot() {
        let mut state = TopologyState::new(NodeAddress::from_node_id(3), NodeRole::Subgateway);
        state.parent = Some(ParentLink {
            address: NodeAddress::from_node_id(1),
            rank: 0,
            signal_strength: -40,
        });

        assert!(state.is_in_network());
        assert_eq!(state.parent_address(), NodeAddress::from_node_id(1));

        state.parent = None;
        assert_eq!(state.attachment(), Attachment::Orphan);
    }
}
