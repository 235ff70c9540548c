//! Ordered, duplicate-free address collection

use canopy_protocol::NodeAddress;
use serde::{Deserialize, Serialize};

/// Insertion-ordered set of node addresses
///
/// Backs the children list and the dead-children snapshot. Lookups are
/// linear: a node has a handful of children, and insertion order is part of
/// the contract (floods go out in the order children joined).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSet {
    addresses: Vec<NodeAddress>,
}

impl AddressSet {
    /// Create an empty set
    pub fn new() -> Self {
        AddressSet {
            addresses: Vec::new(),
        }
    }

    /// Append `address` unless already present
    ///
    /// Returns true if the set changed
    pub fn add(&mut self, address: NodeAddress) -> bool {
        if self.contains(&address) {
            return false;
        }
        self.addresses.push(address);
        true
    }

    /// Remove `address` if present, keeping the order of the rest
    ///
    /// Returns true if the set changed
    pub fn remove(&mut self, address: &NodeAddress) -> bool {
        match self.find(address) {
            Some(pos) => {
                self.addresses.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Position of `address`, if present
    pub fn find(&self, address: &NodeAddress) -> Option<usize> {
        self.addresses.iter().position(|a| a == address)
    }

    pub fn contains(&self, address: &NodeAddress) -> bool {
        self.find(address).is_some()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn clear(&mut self) {
        self.addresses.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NodeAddress> {
        self.addresses.iter()
    }

    pub fn as_slice(&self) -> &[NodeAddress] {
        &self.addresses
    }
}

impl<'a> IntoIterator for &'a AddressSet {
    type Item = &'a NodeAddress;
    type IntoIter = std::slice::Iter<'a, NodeAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.addresses.iter()
    }
}

impl IntoIterator for AddressSet {
    type Item = NodeAddress;
    type IntoIter = std::vec::IntoIter<NodeAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.addresses.into_iter()
    }
}

impl FromIterator<NodeAddress> for AddressSet {
    fn from_iter<I: IntoIterator<Item = NodeAddress>>(iter: I) -> Self {
        let mut set = AddressSet::new();
        for address in iter {
            set.add(address);
        }
        set
    }
}
