//! Radio transport
//!
//! Nodes send encoded frames through a [`Transport`]. The in-memory
//! [`RadioMedium`] stands in for the air: it knows which nodes hear each
//! other and at what signal strength, and hands every frame to the inbound
//! queue of each node in range.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use canopy_protocol::NodeAddress;
use canopy_topology::Destination;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::error::{NodeError, Result};

/// A frame as received by a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub bytes: Vec<u8>,
    pub source: NodeAddress,
    pub signal_strength: i32,
}

/// Unicast/broadcast frame transmission
#[async_trait]
pub trait Transport: Send + Sync {
    /// Address frames from this transport are stamped with
    fn local_address(&self) -> NodeAddress;

    /// Transmit a frame
    ///
    /// Returns the number of nodes the frame reached. A unicast to a node
    /// out of range reaches nobody and is not an error.
    async fn send(&self, frame: &[u8], destination: Destination) -> Result<usize>;
}

#[derive(Default)]
struct MediumState {
    ports: HashMap<NodeAddress, mpsc::UnboundedSender<InboundFrame>>,
    /// Directed links: (from, to) -> signal strength heard at `to`
    links: HashMap<(NodeAddress, NodeAddress), i32>,
    /// Attached nodes that neither send nor receive
    powered_off: HashSet<NodeAddress>,
}

/// Shared in-memory broadcast medium
#[derive(Clone, Default)]
pub struct RadioMedium {
    state: Arc<RwLock<MediumState>>,
}

impl RadioMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a node and get its transport and inbound queue
    pub async fn attach(
        &self,
        address: NodeAddress,
    ) -> Result<(MediumPort, mpsc::UnboundedReceiver<InboundFrame>)> {
        let mut state = self.state.write().await;

        if state.ports.contains_key(&address) {
            return Err(NodeError::AlreadyAttached(address));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.ports.insert(address, tx);

        let port = MediumPort {
            address,
            medium: self.clone(),
        };
        Ok((port, rx))
    }

    /// Remove a node from the medium, closing its inbound queue
    pub async fn detach(&self, address: &NodeAddress) -> bool {
        let mut state = self.state.write().await;
        state.powered_off.remove(address);
        state.ports.remove(address).is_some()
    }

    /// Mute an attached node: it stops hearing and being heard, but its
    /// inbound queue stays open
    pub async fn power_off(&self, address: &NodeAddress) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.ports.contains_key(address) {
            return Err(NodeError::NotAttached(*address));
        }
        Ok(state.powered_off.insert(*address))
    }

    /// Undo [`RadioMedium::power_off`]
    pub async fn power_on(&self, address: &NodeAddress) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.ports.contains_key(address) {
            return Err(NodeError::NotAttached(*address));
        }
        Ok(state.powered_off.remove(address))
    }

    pub async fn is_powered(&self, address: &NodeAddress) -> bool {
        let state = self.state.read().await;
        state.ports.contains_key(address) && !state.powered_off.contains(address)
    }

    /// Put `a` and `b` in range of each other
    pub async fn link(&self, a: NodeAddress, b: NodeAddress, signal_strength: i32) {
        let mut state = self.state.write().await;
        state.links.insert((a, b), signal_strength);
        state.links.insert((b, a), signal_strength);
    }

    /// Take `a` and `b` out of range of each other
    pub async fn cut_link(&self, a: &NodeAddress, b: &NodeAddress) -> bool {
        let mut state = self.state.write().await;
        let forward = state.links.remove(&(*a, *b)).is_some();
        let backward = state.links.remove(&(*b, *a)).is_some();
        forward || backward
    }

    /// Nodes that hear `address`, in address order
    pub async fn neighbors(&self, address: &NodeAddress) -> Vec<(NodeAddress, i32)> {
        let state = self.state.read().await;
        let mut neighbors: Vec<(NodeAddress, i32)> = state
            .links
            .iter()
            .filter(|((from, _), _)| from == address)
            .map(|((_, to), strength)| (*to, *strength))
            .collect();
        neighbors.sort();
        neighbors
    }

    async fn transmit(
        &self,
        from: NodeAddress,
        frame: &[u8],
        destination: Destination,
    ) -> Result<usize> {
        let state = self.state.read().await;

        if !state.ports.contains_key(&from) {
            return Err(NodeError::NotAttached(from));
        }
        if state.powered_off.contains(&from) {
            debug!(from = %from, "Node powered off, frame not transmitted");
            return Ok(0);
        }

        let targets: Vec<(NodeAddress, i32)> = match destination {
            Destination::Unicast(to) => state
                .links
                .get(&(from, to))
                .map(|strength| vec![(to, *strength)])
                .unwrap_or_default(),
            Destination::Broadcast => {
                let mut targets: Vec<(NodeAddress, i32)> = state
                    .links
                    .iter()
                    .filter(|((src, _), _)| *src == from)
                    .map(|((_, to), strength)| (*to, *strength))
                    .collect();
                targets.sort();
                targets
            }
        };

        let mut delivered = 0;
        for (to, signal_strength) in targets {
            if state.powered_off.contains(&to) {
                continue;
            }
            let Some(port) = state.ports.get(&to) else {
                continue;
            };
            let frame = InboundFrame {
                bytes: frame.to_vec(),
                source: from,
                signal_strength,
            };
            if port.send(frame).is_ok() {
                delivered += 1;
            } else {
                debug!(from = %from, to = %to, "Receiver gone, frame lost");
            }
        }

        if delivered == 0 {
            debug!(from = %from, ?destination, "Frame reached no node");
        }

        Ok(delivered)
    }
}

/// A node's attachment to the [`RadioMedium`]
#[derive(Clone)]
pub struct MediumPort {
    address: NodeAddress,
    medium: RadioMedium,
}

#[async_trait]
impl Transport for MediumPort {
    fn local_address(&self) -> NodeAddress {
        self.address
    }

    async fn send(&self, frame: &[u8], destination: Destination) -> Result<usize> {
        self.medium.transmit(self.address, frame, destination).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(id: u8) -> NodeAddress {
        NodeAddress::from_node_id(id)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_neighbors_only() {
        let medium = RadioMedium::new();
        let (a, _a_rx) = medium.attach(addr(1)).await.unwrap();
        let (_b, mut b_rx) = medium.attach(addr(2)).await.unwrap();
        let (_c, mut c_rx) = medium.attach(addr(3)).await.unwrap();
        medium.link(addr(1), addr(2), -42).await;

        let delivered = a.send(&[1, 2, 3], Destination::Broadcast).await.unwrap();

        assert_eq!(delivered, 1);
        let frame = b_rx.recv().await.unwrap();
        assert_eq!(frame.bytes, vec![1, 2, 3]);
        assert_eq!(frame.source, addr(1));
        assert_eq!(frame.signal_strength, -42);
        assert!(c_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unicast_out_of_range_is_silent() {
        let medium = RadioMedium::new();
        let (a, _a_rx) = medium.attach(addr(1)).await.unwrap();
        let (_b, mut b_rx) = medium.attach(addr(2)).await.unwrap();

        assert_eq!(a.send(&[0], Destination::Unicast(addr(2))).await.unwrap(), 0);
        assert!(b_rx.try_recv().is_err());

        medium.link(addr(1), addr(2), -60).await;
        assert_eq!(a.send(&[0], Destination::Unicast(addr(2))).await.unwrap(), 1);

        assert!(medium.cut_link(&addr(2), &addr(1)).await);
        assert_eq!(a.send(&[0], Destination::Unicast(addr(2))).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_attach_and_detach() {
        let medium = RadioMedium::new();
        let (a, _a_rx) = medium.attach(addr(1)).await.unwrap();

        assert!(matches!(
            medium.attach(addr(1)).await,
            Err(NodeError::AlreadyAttached(_))
        ));

        assert!(medium.detach(&addr(1)).await);
        assert!(matches!(
            a.send(&[0], Destination::Broadcast).await,
            Err(NodeError::NotAttached(_))
        ));
        assert_eq!(a.local_address(), addr(1));
    }

    #[tokio::test]
    async fn test_powered_off_node_is_muted() {
        let medium = RadioMedium::new();
        let (a, _a_rx) = medium.attach(addr(1)).await.unwrap();
        let (b, mut b_rx) = medium.attach(addr(2)).await.unwrap();
        medium.link(addr(1), addr(2), -50).await;

        assert!(medium.power_off(&addr(2)).await.unwrap());
        assert!(!medium.power_off(&addr(2)).await.unwrap());
        assert!(!medium.is_powered(&addr(2)).await);

        assert_eq!(a.send(&[1], Destination::Broadcast).await.unwrap(), 0);
        assert_eq!(b.send(&[2], Destination::Unicast(addr(1))).await.unwrap(), 0);
        assert!(b_rx.try_recv().is_err());

        // Still attached: the queue is open and delivery resumes
        assert!(medium.power_on(&addr(2)).await.unwrap());
        assert!(medium.is_powered(&addr(2)).await);
        assert_eq!(a.send(&[3], Destination::Broadcast).await.unwrap(), 1);
        assert_eq!(b_rx.recv().await.unwrap().bytes, vec![3]);

        assert!(matches!(
            medium.power_off(&addr(9)).await,
            Err(NodeError::NotAttached(_))
        ));
    }

    #[tokio::test]
    async fn test_neighbors_sorted() {
        let medium = RadioMedium::new();
        medium.link(addr(1), addr(3), -50).await;
        medium.link(addr(1), addr(2), -40).await;

        assert_eq!(
            medium.neighbors(&addr(1)).await,
            vec![(addr(2), -40), (addr(3), -50)]
        );
        assert_eq!(medium.neighbors(&addr(2)).await, vec![(addr(1), -40)]);
    }
}
