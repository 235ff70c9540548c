//! Running deployment
//!
//! Builds the radio medium from a [`Config`], spawns one [`NodeRuntime`]
//! per node and exposes the gateway's event stream.

use std::collections::BTreeMap;

use canopy_core::{Engine, EngineConfig, NodeSnapshot};
use canopy_protocol::{GatewayEvent, NodeAddress, NodeRole};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{NodeError, Result};
use crate::runtime::{NodeHandle, NodeRuntime};
use crate::transport::RadioMedium;

/// Gateway events held until the receiver drains them; further events are dropped
pub const EVENT_QUEUE_SIZE: usize = 256;

pub struct Deployment {
    medium: RadioMedium,
    nodes: BTreeMap<NodeAddress, NodeHandle>,
    tasks: Vec<JoinHandle<()>>,
    gateway: NodeAddress,
    events: Option<mpsc::Receiver<GatewayEvent>>,
}

impl Deployment {
    /// Wire up the medium and start every node
    pub async fn launch(config: &Config) -> Result<Self> {
        let gateway = config
            .gateway()
            .map(|g| g.address)
            .ok_or_else(|| NodeError::InvalidDeployment("no gateway".to_string()))?;

        let medium = RadioMedium::new();
        for link in &config.links {
            medium.link(link.a, link.b, link.signal_strength).await;
        }

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let mut nodes = BTreeMap::new();
        let mut tasks = Vec::new();

        for node in &config.nodes {
            let engine_config = EngineConfig {
                rng_seed: config
                    .engine
                    .rng_seed
                    .map(|seed| seed.wrapping_add(u64::from_le_bytes(*node.address.as_bytes()))),
                ..config.engine.clone()
            };

            let mut engine = Engine::new(node.address, node.role, engine_config)?;
            if node.role == NodeRole::Sensor {
                engine.set_capability(node.capability)?;
            }

            let (port, inbound) = medium.attach(node.address).await?;
            let events = (node.role == NodeRole::Gateway).then(|| events_tx.clone());

            let (handle, task) = NodeRuntime::spawn(engine, port, inbound, events);
            nodes.insert(node.address, handle);
            tasks.push(task);
        }

        info!(
            nodes = nodes.len(),
            links = config.links.len(),
            gateway = %gateway,
            "Deployment launched"
        );

        Ok(Self {
            medium,
            nodes,
            tasks,
            gateway,
            events: Some(events_rx),
        })
    }

    pub fn medium(&self) -> &RadioMedium {
        &self.medium
    }

    pub fn node(&self, address: &NodeAddress) -> Result<&NodeHandle> {
        self.nodes
            .get(address)
            .ok_or(NodeError::UnknownNode(*address))
    }

    pub fn gateway(&self) -> Result<&NodeHandle> {
        self.node(&self.gateway)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &NodeAddress> {
        self.nodes.keys()
    }

    /// Take the stream of events surfaced at the gateway
    ///
    /// Only the first call gets the receiver. The queue holds at most
    /// [`EVENT_QUEUE_SIZE`] events; the gateway drops events while it is full.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<GatewayEvent>> {
        self.events.take()
    }

    /// Snapshot every node, in address order
    pub async fn snapshots(&self) -> Result<Vec<NodeSnapshot>> {
        let mut snapshots = Vec::with_capacity(self.nodes.len());
        for handle in self.nodes.values() {
            snapshots.push(handle.snapshot().await?);
        }
        Ok(snapshots)
    }

    /// Take a node off the air; its task keeps running but hears nothing
    /// and is heard by nobody
    pub async fn power_off(&self, address: &NodeAddress) -> Result<()> {
        self.node(address)?;
        if self.medium.power_off(address).await? {
            info!(node = %address, "Node powered off");
        }
        Ok(())
    }

    /// Put a powered off node back on the air
    pub async fn power_on(&self, address: &NodeAddress) -> Result<()> {
        self.node(address)?;
        if self.medium.power_on(address).await? {
            info!(node = %address, "Node powered on");
        }
        Ok(())
    }

    /// Stop every node and wait for the tasks to finish
    pub async fn shutdown(self) -> Result<()> {
        for handle in self.nodes.values() {
            if let Err(e) = handle.shutdown().await {
                warn!(node = %handle.address(), "Shutdown request failed: {}", e);
            }
        }

        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Node task failed: {}", e);
            }
        }

        info!("Deployment stopped");
        Ok(())
    }
}
