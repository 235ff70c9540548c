//! Per-node task
//!
//! Each node runs in its own tokio task that owns its [`Engine`]. Inbound
//! frames, handle commands and timer expiries are processed one at a time,
//! so the engine never needs a lock.

use std::collections::HashMap;
use std::future;

use canopy_core::{CoreError, Engine, NodeSnapshot};
use canopy_protocol::{GatewayEvent, NodeAddress, OperatorCommand, SensorCapability};
use canopy_topology::{Action, TimerKind};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::error::{NodeError, Result};
use crate::transport::{InboundFrame, Transport};

const COMMAND_QUEUE_SIZE: usize = 64;

/// Pending deadlines, at most one per timer kind
#[derive(Debug, Default)]
pub struct TimerTable {
    deadlines: HashMap<TimerKind, Instant>,
}

impl TimerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `kind`, replacing any pending deadline
    pub fn arm(&mut self, kind: TimerKind, deadline: Instant) {
        self.deadlines.insert(kind, deadline);
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn take_expired(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut expired: Vec<(Instant, TimerKind)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(kind, deadline)| (*deadline, *kind))
            .collect();
        expired.sort();

        for (_, kind) in &expired {
            self.deadlines.remove(kind);
        }
        expired.into_iter().map(|(_, kind)| kind).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.deadlines.len()
    }
}

/// Requests a [`NodeHandle`] sends to its node task
#[derive(Debug)]
pub enum NodeCommand {
    Snapshot(oneshot::Sender<NodeSnapshot>),
    SetCapability(
        SensorCapability,
        oneshot::Sender<std::result::Result<(), CoreError>>,
    ),
    Operator(OperatorCommand),
    Shutdown,
}

/// Control handle to a running node
#[derive(Debug, Clone)]
pub struct NodeHandle {
    address: NodeAddress,
    commands: mpsc::Sender<NodeCommand>,
}

impl NodeHandle {
    pub fn address(&self) -> NodeAddress {
        self.address
    }

    pub async fn snapshot(&self) -> Result<NodeSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.request(NodeCommand::Snapshot(tx)).await?;
        rx.await.map_err(|_| NodeError::HandleClosed)
    }

    pub async fn set_capability(&self, capability: SensorCapability) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.request(NodeCommand::SetCapability(capability, tx))
            .await?;
        rx.await.map_err(|_| NodeError::HandleClosed)??;
        Ok(())
    }

    /// Execute an operator command at this node
    pub async fn operator(&self, command: OperatorCommand) -> Result<()> {
        self.request(NodeCommand::Operator(command)).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.request(NodeCommand::Shutdown).await
    }

    async fn request(&self, command: NodeCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| NodeError::HandleClosed)
    }
}

/// Event loop of a single node
pub struct NodeRuntime<T: Transport> {
    engine: Engine,
    transport: T,
    inbound: mpsc::UnboundedReceiver<InboundFrame>,
    commands: mpsc::Receiver<NodeCommand>,
    events: Option<mpsc::Sender<GatewayEvent>>,
    timers: TimerTable,
    color: &'static str,
}

impl<T: Transport + 'static> NodeRuntime<T> {
    pub fn new(
        engine: Engine,
        transport: T,
        inbound: mpsc::UnboundedReceiver<InboundFrame>,
        events: Option<mpsc::Sender<GatewayEvent>>,
    ) -> (Self, NodeHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let handle = NodeHandle {
            address: engine.address(),
            commands: tx,
        };
        let color = engine.status_color();

        if transport.local_address() != engine.address() {
            warn!(
                node = %engine.address(),
                transport = %transport.local_address(),
                "Transport address differs from node address"
            );
        }

        let runtime = Self {
            engine,
            transport,
            inbound,
            commands: rx,
            events,
            timers: TimerTable::new(),
            color,
        };
        (runtime, handle)
    }

    /// Spawn the node on the current tokio runtime
    pub fn spawn(
        engine: Engine,
        transport: T,
        inbound: mpsc::UnboundedReceiver<InboundFrame>,
        events: Option<mpsc::Sender<GatewayEvent>>,
    ) -> (NodeHandle, JoinHandle<()>) {
        let (runtime, handle) = Self::new(engine, transport, inbound, events);
        let task = tokio::spawn(runtime.run());
        (handle, task)
    }

    pub async fn run(mut self) {
        let address = self.engine.address();
        info!(node = %address, color = self.color, "Node running");

        let actions = self.engine.start();
        self.execute(actions).await;

        loop {
            let next_deadline = self.timers.next_deadline();
            let timer = async move {
                match next_deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => future::pending::<()>().await,
                }
            };

            tokio::select! {
                frame = self.inbound.recv() => match frame {
                    Some(frame) => self.on_frame(frame).await,
                    None => break,
                },
                command = self.commands.recv() => match command {
                    Some(NodeCommand::Shutdown) | None => break,
                    Some(command) => self.on_command(command).await,
                },
                _ = timer => self.on_timers().await,
            }

            self.log_color_change();
        }

        info!(node = %address, pending_timers = self.timers.len(), "Node stopped");
    }

    async fn on_frame(&mut self, frame: InboundFrame) {
        let packet = match canopy_protocol::decode(&frame.bytes) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(node = %self.engine.address(), source = %frame.source, "Dropping frame: {}", e);
                return;
            }
        };

        let actions = self
            .engine
            .handle_packet(packet, frame.source, frame.signal_strength);
        self.execute(actions).await;
    }

    async fn on_command(&mut self, command: NodeCommand) {
        match command {
            NodeCommand::Snapshot(reply) => {
                let _ = reply.send(self.engine.snapshot());
            }
            NodeCommand::SetCapability(capability, reply) => {
                let _ = reply.send(self.engine.set_capability(capability));
            }
            NodeCommand::Operator(command) => {
                debug!(node = %self.engine.address(), command = %command, "Operator command");
                let actions = self.engine.operator_command(&command);
                self.execute(actions).await;
            }
            NodeCommand::Shutdown => {}
        }
    }

    async fn on_timers(&mut self) {
        for timer in self.timers.take_expired(Instant::now()) {
            let actions = self.engine.handle_timer(timer);
            self.execute(actions).await;
        }
    }

    async fn execute(&mut self, actions: Vec<Action>) {
        let address = self.engine.address();

        for action in actions {
            match action {
                Action::Send {
                    packet,
                    destination,
                } => {
                    let frame = match canopy_protocol::encode(&packet) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!(node = %address, "Failed to encode packet: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = self.transport.send(&frame, destination).await {
                        warn!(node = %address, ?destination, "Send failed: {}", e);
                    }
                }
                Action::ArmTimer { timer, after } => {
                    self.timers.arm(timer, Instant::now() + after);
                }
                Action::SetActuator { actuator, active } => {
                    info!(node = %address, ?actuator, active, "Actuator switched");
                }
                Action::Surface(event) => {
                    info!(node = %address, "{}", event);
                    if let Some(events) = &self.events {
                        match events.try_send(event) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                debug!(node = %address, "Event queue full, dropping event");
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                debug!(node = %address, "Event receiver gone");
                            }
                        }
                    }
                }
            }
        }
    }

    fn log_color_change(&mut self) {
        let color = self.engine.status_color();
        if color != self.color {
            info!(
                node = %self.engine.address(),
                from = self.color,
                to = color,
                "Status color changed"
            );
            self.color = color;
        }
    }
}
