//! In-memory transport connecting nodes inside one process.
//!
//! Every attached node gets a [`LoopbackTransport`]. Delivery happens inside
//! `send_message` before it resolves, so the acknowledgment implies the
//! target's listeners have run and per-source ordering is preserved.
//!
//! The network can take a node offline (its sessions are suspended and new
//! sessions stay in `Connecting`), bring it back (pending sessions complete)
//! and make a node reject deliveries.

use crate::error::TransportError;
use crate::transport::{
    ConnectionCallbacks, MessageListener, PendingMessage, SessionId, Transport,
};

use common::ErrorLocation;
use models::NodeId;

use std::collections::{BTreeMap, HashMap};
use std::panic::Location;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    Connecting,
    Connected,
    Suspended,
}

struct SessionEntry {
    callbacks: ConnectionCallbacks,
    phase: SessionPhase,
    listener: Option<Arc<dyn MessageListener>>,
}

struct NodeEntry {
    online: bool,
    rejecting_deliveries: bool,
    sessions: HashMap<SessionId, SessionEntry>,
}

impl NodeEntry {
    fn new() -> Self {
        Self {
            online: true,
            rejecting_deliveries: false,
            sessions: HashMap::new(),
        }
    }
}

#[derive(Default)]
struct NetworkState {
    nodes: BTreeMap<NodeId, NodeEntry>,
}

#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a node (online) and return its transport. Attaching an existing
    /// node returns another transport for the same node.
    pub fn attach(&self, node: NodeId) -> LoopbackTransport {
        self.lock()
            .nodes
            .entry(node.clone())
            .or_insert_with(NodeEntry::new);
        info!("Loopback node {node} attached");
        LoopbackTransport {
            node,
            network: self.clone(),
        }
    }

    /// Take a node offline or bring it back.
    ///
    /// Offline suspends the node's connected sessions and drops their
    /// listeners. Online completes sessions still waiting to connect;
    /// suspended sessions stay suspended and must be reopened.
    pub fn set_online(&self, node: &NodeId, online: bool) {
        let mut state = self.lock();
        let Some(entry) = state.nodes.get_mut(node) else {
            return;
        };
        entry.online = online;

        for session in entry.sessions.values_mut() {
            match (online, session.phase) {
                (true, SessionPhase::Connecting) => {
                    session.phase = SessionPhase::Connected;
                    session.callbacks.on_connected();
                }
                (false, SessionPhase::Connected) => {
                    session.phase = SessionPhase::Suspended;
                    session.listener = None;
                    session.callbacks.on_suspended();
                }
                _ => {}
            }
        }
        info!("Loopback node {node} is now {}", if online { "online" } else { "offline" });
    }

    pub fn set_rejecting_deliveries(&self, node: &NodeId, rejecting: bool) {
        if let Some(entry) = self.lock().nodes.get_mut(node) {
            entry.rejecting_deliveries = rejecting;
        }
    }

    /// Number of open sessions on `node`, in any phase.
    pub fn session_count(&self, node: &NodeId) -> usize {
        self.lock()
            .nodes
            .get(node)
            .map(|entry| entry.sessions.len())
            .unwrap_or(0)
    }

    /// Number of registered listeners on `node`.
    pub fn listener_count(&self, node: &NodeId) -> usize {
        self.lock()
            .nodes
            .get(node)
            .map(|entry| {
                entry
                    .sessions
                    .values()
                    .filter(|s| s.listener.is_some())
                    .count()
            })
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct LoopbackTransport {
    node: NodeId,
    network: LoopbackNetwork,
}

impl LoopbackTransport {
    pub fn network(&self) -> &LoopbackNetwork {
        &self.network
    }

    #[track_caller]
    fn not_connected(&self, session: SessionId) -> TransportError {
        TransportError::NotConnected {
            message: format!("Session {session} on {} is not connected", self.node),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    fn delivery_failed(target: &NodeId, message: &str) -> TransportError {
        TransportError::Delivery {
            node: target.to_string(),
            message: message.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    fn is_connected(state: &NetworkState, node: &NodeId, session: SessionId) -> bool {
        state
            .nodes
            .get(node)
            .and_then(|entry| entry.sessions.get(&session))
            .is_some_and(|s| s.phase == SessionPhase::Connected)
    }
}

impl Transport for LoopbackTransport {
    fn local_node(&self) -> NodeId {
        self.node.clone()
    }

    fn open_session(&self, callbacks: ConnectionCallbacks) -> Result<SessionId, TransportError> {
        let mut state = self.network.lock();
        let entry = state
            .nodes
            .get_mut(&self.node)
            .ok_or_else(|| TransportError::Connect {
                message: format!("Node {} is not attached to the network", self.node),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let session = SessionId::new();
        let phase = if entry.online {
            callbacks.on_connected();
            SessionPhase::Connected
        } else {
            SessionPhase::Connecting
        };
        entry.sessions.insert(
            session,
            SessionEntry {
                callbacks,
                phase,
                listener: None,
            },
        );
        debug!("Loopback session {session} opened on {} ({phase:?})", self.node);

        Ok(session)
    }

    fn close_session(&self, session: SessionId) {
        let mut state = self.network.lock();
        if let Some(entry) = state.nodes.get_mut(&self.node) {
            if entry.sessions.remove(&session).is_some() {
                debug!("Loopback session {session} closed on {}", self.node);
            }
        }
    }

    async fn connected_nodes(&self, session: SessionId) -> Result<Vec<NodeId>, TransportError> {
        let state = self.network.lock();
        if !Self::is_connected(&state, &self.node, session) {
            return Err(self.not_connected(session));
        }

        Ok(state
            .nodes
            .iter()
            .filter(|(id, entry)| **id != self.node && entry.online)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn send_message(
        &self,
        session: SessionId,
        target: &NodeId,
        path: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<(), TransportError> {
        let listeners: Vec<Arc<dyn MessageListener>> = {
            let state = self.network.lock();
            if !Self::is_connected(&state, &self.node, session) {
                return Err(self.not_connected(session));
            }

            let entry = state
                .nodes
                .get(target)
                .ok_or_else(|| Self::delivery_failed(target, "Unknown node"))?;
            if !entry.online {
                return Err(Self::delivery_failed(target, "Node is offline"));
            }
            if entry.rejecting_deliveries {
                return Err(Self::delivery_failed(target, "Delivery rejected"));
            }

            entry
                .sessions
                .values()
                .filter(|s| s.phase == SessionPhase::Connected)
                .filter_map(|s| s.listener.clone())
                .collect()
        };

        debug!(
            "Delivering {path} from {} to {target} ({} listeners)",
            self.node,
            listeners.len()
        );
        for listener in listeners {
            listener.on_message(PendingMessage::new(
                self.node.clone(),
                path,
                payload.clone(),
            ));
        }

        Ok(())
    }

    fn add_listener(
        &self,
        session: SessionId,
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), TransportError> {
        let mut state = self.network.lock();
        let registered = state
            .nodes
            .get_mut(&self.node)
            .and_then(|entry| entry.sessions.get_mut(&session))
            .filter(|s| s.phase == SessionPhase::Connected)
            .map(|s| s.listener = Some(listener))
            .is_some();

        if registered {
            Ok(())
        } else {
            Err(self.not_connected(session))
        }
    }

    fn remove_listener(&self, session: SessionId) {
        let mut state = self.network.lock();
        if let Some(s) = state
            .nodes
            .get_mut(&self.node)
            .and_then(|entry| entry.sessions.get_mut(&session))
        {
            s.listener = None;
        }
    }
}
