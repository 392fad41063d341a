//! Contract with the node-addressed message transport.
//!
//! The relay only needs a narrow slice of a wearable messaging SDK: open a
//! session (whose bring-up is reported through callbacks), list connected
//! nodes, send a path-addressed message and wait for the transport's
//! acknowledgment, and register a listener for inbound messages.
//!
//! [`ConnectionHandle`] turns the callback-driven session lifecycle into
//! awaitable `connect`/`disconnect` calls. [`LoopbackNetwork`] is an
//! in-memory implementation used by tests and the demo binary.

pub mod connection;
pub mod loopback;

pub use connection::{ConnectionCallbacks, ConnectionHandle, ConnectionState};
pub use loopback::{LoopbackNetwork, LoopbackTransport};

use crate::error::TransportError;

use models::{NodeId, RelayPath};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use uuid::Uuid;

/// Identifies one transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An inbound message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub source: NodeId,
    pub path: String,
    pub payload: Option<Vec<u8>>,
}

impl PendingMessage {
    pub fn new(source: NodeId, path: impl Into<String>, payload: Option<Vec<u8>>) -> Self {
        Self {
            source,
            path: path.into(),
            payload,
        }
    }

    pub fn relay_path(&self) -> Option<RelayPath> {
        RelayPath::parse(&self.path)
    }

    /// Payload as text, replacing invalid UTF-8. Empty when absent.
    pub fn payload_text(&self) -> String {
        self.payload
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}

/// Receives inbound messages on the transport's own thread.
///
/// Implementations must return quickly; anything slow belongs on a spawned task.
pub trait MessageListener: Send + Sync {
    fn on_message(&self, message: PendingMessage);
}

/// The transport SDK as seen by the relay.
pub trait Transport: Send + Sync + 'static {
    /// The node this transport runs on.
    fn local_node(&self) -> NodeId;

    /// Start bringing up a session.
    ///
    /// Returns immediately; progress is reported through `callbacks`.
    fn open_session(&self, callbacks: ConnectionCallbacks) -> Result<SessionId, TransportError>;

    /// Tear a session down. Unknown sessions are ignored.
    fn close_session(&self, session: SessionId);

    /// Nodes currently reachable from this session, in transport order.
    fn connected_nodes(
        &self,
        session: SessionId,
    ) -> impl Future<Output = Result<Vec<NodeId>, TransportError>> + Send;

    /// Deliver a message, resolving once the transport acknowledges it.
    ///
    /// The acknowledgment only means the transport accepted and moved the
    /// bytes; it says nothing about the receiving application.
    fn send_message(
        &self,
        session: SessionId,
        target: &NodeId,
        path: &str,
        payload: Option<Vec<u8>>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Register the session's listener, replacing any earlier one.
    fn add_listener(
        &self,
        session: SessionId,
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), TransportError>;

    fn remove_listener(&self, session: SessionId);
}
