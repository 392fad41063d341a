//! Short-lived sending side of the relay.
//!
//! A [`MessageChannel`] opens its own transport session, delivers one or a
//! few messages with at most one attempt each, and is torn down. It never
//! waits for an application-level reply; pairing a request with its answer
//! is up to the caller (a [`MessageInbox`](crate::inbox::MessageInbox) on the
//! wearable, the inbound message's source node on the handheld).

use crate::error::TransportError;
use crate::transport::{ConnectionHandle, Transport};

use common::ErrorLocation;
use models::NodeId;

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

pub const SENDER_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Node(NodeId),
    /// The first node the transport reports as connected.
    FirstAvailable,
}

pub struct MessageChannel<T: Transport> {
    connection: ConnectionHandle<T>,
    connect_timeout: Duration,
}

impl<T: Transport> MessageChannel<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            connection: ConnectionHandle::new(transport),
            connect_timeout: SENDER_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Open the transport session.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectTimeout`] or [`TransportError::Connect`]
    /// when the session does not come up; no handle stays open in that case.
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        self.connection.connect(self.connect_timeout).await?;
        Ok(())
    }

    /// Send one message and wait for the transport's delivery acknowledgment.
    ///
    /// Returns the node the message went to.
    ///
    /// # Errors
    ///
    /// - [`TransportError::NotConnected`] if `connect` has not succeeded
    /// - [`TransportError::NoConnectedNodes`] for [`Target::FirstAvailable`] with no peers
    /// - [`TransportError::Delivery`] if the transport does not acknowledge
    pub async fn send(
        &self,
        target: &Target,
        path: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<NodeId, TransportError> {
        let session = self
            .connection
            .session()
            .filter(|_| self.connection.is_connected())
            .ok_or_else(|| TransportError::NotConnected {
                message: String::from("Message channel is not connected"),
                location: ErrorLocation::from(Location::caller()),
            })?;
        let transport = self.connection.transport();

        let node = match target {
            Target::Node(node) => node.clone(),
            Target::FirstAvailable => transport
                .connected_nodes(session)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| TransportError::NoConnectedNodes {
                    message: format!("No nodes reachable from {}", transport.local_node()),
                    location: ErrorLocation::from(Location::caller()),
                })?,
        };

        let size = payload.as_ref().map_or(0, Vec::len);
        transport.send_message(session, &node, path, payload).await?;
        info!("Sent {path} to {node} ({size} bytes)");

        Ok(node)
    }

    /// Send a UTF-8 text payload to a specific node.
    pub async fn send_text(
        &self,
        node: &NodeId,
        path: &str,
        text: &str,
    ) -> Result<NodeId, TransportError> {
        self.send(&Target::Node(node.clone()), path, Some(text.as_bytes().to_vec()))
            .await
    }

    /// Release the session. Safe to call repeatedly or without `connect`.
    pub fn disconnect(&mut self) {
        if self.connection.session().is_some() {
            debug!("Releasing message channel");
        }
        self.connection.disconnect();
    }
}
