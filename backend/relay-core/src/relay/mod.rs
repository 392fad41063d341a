//! Handheld-side responder for `/refresh` requests.
//!
//! For each refresh the service logs in to the dashboard with the stored
//! settings, fetches the overview, encodes it, and replies to the node that
//! asked with either `/listing` or `/error`. The reply goes out on a fresh
//! short-lived [`MessageChannel`] that is always released afterwards.

use crate::channel::{MessageChannel, SENDER_CONNECT_TIMEOUT, Target};
use crate::codec;
use crate::error::{RelayError, TransportError};
use crate::session_client::{DashboardSettings, SessionClient};
use crate::transport::{ConnectionHandle, MessageListener, PendingMessage, Transport};

use common::ErrorLocation;
use models::RelayPath;

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::runtime::Handle;

const LOGIN_REJECTED_MESSAGE: &str = "login incorrect";

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Not a `/refresh`; left alone.
    Ignored,
    /// No reply channel could be opened, so nothing was sent.
    NoChannel,
    /// A reply was delivered on the given path.
    Replied(RelayPath),
    /// The reply was built but the transport did not deliver it.
    ReplyFailed,
}

pub struct RelayService<T: Transport> {
    transport: Arc<T>,
    settings: DashboardSettings,
    connect_timeout: Duration,
}

impl<T: Transport> RelayService<T> {
    pub fn new(transport: Arc<T>, settings: DashboardSettings) -> Self {
        Self {
            transport,
            settings,
            connect_timeout: SENDER_CONNECT_TIMEOUT,
        }
    }

    /// Bound used when opening the reply channel and the listening session.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Run one relay cycle for an inbound message.
    ///
    /// Only a failure to open the reply channel goes unanswered; every
    /// dashboard or encoding failure becomes an `/error` reply.
    pub async fn handle_message(&self, message: PendingMessage) -> RelayOutcome {
        if message.relay_path() != Some(RelayPath::Refresh) {
            debug!("Ignoring {} from {}", message.path, message.source);
            return RelayOutcome::Ignored;
        }
        let requester = message.source;
        info!("Refresh requested by {requester}");

        let mut channel = MessageChannel::new(Arc::clone(&self.transport))
            .with_connect_timeout(self.connect_timeout);
        if let Err(e) = channel.connect().await {
            warn!("No reply channel for {requester}, dropping refresh: {e}");
            return RelayOutcome::NoChannel;
        }

        let (path, payload) = match self.fetch_listing().await {
            Ok(listing) => (RelayPath::Listing, listing),
            Err(e) => {
                warn!("Refresh for {requester} failed: {e}");
                (RelayPath::Error, e.diagnostic().into_bytes())
            }
        };

        let outcome = match channel
            .send(&Target::Node(requester.clone()), path.as_str(), Some(payload))
            .await
        {
            Ok(_) => RelayOutcome::Replied(path),
            Err(e) => {
                warn!("Could not deliver {path} to {requester}: {e}");
                RelayOutcome::ReplyFailed
            }
        };

        channel.disconnect();
        outcome
    }

    /// Log in, fetch and encode. A fresh session per cycle.
    async fn fetch_listing(&self) -> Result<Vec<u8>, RelayError> {
        let mut client = SessionClient::new(&self.settings.host_url)?;

        if !client.login(&self.settings.password).await? {
            return Err(RelayError::Auth {
                message: String::from(LOGIN_REJECTED_MESSAGE),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let entries = client.fetch_overview().await?;
        Ok(codec::encode(&entries)?)
    }

    /// Listen for inbound messages until the returned registration is dropped.
    ///
    /// Each message is handled on its own task so the transport callback
    /// returns immediately.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the listening session cannot be opened.
    pub async fn listen(self: Arc<Self>) -> Result<RelayRegistration<T>, TransportError> {
        let mut connection = ConnectionHandle::new(Arc::clone(&self.transport));
        let session = connection.connect(self.connect_timeout).await?;

        let listener = Arc::new(RelayListener {
            service: Arc::clone(&self),
            runtime: Handle::current(),
        });
        self.transport.add_listener(session, listener)?;
        info!(
            "Relay listening on {} (session {session})",
            self.transport.local_node()
        );

        Ok(RelayRegistration { connection })
    }
}

struct RelayListener<T: Transport> {
    service: Arc<RelayService<T>>,
    runtime: Handle,
}

impl<T: Transport> MessageListener for RelayListener<T> {
    fn on_message(&self, message: PendingMessage) {
        let service = Arc::clone(&self.service);
        self.runtime.spawn(async move {
            let outcome = service.handle_message(message).await;
            debug!("Relay cycle finished: {outcome:?}");
        });
    }
}

/// Keeps the relay listening. Dropping it unregisters and closes the session.
pub struct RelayRegistration<T: Transport> {
    connection: ConnectionHandle<T>,
}

impl<T: Transport> RelayRegistration<T> {
    pub fn is_listening(&self) -> bool {
        self.connection.is_connected()
    }
}

impl<T: Transport> Drop for RelayRegistration<T> {
    fn drop(&mut self) {
        if let Some(session) = self.connection.session() {
            self.connection.transport().remove_listener(session);
            info!("Relay stopped listening (session {session})");
        }
    }
}
