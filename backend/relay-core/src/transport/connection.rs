//! Awaitable connection lifecycle over a callback-driven transport.

use crate::error::TransportError;
use crate::transport::{SessionId, Transport};

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::watch;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Handed to the transport when a session is opened; the transport calls
/// back as the session comes up or drops.
#[derive(Debug, Clone)]
pub struct ConnectionCallbacks {
    state: Arc<watch::Sender<ConnectionState>>,
}

impl ConnectionCallbacks {
    pub(crate) fn new() -> (Self, watch::Receiver<ConnectionState>) {
        let (tx, rx) = watch::channel(ConnectionState::Connecting);
        (Self { state: Arc::new(tx) }, rx)
    }

    pub fn on_connected(&self) {
        self.state.send_replace(ConnectionState::Connected);
    }

    pub fn on_suspended(&self) {
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

/// Owns at most one transport session.
///
/// `connect` reuses a live session or opens a new one and waits, up to a
/// bound, for the transport to report it connected. `disconnect` is
/// idempotent and also runs on drop.
pub struct ConnectionHandle<T: Transport> {
    transport: Arc<T>,
    session: Option<SessionId>,
    state: Option<watch::Receiver<ConnectionState>>,
}

impl<T: Transport> ConnectionHandle<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            session: None,
            state: None,
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn state(&self) -> ConnectionState {
        match &self.state {
            Some(state) => *state.borrow(),
            None => ConnectionState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// The open session, if `connect` succeeded and `disconnect` has not run.
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// Watch the live session's state, e.g. to notice a suspension.
    pub fn subscribe(&self) -> Option<watch::Receiver<ConnectionState>> {
        self.state.clone()
    }

    /// Connect, waiting at most `bound` for the transport.
    ///
    /// # Errors
    ///
    /// - [`TransportError::ConnectTimeout`] if the session is not up within `bound`
    /// - [`TransportError::Connect`] if the transport refuses or drops the session
    ///
    /// No session is left open on failure.
    pub async fn connect(&mut self, bound: Duration) -> Result<SessionId, TransportError> {
        if let Some(session) = self.session {
            if self.is_connected() {
                debug!("Reusing connected session {session}");
                return Ok(session);
            }
            debug!("Session {session} is no longer connected, reopening");
            self.disconnect();
        }

        let (callbacks, mut state) = ConnectionCallbacks::new();
        let session = self.transport.open_session(callbacks)?;

        let reached = timeout(
            bound,
            state.wait_for(|s| *s != ConnectionState::Connecting),
        )
        .await
        .map(|result| result.map(|s| *s));

        match reached {
            Ok(Ok(ConnectionState::Connected)) => {
                info!("Transport session {session} connected");
                self.session = Some(session);
                self.state = Some(state);
                Ok(session)
            }
            Ok(_) => {
                self.transport.close_session(session);
                Err(TransportError::Connect {
                    message: format!("Session {session} dropped while connecting"),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
            Err(_) => {
                self.transport.close_session(session);
                Err(TransportError::ConnectTimeout {
                    message: format!("Session {session} not connected after {bound:?}"),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.state = None;
        if let Some(session) = self.session.take() {
            self.transport.close_session(session);
            debug!("Transport session {session} closed");
        }
    }
}

impl<T: Transport> Drop for ConnectionHandle<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
