//! Wearable-side refresh cycle.
//!
//! The protocol has no correlation id: at most one refresh may be in flight
//! per node pair. The inbox is cleared before the request goes out so a late
//! reply from an abandoned cycle is not mistaken for the new answer; a stale
//! reply that lands between the clear and the new reply can still win.

use crate::channel::{MessageChannel, SENDER_CONNECT_TIMEOUT, Target};
use crate::codec;
use crate::error::RelayError;
use crate::inbox::MessageInbox;
use crate::transport::Transport;

use common::ErrorLocation;
use models::{EntryCollection, NodeId, RelayPath};

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// What the wearable shows after a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshView {
    Listing(EntryCollection),
    Message(String),
}

pub struct RefreshRequester<T: Transport> {
    transport: Arc<T>,
    inbox: Arc<MessageInbox<T>>,
    refresh_timeout: Duration,
    connect_timeout: Duration,
}

impl<T: Transport> RefreshRequester<T> {
    pub fn new(transport: Arc<T>, inbox: Arc<MessageInbox<T>>) -> Self {
        Self {
            transport,
            inbox,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            connect_timeout: SENDER_CONNECT_TIMEOUT,
        }
    }

    pub fn with_refresh_timeout(mut self, refresh_timeout: Duration) -> Self {
        self.refresh_timeout = refresh_timeout;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Request the overview from the first connected node and wait for its reply.
    ///
    /// # Errors
    ///
    /// - [`RelayError::Transport`] if the inbox or channel cannot connect or the
    ///   request is not delivered
    /// - [`RelayError::Remote`] if the handheld replied with `/error`
    /// - [`RelayError::Codec`] if the listing cannot be decoded
    /// - [`RelayError::Timeout`] if nothing arrives in time
    pub async fn refresh(&self) -> Result<EntryCollection, RelayError> {
        self.inbox.connect().await?;
        self.inbox.clear_queue();

        let mut channel = MessageChannel::new(Arc::clone(&self.transport))
            .with_connect_timeout(self.connect_timeout);
        channel.connect().await?;
        let sent = channel
            .send(&Target::FirstAvailable, RelayPath::Refresh.as_str(), None)
            .await;
        channel.disconnect();

        let handheld = sent?;
        info!("Refresh sent to {handheld}, waiting up to {:?}", self.refresh_timeout);

        self.await_reply(&handheld).await
    }

    async fn await_reply(&self, handheld: &NodeId) -> Result<EntryCollection, RelayError> {
        let deadline = Instant::now().checked_add(self.refresh_timeout);

        loop {
            let remaining = deadline.map_or(self.refresh_timeout, |deadline| {
                deadline.saturating_duration_since(Instant::now())
            });
            let Some(message) = self.inbox.receive(remaining).await? else {
                return Err(RelayError::Timeout {
                    message: format!("No reply from {handheld} within {:?}", self.refresh_timeout),
                    location: ErrorLocation::from(Location::caller()),
                });
            };

            if message.source != *handheld {
                debug!("Skipping {} from unrelated node {}", message.path, message.source);
                continue;
            }

            match message.relay_path() {
                Some(RelayPath::Listing) => {
                    let entries = codec::decode(message.payload.as_deref().unwrap_or_default())?;
                    info!("Received listing with {} entries", entries.len());
                    return Ok(entries);
                }
                Some(RelayPath::Error) => {
                    return Err(RelayError::Remote {
                        message: message.payload_text(),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                _ => debug!("Skipping {} while waiting for a refresh reply", message.path),
            }
        }
    }

    /// Run [`refresh`](Self::refresh) and fold the result into what the user sees.
    pub async fn refresh_view(&self) -> RefreshView {
        match self.refresh().await {
            Ok(entries) => RefreshView::Listing(entries),
            Err(e) => {
                warn!("Refresh failed: {e}");
                RefreshView::Message(e.user_message())
            }
        }
    }
}
