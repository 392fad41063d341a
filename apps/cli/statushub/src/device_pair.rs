//! A handheld and a wearable paired over the in-process loopback transport.
//!
//! The handheld runs the relay against the configured dashboard; the
//! wearable owns the inbox and issues refreshes.

use crate::error::StatushubError;

use common::ErrorLocation;
use models::NodeId;
use relay_core::inbox::MessageInbox;
use relay_core::relay::{RelayRegistration, RelayService};
use relay_core::requester::{RefreshRequester, RefreshView};
use relay_core::session_client::DashboardSettings;
use relay_core::transport::{LoopbackNetwork, LoopbackTransport};

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use log::info;

pub const HANDHELD_NODE: &str = "handheld";
pub const WEARABLE_NODE: &str = "wearable";

const EMPTY_LISTING_TEXT: &str = "(no services reported)";

pub struct DevicePair {
    network: LoopbackNetwork,
    inbox: Arc<MessageInbox<LoopbackTransport>>,
    requester: RefreshRequester<LoopbackTransport>,
    registration: RelayRegistration<LoopbackTransport>,
}

impl DevicePair {
    /// Attach both devices and start the handheld relay.
    ///
    /// # Errors
    ///
    /// Returns [`StatushubError::Transport`] if the relay cannot start listening.
    pub async fn start(
        settings: DashboardSettings,
        refresh_timeout: Duration,
    ) -> Result<Self, StatushubError> {
        let network = LoopbackNetwork::new();
        let handheld = Arc::new(network.attach(node_id(HANDHELD_NODE)?));
        let wearable = Arc::new(network.attach(node_id(WEARABLE_NODE)?));

        info!("Relay targets dashboard at {}", settings.host_url);
        let service = Arc::new(RelayService::new(handheld, settings));
        let registration = service.listen().await?;

        let inbox = Arc::new(MessageInbox::new(Arc::clone(&wearable)));
        let requester = RefreshRequester::new(wearable, Arc::clone(&inbox))
            .with_refresh_timeout(refresh_timeout);

        Ok(Self {
            network,
            inbox,
            requester,
            registration,
        })
    }

    pub fn network(&self) -> &LoopbackNetwork {
        &self.network
    }

    pub fn is_relaying(&self) -> bool {
        self.registration.is_listening()
    }

    /// Run one refresh from the wearable.
    pub async fn refresh(&self) -> RefreshView {
        self.requester.refresh_view().await
    }

    /// Disconnect the wearable inbox and stop the relay.
    pub async fn shutdown(self) {
        self.inbox.disconnect().await;
        drop(self.registration);
        info!("Device pair shut down");
    }
}

#[track_caller]
fn node_id(id: &str) -> Result<NodeId, StatushubError> {
    NodeId::new(id).map_err(|e| StatushubError::Statushub {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Text for the wearable's list: one `service: message` line per entry,
/// or the message itself.
pub fn render_view(view: &RefreshView) -> String {
    match view {
        RefreshView::Listing(entries) if entries.is_empty() => String::from(EMPTY_LISTING_TEXT),
        RefreshView::Listing(entries) => entries
            .iter()
            .map(|entry| format!("{}: {}", entry.service, entry.message))
            .collect::<Vec<_>>()
            .join("\n"),
        RefreshView::Message(message) => message.clone(),
    }
}
