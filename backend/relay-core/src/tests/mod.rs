// Unit tests for relay-core internals.
// Integration tests for the public relay cycle are in integration_tests/.

mod config;
mod connection;
mod inbox;
mod loopback;

use crate::transport::{LoopbackNetwork, LoopbackTransport};

use models::NodeId;

use std::sync::Arc;

pub(crate) fn node(id: &str) -> NodeId {
    NodeId::new(id).expect("valid node id")
}

/// A network with a handheld ("phone") and a wearable ("watch") attached.
pub(crate) fn paired_nodes() -> (LoopbackNetwork, Arc<LoopbackTransport>, Arc<LoopbackTransport>) {
    let network = LoopbackNetwork::new();
    let phone = Arc::new(network.attach(node("phone")));
    let watch = Arc::new(network.attach(node("watch")));
    (network, phone, watch)
}
