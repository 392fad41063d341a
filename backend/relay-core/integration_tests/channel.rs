use crate::helpers::node;

use relay_core::channel::{MessageChannel, Target};
use relay_core::error::TransportError;
use relay_core::inbox::MessageInbox;
use relay_core::transport::LoopbackNetwork;

use std::sync::Arc;
use std::time::Duration;

/// **VALUE**: Verifies that FirstAvailable with no peers fails with NoConnectedNodes.
///
/// **WHY THIS MATTERS**: A watch out of range of its phone should say so rather than time
/// out.
///
/// **BUG THIS CATCHES**: Would catch indexing into an empty node list.
#[tokio::test]
async fn given_no_peers_when_sending_to_first_available_then_returns_no_connected_nodes() {
    // GIVEN: A lone, connected watch
    let network = LoopbackNetwork::new();
    let watch = Arc::new(network.attach(node("watch")));
    let mut channel = MessageChannel::new(watch);
    channel.connect().await.unwrap();

    // WHEN: Sending to the first available node
    let result = channel.send(&Target::FirstAvailable, "/refresh", None).await;

    // THEN: NoConnectedNodes, classified as a connectivity problem
    let error = result.unwrap_err();
    assert!(matches!(error, TransportError::NoConnectedNodes { .. }));
    assert!(error.is_connectivity());
}

#[tokio::test]
async fn given_unconnected_channel_when_sending_then_returns_not_connected() {
    let network = LoopbackNetwork::new();
    let watch = Arc::new(network.attach(node("watch")));
    let _phone = network.attach(node("phone"));
    let channel = MessageChannel::new(watch);

    let result = channel.send(&Target::FirstAvailable, "/refresh", None).await;

    assert!(matches!(result, Err(TransportError::NotConnected { .. })));
}

/// **VALUE**: Verifies that a channel whose node stays offline fails within its bound and
/// leaves no session behind.
///
/// **WHY THIS MATTERS**: The handheld opens a reply channel for every refresh; leaked
/// half-open sessions would accumulate for the app's lifetime.
///
/// **BUG THIS CATCHES**: Would catch a missing close on connect timeout.
#[tokio::test]
async fn given_offline_node_when_channel_connects_then_times_out_cleanly() {
    // GIVEN: An offline phone
    let network = LoopbackNetwork::new();
    let phone = Arc::new(network.attach(node("phone")));
    network.set_online(&node("phone"), false);
    let mut channel =
        MessageChannel::new(phone).with_connect_timeout(Duration::from_millis(100));

    // WHEN: Connecting
    let result = channel.connect().await;

    // THEN: Timeout, nothing left open
    assert!(matches!(result, Err(TransportError::ConnectTimeout { .. })));
    assert!(!channel.is_connected());
    assert_eq!(network.session_count(&node("phone")), 0);
}

#[tokio::test]
async fn given_connected_channel_when_sending_text_then_peer_inbox_receives_it() {
    // GIVEN: A listening watch and a connected phone channel
    let network = LoopbackNetwork::new();
    let phone = Arc::new(network.attach(node("phone")));
    let watch = Arc::new(network.attach(node("watch")));
    let inbox = MessageInbox::new(watch);
    inbox.connect().await.unwrap();
    let mut channel = MessageChannel::new(phone);
    channel.connect().await.unwrap();

    // WHEN: Sending text, then releasing the channel
    let target = channel
        .send_text(&node("watch"), "/error", "login incorrect")
        .await
        .unwrap();
    channel.disconnect();
    channel.disconnect();

    // THEN: Delivered to the watch with the phone as source; channel released
    assert_eq!(target, node("watch"));
    let message = inbox
        .receive(Duration::from_secs(1))
        .await
        .unwrap()
        .expect("message should be queued");
    assert_eq!(message.source, node("phone"));
    assert_eq!(message.payload_text(), "login incorrect");
    assert_eq!(network.session_count(&node("phone")), 0);
}

#[tokio::test]
async fn given_rejecting_target_when_sending_then_returns_delivery_error() {
    let network = LoopbackNetwork::new();
    let phone = Arc::new(network.attach(node("phone")));
    let _watch = network.attach(node("watch"));
    network.set_rejecting_deliveries(&node("watch"), true);
    let mut channel = MessageChannel::new(phone);
    channel.connect().await.unwrap();

    let result = channel
        .send(&Target::Node(node("watch")), "/listing", Some(b"[]".to_vec()))
        .await;

    let error = result.unwrap_err();
    assert!(matches!(error, TransportError::Delivery { .. }));
    assert!(!error.is_connectivity());
}
