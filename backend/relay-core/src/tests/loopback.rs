use super::{node, paired_nodes};
use crate::error::TransportError;
use crate::transport::{
    ConnectionHandle, LoopbackNetwork, MessageListener, PendingMessage, Transport,
};

use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<PendingMessage>>,
}

impl MessageListener for Recorder {
    fn on_message(&self, message: PendingMessage) {
        self.seen.lock().unwrap().push(message);
    }
}

/// **VALUE**: Verifies that connected_nodes lists online peers in stable order, excluding self.
///
/// **WHY THIS MATTERS**: The wearable sends its refresh to the first listed node; an
/// unstable or self-including list sends the request into the void.
///
/// **BUG THIS CATCHES**: Would catch listing the local node or offline nodes.
#[tokio::test]
async fn given_three_nodes_with_one_offline_when_listing_then_returns_online_peers_only() {
    // GIVEN: phone, watch and tablet; tablet offline
    let (network, phone, _watch) = paired_nodes();
    let _tablet = network.attach(node("tablet"));
    let _aardvark = network.attach(node("aardvark"));
    network.set_online(&node("tablet"), false);
    let mut handle = ConnectionHandle::new(Arc::clone(&phone));
    let session = handle.connect(Duration::from_secs(1)).await.unwrap();

    // WHEN: Listing from the phone
    let nodes = phone.connected_nodes(session).await.unwrap();

    // THEN: Sorted online peers
    assert_eq!(nodes, vec![node("aardvark"), node("watch")]);
}

#[tokio::test]
async fn given_connected_sender_when_sending_then_listener_sees_source_path_and_payload() {
    // GIVEN: watch listening, phone connected
    let (_network, phone, watch) = paired_nodes();
    let mut receiver = ConnectionHandle::new(Arc::clone(&watch));
    let watch_session = receiver.connect(Duration::from_secs(1)).await.unwrap();
    let recorder = Arc::new(Recorder::default());
    watch.add_listener(watch_session, recorder.clone()).unwrap();
    let mut sender = ConnectionHandle::new(Arc::clone(&phone));
    let session = sender.connect(Duration::from_secs(1)).await.unwrap();

    // WHEN: Sending two messages
    phone
        .send_message(session, &node("watch"), "/listing", Some(b"[]".to_vec()))
        .await
        .unwrap();
    phone
        .send_message(session, &node("watch"), "/error", None)
        .await
        .unwrap();

    // THEN: Delivered in order, before send resolved
    let seen = recorder.seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            PendingMessage::new(node("phone"), "/listing", Some(b"[]".to_vec())),
            PendingMessage::new(node("phone"), "/error", None),
        ]
    );
}

/// **VALUE**: Verifies each delivery failure surfaces as a Delivery error naming the target.
///
/// **WHY THIS MATTERS**: The relay reports reply failures; it needs to tell them apart
/// from connectivity errors.
///
/// **BUG THIS CATCHES**: Would catch silent drops when the target is offline or rejecting.
#[tokio::test]
async fn given_unreachable_targets_when_sending_then_returns_delivery_errors() {
    // GIVEN: A connected phone
    let (network, phone, _watch) = paired_nodes();
    let mut sender = ConnectionHandle::new(Arc::clone(&phone));
    let session = sender.connect(Duration::from_secs(1)).await.unwrap();

    // WHEN/THEN: Unknown node
    let unknown = phone.send_message(session, &node("ghost"), "/refresh", None).await;
    assert!(matches!(unknown, Err(TransportError::Delivery { ref node, .. }) if node == "ghost"));

    // WHEN/THEN: Rejecting node
    network.set_rejecting_deliveries(&node("watch"), true);
    let rejected = phone.send_message(session, &node("watch"), "/refresh", None).await;
    assert!(matches!(rejected, Err(TransportError::Delivery { ref message, .. }) if message == "Delivery rejected"));

    // WHEN/THEN: Offline node
    network.set_rejecting_deliveries(&node("watch"), false);
    network.set_online(&node("watch"), false);
    let offline = phone.send_message(session, &node("watch"), "/refresh", None).await;
    assert!(matches!(offline, Err(TransportError::Delivery { ref message, .. }) if message == "Node is offline"));
}

#[tokio::test]
async fn given_closed_session_when_sending_then_returns_not_connected() {
    let (_network, phone, _watch) = paired_nodes();
    let mut sender = ConnectionHandle::new(Arc::clone(&phone));
    let session = sender.connect(Duration::from_secs(1)).await.unwrap();
    sender.disconnect();

    let result = phone.send_message(session, &node("watch"), "/refresh", None).await;

    assert!(matches!(result, Err(TransportError::NotConnected { .. })));
}

#[tokio::test]
async fn given_node_goes_offline_when_checking_listeners_then_listener_dropped() {
    let network = LoopbackNetwork::new();
    let watch = Arc::new(network.attach(node("watch")));
    let mut handle = ConnectionHandle::new(Arc::clone(&watch));
    let session = handle.connect(Duration::from_secs(1)).await.unwrap();
    watch
        .add_listener(session, Arc::new(Recorder::default()))
        .unwrap();
    assert_eq!(network.listener_count(&node("watch")), 1);

    network.set_online(&node("watch"), false);

    assert_eq!(network.listener_count(&node("watch")), 0);
    assert!(!handle.is_connected());
}
