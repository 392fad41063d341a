use super::{node, paired_nodes};
use crate::error::TransportError;
use crate::transport::{ConnectionHandle, ConnectionState};

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};

/// **VALUE**: Verifies that connect on an online node resolves with a live session.
///
/// **WHY THIS MATTERS**: Both the sender and the inbox build on this handle; if it never
/// reports Connected nothing in the relay works.
///
/// **BUG THIS CATCHES**: Would catch missing the on_connected callback fired synchronously
/// inside open_session.
#[tokio::test]
async fn given_online_node_when_connecting_then_session_is_connected() {
    // GIVEN: An online node
    let (network, phone, _watch) = paired_nodes();
    let mut handle = ConnectionHandle::new(phone);

    // WHEN: Connecting
    let session = handle.connect(Duration::from_secs(1)).await.unwrap();

    // THEN: Connected with exactly one open session
    assert_eq!(handle.state(), ConnectionState::Connected);
    assert_eq!(handle.session(), Some(session));
    assert_eq!(network.session_count(&node("phone")), 1);
}

#[tokio::test]
async fn given_connected_handle_when_connecting_again_then_reuses_session() {
    let (network, phone, _watch) = paired_nodes();
    let mut handle = ConnectionHandle::new(phone);
    let first = handle.connect(Duration::from_secs(1)).await.unwrap();

    let second = handle.connect(Duration::from_secs(1)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(network.session_count(&node("phone")), 1);
}

/// **VALUE**: Verifies that connect gives up after its bound and closes the half-open session.
///
/// **WHY THIS MATTERS**: A refresh must never hang forever on a transport that never comes
/// up, and leaked sessions pile up on the device.
///
/// **BUG THIS CATCHES**: Would catch an unbounded wait, or forgetting close_session on
/// timeout.
#[tokio::test]
async fn given_offline_node_when_connecting_then_times_out_without_leaking_session() {
    // GIVEN: The phone is offline
    let (network, phone, _watch) = paired_nodes();
    network.set_online(&node("phone"), false);
    let mut handle = ConnectionHandle::new(phone);

    // WHEN: Connecting with a short bound
    let started = Instant::now();
    let result = handle.connect(Duration::from_millis(100)).await;

    // THEN: ConnectTimeout after roughly the bound, nothing left open
    assert!(matches!(result, Err(TransportError::ConnectTimeout { .. })));
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(network.session_count(&node("phone")), 0);
    assert_eq!(handle.session(), None);
}

#[tokio::test]
async fn given_node_comes_online_mid_wait_when_connecting_then_succeeds() {
    // GIVEN: Offline phone that comes back after 50ms
    let (network, phone, _watch) = paired_nodes();
    network.set_online(&node("phone"), false);
    let revive = network.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        revive.set_online(&node("phone"), true);
    });
    let mut handle = ConnectionHandle::new(phone);

    // WHEN: Connecting with a generous bound
    let result = handle.connect(Duration::from_secs(2)).await;

    // THEN: Connected
    assert!(result.is_ok());
    assert!(handle.is_connected());
}

/// **VALUE**: Verifies that disconnect is idempotent and drop releases the session.
///
/// **WHY THIS MATTERS**: Every cleanup path (error, success, drop) calls disconnect; a
/// second call must not panic or close someone else's session.
///
/// **BUG THIS CATCHES**: Would catch double-close bugs and sessions leaked by drop.
#[tokio::test]
async fn given_connected_handle_when_disconnecting_twice_and_dropping_then_session_released_once() {
    // GIVEN: A connected handle
    let (network, phone, _watch) = paired_nodes();
    let mut handle = ConnectionHandle::new(Arc::clone(&phone));
    handle.connect(Duration::from_secs(1)).await.unwrap();

    // WHEN: Disconnecting twice
    handle.disconnect();
    handle.disconnect();

    // THEN: No session left, state Disconnected
    assert_eq!(handle.state(), ConnectionState::Disconnected);
    assert_eq!(network.session_count(&node("phone")), 0);

    // AND: A dropped connected handle also releases its session
    let mut other = ConnectionHandle::new(phone);
    other.connect(Duration::from_secs(1)).await.unwrap();
    assert_eq!(network.session_count(&node("phone")), 1);
    drop(other);
    assert_eq!(network.session_count(&node("phone")), 0);
}

#[tokio::test]
async fn given_never_connected_handle_when_disconnecting_then_is_noop() {
    let (network, phone, _watch) = paired_nodes();
    let mut handle = ConnectionHandle::new(phone);

    handle.disconnect();

    assert_eq!(handle.state(), ConnectionState::Disconnected);
    assert_eq!(network.session_count(&node("phone")), 0);
}

#[tokio::test]
async fn given_suspended_session_when_connecting_again_then_opens_new_session() {
    // GIVEN: A session suspended by the transport
    let (network, phone, _watch) = paired_nodes();
    let mut handle = ConnectionHandle::new(phone);
    let first = handle.connect(Duration::from_secs(1)).await.unwrap();
    network.set_online(&node("phone"), false);
    assert_eq!(handle.state(), ConnectionState::Disconnected);
    network.set_online(&node("phone"), true);

    // WHEN: Connecting again
    let second = handle.connect(Duration::from_secs(1)).await.unwrap();

    // THEN: A fresh session replaces the suspended one
    assert_ne!(first, second);
    assert_eq!(network.session_count(&node("phone")), 1);
}
