use super::{node, paired_nodes};
use crate::channel::{MessageChannel, Target};
use crate::error::TransportError;
use crate::inbox::MessageInbox;
use crate::transport::{LoopbackTransport, PendingMessage};

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep, timeout};

async fn connected_sender(phone: &Arc<LoopbackTransport>) -> MessageChannel<LoopbackTransport> {
    let mut channel = MessageChannel::new(Arc::clone(phone));
    channel.connect().await.unwrap();
    channel
}

async fn next_path(inbox: &MessageInbox<LoopbackTransport>) -> String {
    inbox
        .receive(Duration::from_secs(1))
        .await
        .unwrap()
        .expect("message should be queued")
        .path
}

/// **VALUE**: Verifies that messages come out of receive in arrival order.
///
/// **WHY THIS MATTERS**: Per-source ordering is the only ordering guarantee the relay has;
/// a LIFO or unordered queue could show an old listing over a newer error.
///
/// **BUG THIS CATCHES**: Would catch push_front/pop_back mixups.
#[tokio::test]
async fn given_three_messages_when_receiving_then_returned_in_arrival_order() {
    // GIVEN: A connected inbox on the watch
    let (_network, phone, watch) = paired_nodes();
    let inbox = MessageInbox::new(watch);
    inbox.connect().await.unwrap();
    let sender = connected_sender(&phone).await;

    // WHEN: Phone sends A, B, C
    for path in ["/a", "/b", "/c"] {
        sender
            .send(&Target::Node(node("watch")), path, None)
            .await
            .unwrap();
    }

    // THEN: A, B, C
    assert_eq!(inbox.pending(), 3);
    assert_eq!(next_path(&inbox).await, "/a");
    assert_eq!(next_path(&inbox).await, "/b");
    assert_eq!(next_path(&inbox).await, "/c");
}

/// **VALUE**: Verifies that receive on an empty queue returns None after the timeout, not
/// before and not much later.
///
/// **WHY THIS MATTERS**: The refresh timeout shown to the user is built on this bound.
///
/// **BUG THIS CATCHES**: Would catch spurious early returns on wakeups and missing deadlines.
#[tokio::test]
async fn given_empty_connected_inbox_when_receiving_then_times_out_after_bound() {
    // GIVEN: A connected, empty inbox
    let (_network, _phone, watch) = paired_nodes();
    let inbox = MessageInbox::new(watch);
    inbox.connect().await.unwrap();

    // WHEN: Receiving with a 100ms bound
    let started = Instant::now();
    let result = inbox.receive(Duration::from_millis(100)).await;

    // THEN: None, after at least 100ms and well under a second
    let elapsed = started.elapsed();
    assert!(matches!(result, Ok(None)));
    assert!(elapsed >= Duration::from_millis(100), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "returned late: {elapsed:?}");
}

#[tokio::test]
async fn given_queued_messages_when_cleared_then_receive_times_out() {
    // GIVEN: Two queued messages
    let (_network, phone, watch) = paired_nodes();
    let inbox = MessageInbox::new(watch);
    inbox.connect().await.unwrap();
    let sender = connected_sender(&phone).await;
    sender.send_text(&node("watch"), "/listing", "[]").await.unwrap();
    sender.send_text(&node("watch"), "/error", "late").await.unwrap();

    // WHEN: Clearing
    let discarded = inbox.clear_queue();

    // THEN: Both gone; receive finds nothing
    assert_eq!(discarded, 2);
    let result = inbox.receive(Duration::from_millis(50)).await;
    assert!(matches!(result, Ok(None)));
}

/// **VALUE**: Verifies that a message arriving while receive waits is returned promptly.
///
/// **WHY THIS MATTERS**: The normal refresh path waits first and gets the reply later.
///
/// **BUG THIS CATCHES**: Would catch a lost wakeup between the queue check and the wait.
#[tokio::test]
async fn given_waiting_receiver_when_message_arrives_then_returns_it_before_timeout() {
    // GIVEN: A connected inbox and a sender that fires after 50ms
    let (_network, phone, watch) = paired_nodes();
    let inbox = MessageInbox::new(watch);
    inbox.connect().await.unwrap();
    let sender = connected_sender(&phone).await;
    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        sender.send_text(&node("watch"), "/listing", "[]").await.unwrap();
    });

    // WHEN: Receiving with a long bound
    let started = Instant::now();
    let message = inbox.receive(Duration::from_secs(5)).await.unwrap();

    // THEN: Got the message long before the bound
    assert_eq!(
        message,
        Some(PendingMessage::new(node("phone"), "/listing", Some(b"[]".to_vec())))
    );
    assert!(started.elapsed() < Duration::from_secs(2));
}

/// **VALUE**: Verifies that a timeout too large to add to the clock still returns the queued
/// message instead of panicking.
///
/// **WHY THIS MATTERS**: Callers pass `Duration::MAX` to mean "wait forever"; the deadline
/// arithmetic must not overflow on that.
///
/// **BUG THIS CATCHES**: Would catch `Instant + Duration` overflow panics in receive.
#[tokio::test]
async fn given_queued_message_when_receiving_with_unbounded_timeout_then_returns_it() {
    // GIVEN: A connected inbox holding one message
    let (_network, phone, watch) = paired_nodes();
    let inbox = MessageInbox::new(watch);
    inbox.connect().await.unwrap();
    let sender = connected_sender(&phone).await;
    sender
        .send(&Target::Node(node("watch")), "/a", None)
        .await
        .unwrap();

    // WHEN: Receiving with no usable bound
    let message = inbox.receive(Duration::MAX).await.unwrap();

    // THEN: The queued message
    assert_eq!(message.map(|message| message.path).as_deref(), Some("/a"));
}

#[tokio::test]
async fn given_unbounded_timeout_when_message_arrives_later_then_returns_it() {
    let (_network, phone, watch) = paired_nodes();
    let inbox = MessageInbox::new(watch);
    inbox.connect().await.unwrap();
    let sender = connected_sender(&phone).await;
    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        sender.send_text(&node("watch"), "/listing", "[]").await.unwrap();
    });

    let message = timeout(Duration::from_secs(2), inbox.receive(Duration::MAX))
        .await
        .expect("unbounded receive should wake on arrival")
        .unwrap();

    assert_eq!(message.map(|message| message.path).as_deref(), Some("/listing"));
}

/// **VALUE**: Verifies that disconnect wakes a blocked receive, which then fails.
///
/// **WHY THIS MATTERS**: Shutting the inbox down must not leave a task parked for the full
/// refresh timeout.
///
/// **BUG THIS CATCHES**: Would catch a disconnect that flips the flag without notifying.
#[tokio::test]
async fn given_blocked_receive_when_disconnected_then_wakes_promptly_with_not_connected() {
    // GIVEN: A receiver parked for up to 5s
    let (_network, _phone, watch) = paired_nodes();
    let inbox = Arc::new(MessageInbox::new(watch));
    inbox.connect().await.unwrap();
    let waiter = Arc::clone(&inbox);
    let started = Instant::now();
    let pending = tokio::spawn(async move { waiter.receive(Duration::from_secs(5)).await });
    sleep(Duration::from_millis(50)).await;

    // WHEN: Disconnecting
    inbox.disconnect().await;

    // THEN: The receiver returns NotConnected well within the bound
    let result = timeout(Duration::from_secs(1), pending)
        .await
        .expect("receive should wake on disconnect")
        .unwrap();
    assert!(matches!(result, Err(TransportError::NotConnected { .. })));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!inbox.is_connected());
}

#[tokio::test]
async fn given_never_connected_inbox_when_receiving_then_returns_not_connected() {
    let (_network, _phone, watch) = paired_nodes();
    let inbox = MessageInbox::new(watch);

    let result = inbox.receive(Duration::from_millis(50)).await;

    assert!(matches!(result, Err(TransportError::NotConnected { .. })));
}

/// **VALUE**: Verifies that connect is idempotent: one session and one listener however
/// often it is called.
///
/// **WHY THIS MATTERS**: Every refresh calls connect; a second listener would queue each
/// reply twice.
///
/// **BUG THIS CATCHES**: Would catch re-registering the listener on every connect.
#[tokio::test]
async fn given_connected_inbox_when_connecting_again_then_single_session_and_listener() {
    // GIVEN: A connected inbox
    let (network, phone, watch) = paired_nodes();
    let inbox = MessageInbox::new(watch);
    inbox.connect().await.unwrap();

    // WHEN: Connecting twice more
    inbox.connect().await.unwrap();
    inbox.connect().await.unwrap();

    // THEN: One session, one listener, one copy of each message
    assert_eq!(network.session_count(&node("watch")), 1);
    assert_eq!(network.listener_count(&node("watch")), 1);
    let sender = connected_sender(&phone).await;
    sender.send(&Target::Node(node("watch")), "/a", None).await.unwrap();
    assert_eq!(inbox.pending(), 1);
}

/// **VALUE**: Verifies that a transport suspension disconnects the inbox and wakes waiters,
/// and that a later connect recovers.
///
/// **WHY THIS MATTERS**: Wearable transports suspend sessions when the radio drops; the
/// refresh must fail fast rather than wait out its timeout.
///
/// **BUG THIS CATCHES**: Would catch ignoring on_suspended, or a stale watcher tearing down
/// the reconnected session.
#[tokio::test]
async fn given_suspended_session_when_receiving_then_fails_and_reconnect_recovers() {
    // GIVEN: A connected inbox with a parked receiver
    let (network, phone, watch) = paired_nodes();
    let inbox = Arc::new(MessageInbox::new(watch));
    inbox.connect().await.unwrap();
    let waiter = Arc::clone(&inbox);
    let pending = tokio::spawn(async move { waiter.receive(Duration::from_secs(5)).await });
    sleep(Duration::from_millis(20)).await;

    // WHEN: The watch goes offline
    network.set_online(&node("watch"), false);

    // THEN: The receiver fails promptly
    let result = timeout(Duration::from_secs(1), pending)
        .await
        .expect("receive should wake on suspension")
        .unwrap();
    assert!(matches!(result, Err(TransportError::NotConnected { .. })));

    // WHEN: Back online and reconnected
    network.set_online(&node("watch"), true);
    inbox.connect().await.unwrap();
    sleep(Duration::from_millis(20)).await;

    // THEN: Still connected and receiving
    assert!(inbox.is_connected());
    let sender = connected_sender(&phone).await;
    sender.send(&Target::Node(node("watch")), "/b", None).await.unwrap();
    assert_eq!(next_path(&inbox).await, "/b");
    assert_eq!(network.listener_count(&node("watch")), 1);
}

#[tokio::test]
async fn given_buffered_messages_when_disconnected_and_reconnected_then_messages_kept() {
    // GIVEN: One buffered message
    let (_network, phone, watch) = paired_nodes();
    let inbox = MessageInbox::new(watch);
    inbox.connect().await.unwrap();
    let sender = connected_sender(&phone).await;
    sender.send(&Target::Node(node("watch")), "/kept", None).await.unwrap();

    // WHEN: Disconnecting (twice) and reconnecting
    inbox.disconnect().await;
    inbox.disconnect().await;
    assert_eq!(inbox.pending(), 1);
    inbox.connect().await.unwrap();

    // THEN: The buffered message is still delivered
    assert_eq!(next_path(&inbox).await, "/kept");
}
