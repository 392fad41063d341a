use crate::helpers::{CORRECT_PASSWORD, mock_dashboard, node, overview_body, relay_harness, settings};

use relay_core::channel::MessageChannel;
use relay_core::error::{RelayError, TransportError};
use relay_core::inbox::MessageInbox;
use relay_core::relay::{RelayOutcome, RelayService};
use relay_core::requester::{RefreshRequester, RefreshView};
use relay_core::transport::{LoopbackNetwork, PendingMessage};

use models::{EntryCollection, LogEntry, RelayPath};

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use wiremock::ResponseTemplate;

/// **VALUE**: Verifies the full refresh cycle: watch asks, phone logs in, fetches, encodes
/// and replies, watch decodes the same entries in the same order.
///
/// **WHY THIS MATTERS**: This is the one thing the product does.
///
/// **BUG THIS CATCHES**: Would catch any broken link in the chain: wrong path names,
/// replying to the wrong node, lost cookies, or codec mismatches.
#[tokio::test]
async fn given_healthy_dashboard_when_watch_refreshes_then_receives_listing_in_order() {
    // GIVEN: A dashboard with two services and a relaying phone
    let server = mock_dashboard(
        ResponseTemplate::new(200).set_body_json(overview_body(&[("api", "ok"), ("db", "slow")])),
    )
    .await;
    let harness = relay_harness(&server.uri(), CORRECT_PASSWORD).await;
    assert!(harness.registration.is_listening());

    // WHEN: The watch refreshes
    let entries = harness.requester.refresh().await.unwrap();

    // THEN: Exactly the dashboard's entries
    assert_eq!(
        entries,
        EntryCollection::new(vec![
            LogEntry::new("api", "ok"),
            LogEntry::new("db", "slow"),
        ])
    );
}

#[tokio::test]
async fn given_empty_overview_when_watch_refreshes_then_receives_empty_listing() {
    let server = mock_dashboard(ResponseTemplate::new(200).set_body_json(overview_body(&[]))).await;
    let harness = relay_harness(&server.uri(), CORRECT_PASSWORD).await;

    let view = harness.requester.refresh_view().await;

    assert_eq!(view, RefreshView::Listing(EntryCollection::default()));
}

/// **VALUE**: Verifies that a rejected password reaches the watch as "login incorrect".
///
/// **WHY THIS MATTERS**: The wearable user needs to know to fix the password on the phone,
/// not wait for a timeout.
///
/// **BUG THIS CATCHES**: Would catch the relay silently dropping failed refreshes.
#[tokio::test]
async fn given_wrong_password_when_watch_refreshes_then_shows_login_incorrect() {
    // GIVEN: The phone is configured with the wrong password
    let server = mock_dashboard(ResponseTemplate::new(200).set_body_json(overview_body(&[]))).await;
    let harness = relay_harness(&server.uri(), "wrong").await;

    // WHEN: The watch refreshes
    let result = harness.requester.refresh().await;

    // THEN: A remote error carrying the diagnostic
    match result {
        Err(error @ RelayError::Remote { .. }) => {
            assert_eq!(error.user_message(), "login incorrect");
        }
        other => panic!("Expected remote error, got {other:?}"),
    }
}

/// **VALUE**: Verifies that a malformed overview becomes a non-empty `/error` reply shown
/// as a message, never as an empty listing.
///
/// **WHY THIS MATTERS**: An empty screen would look like "no services" rather than "the
/// dashboard changed its format".
///
/// **BUG THIS CATCHES**: Would catch decoding `/error` payloads as listings.
#[tokio::test]
async fn given_malformed_overview_when_watch_refreshes_then_shows_json_error() {
    // GIVEN: A dashboard returning an unexpected shape
    let server = mock_dashboard(ResponseTemplate::new(200).set_body_string(r#"{"data":"nope"}"#)).await;
    let harness = relay_harness(&server.uri(), CORRECT_PASSWORD).await;

    // WHEN: Refreshing
    let view = harness.requester.refresh_view().await;

    // THEN: A JSON error message
    match view {
        RefreshView::Message(message) => {
            assert!(message.starts_with("JSON error: "), "got {message:?}");
            assert!(message.len() > "JSON error: ".len());
        }
        RefreshView::Listing(entries) => panic!("Expected message, got listing {entries:?}"),
    }
}

#[tokio::test]
async fn given_dashboard_server_error_when_watch_refreshes_then_shows_fetch_error() {
    let server = mock_dashboard(ResponseTemplate::new(503).set_body_string("maintenance")).await;
    let harness = relay_harness(&server.uri(), CORRECT_PASSWORD).await;

    let view = harness.requester.refresh_view().await;

    assert_eq!(view, RefreshView::Message(String::from("fetch error: maintenance")));
}

#[tokio::test]
async fn given_unreachable_dashboard_when_watch_refreshes_then_shows_fetch_error() {
    let harness = relay_harness("http://127.0.0.1:1", CORRECT_PASSWORD).await;

    let view = harness.requester.refresh_view().await;

    match view {
        RefreshView::Message(message) => assert!(message.starts_with("fetch error: ")),
        RefreshView::Listing(entries) => panic!("Expected message, got listing {entries:?}"),
    }
}

/// **VALUE**: Verifies that a missing reply surfaces as "connection timeout" after the
/// refresh window, not sooner and not never.
///
/// **WHY THIS MATTERS**: If the phone app is not running, the watch must give up.
///
/// **BUG THIS CATCHES**: Would catch an unbounded wait on the inbox.
#[tokio::test]
async fn given_phone_without_relay_when_watch_refreshes_then_times_out() {
    // GIVEN: A phone that is connected but not relaying
    let network = LoopbackNetwork::new();
    let _phone = network.attach(node("phone"));
    let watch = Arc::new(network.attach(node("watch")));
    let inbox = Arc::new(MessageInbox::new(Arc::clone(&watch)));
    let requester = RefreshRequester::new(watch, inbox)
        .with_refresh_timeout(Duration::from_millis(200));

    // WHEN: Refreshing
    let started = Instant::now();
    let view = requester.refresh_view().await;

    // THEN: Timeout message after the window
    assert_eq!(view, RefreshView::Message(String::from("connection timeout")));
    assert!(started.elapsed() >= Duration::from_millis(200));
}

/// **VALUE**: Verifies that an unbounded refresh window still completes a normal refresh.
///
/// **WHY THIS MATTERS**: `with_refresh_timeout` is public; `Duration::MAX` is the natural
/// way to ask for "no timeout" and must not crash the wearable.
///
/// **BUG THIS CATCHES**: Would catch deadline overflow panics in the reply wait.
#[tokio::test]
async fn given_unbounded_refresh_timeout_when_watch_refreshes_then_receives_listing() {
    // GIVEN: A healthy relay and a requester with no usable time bound
    let server = mock_dashboard(
        ResponseTemplate::new(200).set_body_json(overview_body(&[("api", "ok")])),
    )
    .await;
    let harness = relay_harness(&server.uri(), CORRECT_PASSWORD).await;
    let requester = harness.requester.with_refresh_timeout(Duration::MAX);

    // WHEN: The watch refreshes
    let entries = tokio::time::timeout(Duration::from_secs(5), requester.refresh())
        .await
        .expect("refresh should complete once the listing arrives")
        .unwrap();

    // THEN: The dashboard's entries
    assert_eq!(entries, EntryCollection::new(vec![LogEntry::new("api", "ok")]));
    assert!(harness.registration.is_listening());
}

#[tokio::test]
async fn given_no_other_nodes_when_watch_refreshes_then_reports_no_connected_nodes() {
    let network = LoopbackNetwork::new();
    let watch = Arc::new(network.attach(node("watch")));
    let inbox = Arc::new(MessageInbox::new(Arc::clone(&watch)));
    let requester = RefreshRequester::new(watch, inbox);

    let result = requester.refresh().await;

    assert!(matches!(
        result,
        Err(RelayError::Transport(TransportError::NoConnectedNodes { .. }))
    ));
}

/// **VALUE**: Verifies that the requester ignores messages from other nodes and unknown
/// paths while waiting, and takes the first listing from the node it asked.
///
/// **WHY THIS MATTERS**: Without a correlation id, source and path are the only filters
/// between the user and a stray message.
///
/// **BUG THIS CATCHES**: Would catch returning the first message of any kind.
#[tokio::test]
async fn given_stray_messages_when_waiting_for_reply_then_only_handheld_listing_counts() {
    // GIVEN: phone (first node) and tablet; no relay, replies sent by hand
    let network = LoopbackNetwork::new();
    let phone = Arc::new(network.attach(node("phone")));
    let tablet = Arc::new(network.attach(node("tablet")));
    let watch = Arc::new(network.attach(node("watch")));
    let inbox = Arc::new(MessageInbox::new(Arc::clone(&watch)));
    let requester = RefreshRequester::new(watch, inbox);

    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        let mut from_tablet = MessageChannel::new(tablet);
        from_tablet.connect().await.unwrap();
        from_tablet
            .send_text(&node("watch"), RelayPath::Listing.as_str(), "not json")
            .await
            .unwrap();

        let mut from_phone = MessageChannel::new(phone);
        from_phone.connect().await.unwrap();
        from_phone
            .send_text(&node("watch"), "/status", "ignored")
            .await
            .unwrap();
        from_phone
            .send_text(
                &node("watch"),
                RelayPath::Listing.as_str(),
                r#"[{"serviceName":"api","message":"ok"}]"#,
            )
            .await
            .unwrap();
    });

    // WHEN: Refreshing
    let entries = requester.refresh().await.unwrap();

    // THEN: Only the phone's listing
    assert_eq!(entries.entries(), &[LogEntry::new("api", "ok")]);
}

#[tokio::test]
async fn given_undecodable_listing_when_waiting_for_reply_then_shows_internal_json_error() {
    let network = LoopbackNetwork::new();
    let phone = Arc::new(network.attach(node("phone")));
    let watch = Arc::new(network.attach(node("watch")));
    let inbox = Arc::new(MessageInbox::new(Arc::clone(&watch)));
    let requester = RefreshRequester::new(watch, inbox);

    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        let mut channel = MessageChannel::new(phone);
        channel.connect().await.unwrap();
        channel
            .send_text(&node("watch"), RelayPath::Listing.as_str(), "[{}]")
            .await
            .unwrap();
    });

    let view = requester.refresh_view().await;

    match view {
        RefreshView::Message(message) => assert!(message.starts_with("internal JSON error: ")),
        RefreshView::Listing(entries) => panic!("Expected message, got listing {entries:?}"),
    }
}

/// **VALUE**: Verifies the relay's per-message outcomes for the paths that send nothing
/// or fail to deliver.
///
/// **WHY THIS MATTERS**: Only a missing reply channel may go unanswered; everything else
/// must be attempted and reported.
///
/// **BUG THIS CATCHES**: Would catch relaying non-refresh paths, or panicking when the
/// requester disappears.
#[tokio::test]
async fn given_edge_conditions_when_handling_messages_then_reports_outcome() {
    // GIVEN: A relay service on the phone
    let server = mock_dashboard(ResponseTemplate::new(200).set_body_json(overview_body(&[]))).await;
    let network = LoopbackNetwork::new();
    let phone = Arc::new(network.attach(node("phone")));
    let _watch = network.attach(node("watch"));
    let service = RelayService::new(Arc::clone(&phone), settings(&server.uri(), CORRECT_PASSWORD))
        .with_connect_timeout(Duration::from_millis(100));

    // WHEN/THEN: Non-refresh paths are ignored
    let ignored = service
        .handle_message(PendingMessage::new(node("watch"), "/listing", None))
        .await;
    assert_eq!(ignored, RelayOutcome::Ignored);

    // WHEN/THEN: Requester rejects the reply
    network.set_rejecting_deliveries(&node("watch"), true);
    let failed = service
        .handle_message(PendingMessage::new(node("watch"), "/refresh", None))
        .await;
    assert_eq!(failed, RelayOutcome::ReplyFailed);
    network.set_rejecting_deliveries(&node("watch"), false);

    // WHEN/THEN: Requester reachable
    let replied = service
        .handle_message(PendingMessage::new(node("watch"), "/refresh", None))
        .await;
    assert_eq!(replied, RelayOutcome::Replied(RelayPath::Listing));

    // WHEN/THEN: Phone offline, no reply channel
    network.set_online(&node("phone"), false);
    let dropped = service
        .handle_message(PendingMessage::new(node("watch"), "/refresh", None))
        .await;
    assert_eq!(dropped, RelayOutcome::NoChannel);

    // THEN: Every reply channel was released
    assert_eq!(network.session_count(&node("phone")), 0);
}

#[tokio::test]
async fn given_wrong_password_when_handling_refresh_then_replies_on_error_path() {
    let server = mock_dashboard(ResponseTemplate::new(200).set_body_json(overview_body(&[]))).await;
    let network = LoopbackNetwork::new();
    let phone = Arc::new(network.attach(node("phone")));
    let _watch = network.attach(node("watch"));
    let service = RelayService::new(phone, settings(&server.uri(), "wrong"));

    let outcome = service
        .handle_message(PendingMessage::new(node("watch"), "/refresh", None))
        .await;

    assert_eq!(outcome, RelayOutcome::Replied(RelayPath::Error));
}

/// **VALUE**: Verifies that dropping the registration stops the relay.
///
/// **WHY THIS MATTERS**: A stopped phone app must not keep answering with stale settings.
///
/// **BUG THIS CATCHES**: Would catch a listener left registered after drop.
#[tokio::test]
async fn given_dropped_registration_when_watch_refreshes_then_times_out() {
    // GIVEN: A harness whose registration is dropped
    let server = mock_dashboard(ResponseTemplate::new(200).set_body_json(overview_body(&[]))).await;
    let harness = relay_harness(&server.uri(), CORRECT_PASSWORD).await;
    let network = harness.network.clone();
    let requester = harness
        .requester
        .with_refresh_timeout(Duration::from_millis(200));
    drop(harness.registration);

    // WHEN: Refreshing
    let result = requester.refresh().await;

    // THEN: Nothing answers
    assert_eq!(network.listener_count(&node("phone")), 0);
    assert_eq!(network.session_count(&node("phone")), 0);
    assert!(matches!(result, Err(RelayError::Timeout { .. })));
}

#[tokio::test]
async fn given_repeated_refreshes_when_each_completes_then_inbox_keeps_one_listener() {
    let server = mock_dashboard(
        ResponseTemplate::new(200).set_body_json(overview_body(&[("api", "ok")])),
    )
    .await;
    let harness = relay_harness(&server.uri(), CORRECT_PASSWORD).await;

    for _ in 0..3 {
        let entries = harness.requester.refresh().await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    assert_eq!(harness.network.listener_count(&node("watch")), 1);
    assert_eq!(harness.network.listener_count(&node("phone")), 1);
    assert_eq!(harness.network.session_count(&node("watch")), 1);
}
