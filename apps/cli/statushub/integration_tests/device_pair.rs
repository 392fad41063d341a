use statushub::device_pair::{DevicePair, HANDHELD_NODE, WEARABLE_NODE};

use common::RedactedPassword;
use models::{EntryCollection, LogEntry, NodeId};
use relay_core::config::RelayConfig;
use relay_core::requester::RefreshView;
use relay_core::session_client::DashboardSettings;

use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn dashboard() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string("password=s3cret%26more"))
        .respond_with(
            ResponseTemplate::new(303)
                .insert_header("Location", "/")
                .insert_header("Set-Cookie", "sid=42"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .and(header("cookie", "sid=42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "serviceName": "web", "message": "up" }]
        })))
        .mount(&server)
        .await;
    server
}

/// **VALUE**: Verifies the binary's wiring end to end: settings saved to a config directory
/// are loaded, the pair starts, and one refresh yields the dashboard listing.
///
/// **WHY THIS MATTERS**: This is the same path `main` takes, minus the logger and the
/// environment.
///
/// **BUG THIS CATCHES**: Would catch the config-to-settings conversion losing the password
/// (form-encoding included) or the pair wiring the wrong node as the relay.
#[tokio::test]
async fn given_saved_config_when_pair_refreshes_then_prints_dashboard_listing() {
    // GIVEN: A dashboard and a saved config pointing at it
    let server = dashboard().await;
    let dir = TempDir::new().unwrap();
    let mut config = RelayConfig::default();
    config.dashboard.host_url = Some(server.uri());
    config.dashboard.password = Some(String::from("s3cret&more"));
    config.save(dir.path()).unwrap();

    // WHEN: Loading and running one refresh
    let loaded = RelayConfig::load(dir.path()).unwrap();
    let pair = DevicePair::start(loaded.dashboard_settings().unwrap(), loaded.refresh_timeout())
        .await
        .unwrap();
    let view = pair.refresh().await;

    // THEN: The dashboard's single entry
    assert!(pair.is_relaying());
    assert_eq!(
        view,
        RefreshView::Listing(EntryCollection::new(vec![LogEntry::new("web", "up")]))
    );
    pair.shutdown().await;
}

#[tokio::test]
async fn given_offline_handheld_when_pair_refreshes_then_reports_message() {
    // GIVEN: A started pair whose handheld drops off
    let settings = DashboardSettings {
        host_url: String::from("http://127.0.0.1:1"),
        password: RedactedPassword::new(String::from("unused")),
    };
    let pair = DevicePair::start(settings, Duration::from_millis(300))
        .await
        .unwrap();
    pair.network()
        .set_online(&NodeId::new(HANDHELD_NODE).unwrap(), false);

    // WHEN: Refreshing
    let view = pair.refresh().await;

    // THEN: No node to ask
    match view {
        RefreshView::Message(message) => assert!(message.contains(WEARABLE_NODE)),
        RefreshView::Listing(entries) => panic!("Expected message, got {entries:?}"),
    }
    pair.shutdown().await;
}
