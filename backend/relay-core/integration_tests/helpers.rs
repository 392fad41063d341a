//! Test helpers for relay integration tests.
//!
//! - A mock dashboard (wiremock) with a login form and an overview endpoint
//! - A loopback network with a handheld ("phone") and a wearable ("watch")
//! - Relay and requester wiring over that network

use relay_core::inbox::MessageInbox;
use relay_core::relay::{RelayRegistration, RelayService};
use relay_core::requester::RefreshRequester;
use relay_core::session_client::DashboardSettings;
use relay_core::transport::{LoopbackNetwork, LoopbackTransport};

use common::RedactedPassword;
use models::NodeId;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CORRECT_PASSWORD: &str = "correct";
pub const SESSION_COOKIE: &str = "session=abc123";

pub fn node(id: &str) -> NodeId {
    NodeId::new(id).expect("valid node id")
}

/// Overview body in the dashboard's `{"data": [...]}` envelope.
pub fn overview_body(entries: &[(&str, &str)]) -> Value {
    let data: Vec<Value> = entries
        .iter()
        .map(|(service, message)| json!({ "serviceName": service, "message": message }))
        .collect();
    json!({ "data": data })
}

/// Start a dashboard that accepts [`CORRECT_PASSWORD`] and answers the
/// overview with `overview` for requests carrying the session cookie.
///
/// Wrong passwords are redirected back to `/login`; cookie-less overview
/// requests get a 401.
pub async fn mock_dashboard(overview: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string(format!("password={CORRECT_PASSWORD}")))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/")
                .insert_header("Set-Cookie", format!("{SESSION_COOKIE}; Path=/; HttpOnly").as_str()),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/login")
                .insert_header("Set-Cookie", "flash=bad-password; Path=/"),
        )
        .with_priority(10)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .and(header("cookie", SESSION_COOKIE))
        .respond_with(overview)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .with_priority(10)
        .mount(&server)
        .await;

    server
}

pub fn settings(host_url: &str, password: &str) -> DashboardSettings {
    DashboardSettings {
        host_url: host_url.to_string(),
        password: RedactedPassword::new(password.to_string()),
    }
}

/// A phone running the relay and a watch ready to request refreshes.
pub struct RelayHarness {
    pub network: LoopbackNetwork,
    pub registration: RelayRegistration<LoopbackTransport>,
    pub requester: RefreshRequester<LoopbackTransport>,
}

pub async fn relay_harness(host_url: &str, password: &str) -> RelayHarness {
    let network = LoopbackNetwork::new();
    let phone = Arc::new(network.attach(node("phone")));
    let watch = Arc::new(network.attach(node("watch")));

    let service = Arc::new(RelayService::new(
        phone,
        settings(host_url, password),
    ));
    let registration = service.listen().await.expect("relay should start listening");

    let inbox = Arc::new(MessageInbox::new(Arc::clone(&watch)));
    let requester = RefreshRequester::new(watch, inbox)
        .with_refresh_timeout(Duration::from_secs(5));

    RelayHarness {
        network,
        registration,
        requester,
    }
}
