use crate::helpers::{CORRECT_PASSWORD, SESSION_COOKIE, mock_dashboard, overview_body};

use relay_core::STATUSHUB_USER_AGENT;
use relay_core::error::SessionError;
use relay_core::session_client::SessionClient;

use common::RedactedPassword;
use models::{EntryCollection, LogEntry};

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn password(value: &str) -> RedactedPassword {
    RedactedPassword::new(value.to_string())
}

/// **VALUE**: Verifies that a correct password yields `true` and stores the session cookie.
///
/// **WHY THIS MATTERS**: The dashboard signals success only by redirecting to `/`; the
/// session cookie from that response is the credential for the overview.
///
/// **BUG THIS CATCHES**: Would catch following the redirect (losing the 302) or dropping
/// Set-Cookie from a redirect response.
#[tokio::test]
async fn given_correct_password_when_logging_in_then_returns_true_and_stores_cookie() {
    // GIVEN: A dashboard
    let server = mock_dashboard(ResponseTemplate::new(200).set_body_json(overview_body(&[]))).await;
    let mut client = SessionClient::new(&server.uri()).unwrap();

    // WHEN: Logging in with the right password
    let accepted = client.login(&password(CORRECT_PASSWORD)).await.unwrap();

    // THEN: Accepted, authenticated, cookie held
    assert!(accepted);
    assert!(client.is_authenticated());
    assert_eq!(client.cookies().header_value().as_deref(), Some(SESSION_COOKIE));
}

/// **VALUE**: Verifies that a wrong password yields `false`, not an error, while cookies
/// from the rejection are still kept.
///
/// **WHY THIS MATTERS**: A rejected login is an expected outcome reported as "login
/// incorrect"; the caller must be able to tell it apart from a network failure.
///
/// **BUG THIS CATCHES**: Would catch treating any 3xx as success, or only capturing
/// cookies on success.
#[tokio::test]
async fn given_wrong_password_when_logging_in_then_returns_false_and_keeps_cookies() {
    // GIVEN: A dashboard
    let server = mock_dashboard(ResponseTemplate::new(200).set_body_json(overview_body(&[]))).await;
    let mut client = SessionClient::new(&server.uri()).unwrap();

    // WHEN: Logging in with the wrong password
    let accepted = client.login(&password("wrong")).await.unwrap();

    // THEN: Rejected, but the flash cookie was captured
    assert!(!accepted);
    assert!(!client.is_authenticated());
    assert_eq!(client.cookies().get("flash").unwrap().value, "bad-password");
}

#[tokio::test]
async fn given_login_answers_200_when_logging_in_then_returns_false() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form>"))
        .mount(&server)
        .await;
    let mut client = SessionClient::new(&server.uri()).unwrap();

    let accepted = client.login(&password(CORRECT_PASSWORD)).await.unwrap();

    assert!(!accepted);
}

/// **VALUE**: Verifies that the overview request replays the login cookie and parses the
/// `data` envelope in order.
///
/// **WHY THIS MATTERS**: This is the happy path of every refresh.
///
/// **BUG THIS CATCHES**: Would catch a fresh cookie-less HTTP client per request, or
/// parsing the envelope instead of its `data` array.
#[tokio::test]
async fn given_logged_in_client_when_fetching_overview_then_returns_entries_in_order() {
    // GIVEN: A logged-in client
    let server = mock_dashboard(
        ResponseTemplate::new(200).set_body_json(overview_body(&[("api", "ok"), ("db", "slow")])),
    )
    .await;
    let mut client = SessionClient::new(&server.uri()).unwrap();
    assert!(client.login(&password(CORRECT_PASSWORD)).await.unwrap());

    // WHEN: Fetching the overview
    let entries = client.fetch_overview().await.unwrap();

    // THEN: Both entries, in order
    assert_eq!(
        entries,
        EntryCollection::new(vec![
            LogEntry::new("api", "ok"),
            LogEntry::new("db", "slow"),
        ])
    );
}

#[tokio::test]
async fn given_no_login_when_fetching_overview_then_returns_fetch_error_with_status() {
    let server = mock_dashboard(ResponseTemplate::new(200).set_body_json(overview_body(&[]))).await;
    let mut client = SessionClient::new(&server.uri()).unwrap();

    let result = client.fetch_overview().await;

    match result {
        Err(SessionError::Fetch { status, message, .. }) => {
            assert_eq!(status.0, 401);
            assert_eq!(message, "Unauthorized");
        }
        other => panic!("Expected Fetch error, got {other:?}"),
    }
}

/// **VALUE**: Verifies that a malformed overview body is a Format error, not an empty list.
///
/// **WHY THIS MATTERS**: Dashboard upgrades that change the schema must be visible to the
/// user as a JSON error.
///
/// **BUG THIS CATCHES**: Would catch lenient parsing (defaults) hiding schema drift.
#[tokio::test]
async fn given_malformed_overview_when_fetching_then_returns_format_error() {
    // GIVEN: Overview elements lacking "message"
    let server = mock_dashboard(
        ResponseTemplate::new(200).set_body_string(r#"{"data":[{"serviceName":"api"}]}"#),
    )
    .await;
    let mut client = SessionClient::new(&server.uri()).unwrap();
    assert!(client.login(&password(CORRECT_PASSWORD)).await.unwrap());

    // WHEN: Fetching
    let result = client.fetch_overview().await;

    // THEN: Format error
    assert!(matches!(result, Err(SessionError::Format { .. })));
}

#[tokio::test]
async fn given_server_error_with_long_body_when_fetching_then_message_truncated() {
    let server = mock_dashboard(ResponseTemplate::new(500).set_body_string("x".repeat(1_000))).await;
    let mut client = SessionClient::new(&server.uri()).unwrap();
    assert!(client.login(&password(CORRECT_PASSWORD)).await.unwrap());

    let result = client.fetch_overview().await;

    match result {
        Err(SessionError::Fetch { status, message, .. }) => {
            assert!(status.is_server_error());
            assert_eq!(message.len(), 200);
        }
        other => panic!("Expected Fetch error, got {other:?}"),
    }
}

/// **VALUE**: Verifies that a 4xx overview after a successful login drops the session.
///
/// **WHY THIS MATTERS**: An expired or revoked cookie must not leave the client claiming to
/// be authenticated; callers decide whether to log in again from that flag.
///
/// **BUG THIS CATCHES**: Would catch treating client errors like server hiccups that keep
/// the session.
#[tokio::test]
async fn given_session_rejected_when_fetching_then_fetch_error_and_not_authenticated() {
    // GIVEN: A dashboard that accepts the login but refuses the overview
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/")
                .insert_header("Set-Cookie", format!("{SESSION_COOKIE}; Path=/").as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .respond_with(ResponseTemplate::new(403).set_body_string("session expired"))
        .mount(&server)
        .await;
    let mut client = SessionClient::new(&server.uri()).unwrap();
    assert!(client.login(&password(CORRECT_PASSWORD)).await.unwrap());
    assert!(client.is_authenticated());

    // WHEN: Fetching
    let result = client.fetch_overview().await;

    // THEN: Client-error fetch failure and the session is gone
    match result {
        Err(SessionError::Fetch { status, message, .. }) => {
            assert!(status.is_client_error());
            assert_eq!(message, "session expired");
        }
        other => panic!("Expected Fetch error, got {other:?}"),
    }
    assert!(!client.is_authenticated());
}

/// **VALUE**: Verifies that endpoints resolve under a host URL with a path prefix.
///
/// **WHY THIS MATTERS**: Dashboards are often mounted behind a reverse proxy at a
/// sub-path; `Url::join` without a trailing slash would drop that prefix.
///
/// **BUG THIS CATCHES**: Would catch posting to `/login` instead of `/status/login`.
#[tokio::test]
async fn given_host_url_with_path_prefix_when_logging_in_then_posts_under_prefix() {
    // GIVEN: A dashboard under /status
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/status/login"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/"))
        .expect(1)
        .mount(&server)
        .await;
    let mut client = SessionClient::new(&format!("{}/status", server.uri())).unwrap();

    // WHEN: Logging in
    let accepted = client.login(&password(CORRECT_PASSWORD)).await.unwrap();

    // THEN: Prefix preserved
    assert!(accepted);
    assert_eq!(client.base_url().path(), "/status/");
}

#[tokio::test]
async fn given_any_request_when_sent_then_carries_relay_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("user-agent", STATUSHUB_USER_AGENT))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/"))
        .mount(&server)
        .await;
    let mut client = SessionClient::new(&server.uri()).unwrap();

    assert!(client.login(&password(CORRECT_PASSWORD)).await.unwrap());
}

#[tokio::test]
async fn given_unreachable_dashboard_when_logging_in_then_returns_transport_error() {
    // Port 1 is reserved and closed on test hosts.
    let mut client = SessionClient::new("http://127.0.0.1:1").unwrap();

    let result = client.login(&password(CORRECT_PASSWORD)).await;

    assert!(matches!(result, Err(SessionError::Transport { .. })));
}

#[test]
fn given_invalid_host_url_when_creating_client_then_returns_url_parse_error() {
    let result = SessionClient::new("not a url");

    assert!(matches!(result, Err(SessionError::UrlParse { .. })));
}
