use relay_core::error::{ConfigError, CoreError, RelayError, SessionError, TransportError};

use common::{ErrorLocation, HttpStatusCode};

use std::error::Error;
use std::panic::Location;

/// **VALUE**: Verifies that `SessionError::Fetch` shows the HTTP status, message and source
/// location.
///
/// **WHY THIS MATTERS**: A failing overview fetch is logged on the phone; the status code and
/// the call site are what a developer needs to tell "dashboard down" from "session expired".
///
/// **BUG THIS CATCHES**: Would catch dropping the status or location from the Display form.
#[test]
#[track_caller]
fn given_fetch_error_when_formatted_then_includes_status_and_location() {
    // GIVEN: A Fetch error
    let err = SessionError::Fetch {
        message: String::from("Unauthorized"),
        status: HttpStatusCode::from(401),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Formatting
    let error_string = format!("{}", err);

    // THEN: Type, status, message and file
    assert!(error_string.contains("Fetch Error"));
    assert!(error_string.contains("401"));
    assert!(error_string.contains("Unauthorized"));
    assert!(error_string.contains("error.rs"));
}

#[test]
#[track_caller]
fn given_delivery_error_when_formatted_then_names_target_node() {
    let err = TransportError::Delivery {
        node: String::from("watch"),
        message: String::from("Node is offline"),
        location: ErrorLocation::from(Location::caller()),
    };

    let error_string = err.to_string();

    assert!(error_string.contains("watch"));
    assert!(error_string.contains("Node is offline"));
}

/// **VALUE**: Verifies that wrapping errors keeps their Display text unchanged.
///
/// **WHY THIS MATTERS**: `RelayError` and `CoreError` are transparent wrappers; doubling
/// the prefix ("Relay Error: Transport Error: ...") makes logs noisy and tests brittle.
///
/// **BUG THIS CATCHES**: Would catch replacing `#[error(transparent)]` with a formatted
/// message.
#[test]
#[track_caller]
fn given_wrapped_transport_error_when_formatted_then_display_is_unchanged() {
    // GIVEN: The same error, bare and wrapped twice
    let make = || TransportError::NotConnected {
        message: String::from("Inbox is not connected to the transport"),
        location: ErrorLocation::from(Location::caller()),
    };
    let bare = make().to_string();

    // WHEN: Wrapping
    let relay = RelayError::from(make());
    let core = CoreError::from(RelayError::from(make()));

    // THEN: Identical text
    assert_eq!(relay.to_string(), bare);
    assert_eq!(core.to_string(), bare);
}

#[test]
fn given_config_read_error_when_inspected_then_exposes_io_source() {
    let err = ConfigError::Read {
        location: ErrorLocation::from(Location::caller()),
        path: std::path::PathBuf::from("/nowhere/config.json"),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
    };

    assert!(err.source().is_some());
    assert!(err.to_string().contains("/nowhere/config.json"));
}
