use crate::HttpStatusCode;

/// **VALUE**: Verifies status classification used by the session client diagnostics.
///
/// **WHY THIS MATTERS**: Login success is signalled by a redirect; a misclassified 302 would
/// make every login look rejected.
///
/// **BUG THIS CATCHES**: Would catch off-by-one range boundaries.
#[test]
fn given_status_codes_when_classified_then_ranges_are_exclusive() {
    // GIVEN/WHEN/THEN: Boundary codes land in exactly one class
    assert!(HttpStatusCode(302).is_redirect());
    assert!(HttpStatusCode(300).is_redirect());
    assert!(!HttpStatusCode(400).is_redirect());
    assert!(HttpStatusCode(404).is_client_error());
    assert!(!HttpStatusCode(500).is_client_error());
    assert!(HttpStatusCode(503).is_server_error());
    assert!(!HttpStatusCode(200).is_server_error());
}

#[test]
fn given_status_code_when_displayed_then_shows_number() {
    assert_eq!(HttpStatusCode::from(502).to_string(), "502");
}
