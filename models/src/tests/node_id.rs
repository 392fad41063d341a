use crate::{ModelError, NodeId};

/// **VALUE**: Verifies that blank node ids are rejected.
///
/// **WHY THIS MATTERS**: A reply addressed to an empty node id would be undeliverable and
/// the wearable would only see a timeout.
///
/// **BUG THIS CATCHES**: Would catch removal of the blank check.
#[test]
fn given_blank_id_when_creating_node_id_then_returns_validation_error() {
    // GIVEN/WHEN: A whitespace-only id
    let result = NodeId::new("  ");

    // THEN: Validation error
    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert_eq!(message, "Node id cannot be empty");
        }
        Ok(id) => panic!("Expected validation error, got {id}"),
    }
}

#[test]
fn given_valid_id_when_creating_node_id_then_displays_raw_value() {
    let id = NodeId::new("watch-1").unwrap();
    assert_eq!(id.to_string(), "watch-1");
    assert_eq!(id.as_str(), "watch-1");
}
