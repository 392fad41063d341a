use crate::ModelError;

use common::ErrorLocation;

use std::fmt;
use std::panic::Location;

/// Address of a paired device on the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    /// Create a node id, rejecting blank identifiers.
    #[track_caller]
    pub fn new(id: impl Into<String>) -> Result<Self, ModelError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Node id cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
