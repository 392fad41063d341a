use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Failures of the device-to-device transport.
#[derive(Debug, ThisError)]
pub enum TransportError {
    #[error("Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },

    #[error("Connect Timeout Error: {message} {location}")]
    ConnectTimeout {
        message: String,
        location: ErrorLocation,
    },

    /// The session is gone; no future message can arrive on it.
    #[error("Not Connected Error: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    #[error("No Connected Nodes Error: {message} {location}")]
    NoConnectedNodes {
        message: String,
        location: ErrorLocation,
    },

    /// The transport did not acknowledge delivery to the target node.
    #[error("Delivery Error: {node}: {message} {location}")]
    Delivery {
        node: String,
        message: String,
        location: ErrorLocation,
    },
}

impl TransportError {
    pub fn message(&self) -> &str {
        match self {
            TransportError::Connect { message, .. }
            | TransportError::ConnectTimeout { message, .. }
            | TransportError::NotConnected { message, .. }
            | TransportError::NoConnectedNodes { message, .. }
            | TransportError::Delivery { message, .. } => message,
        }
    }

    /// True for failures to reach or stay attached to the transport, as
    /// opposed to a rejected delivery.
    pub fn is_connectivity(&self) -> bool {
        !matches!(self, TransportError::Delivery { .. })
    }
}
