use common::ErrorLocation;
use relay_core::error::{ConfigError, CoreError, TransportError};

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors that stop the StatusHub binary before or while setting up a relay.
///
/// Refresh failures are not errors here; they end up as a
/// [`RefreshView::Message`](relay_core::requester::RefreshView) shown to the user.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum StatushubError {
    /// Error from this App
    #[error("Statushub Error: {message} {location}")]
    Statushub {
        message: String,
        location: ErrorLocation,
    },

    /// Configuration could not be loaded or is incomplete
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// The relay or requester could not attach to the transport
    #[error("Transport Error: {message} {location}")]
    Transport {
        message: String,
        location: ErrorLocation,
    },
}

impl From<CoreError> for StatushubError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        let message = error.to_string();
        let location = ErrorLocation::from(Location::caller());
        match error {
            CoreError::Config(_) => StatushubError::Config { message, location },
            CoreError::Transport(_) => StatushubError::Transport { message, location },
            CoreError::Session(_) | CoreError::Codec(_) | CoreError::Relay(_) => {
                StatushubError::Statushub { message, location }
            }
        }
    }
}

impl From<ConfigError> for StatushubError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        StatushubError::from(CoreError::from(error))
    }
}

impl From<TransportError> for StatushubError {
    #[track_caller]
    fn from(error: TransportError) -> Self {
        StatushubError::from(CoreError::from(error))
    }
}
