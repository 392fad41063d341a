use crate::error::{CodecError, SessionError, TransportError};

use common::ErrorLocation;

use thiserror::Error as ThisError;

const FETCH_FAILURE_PREFIX: &str = "fetch error: ";
const FORMAT_FAILURE_PREFIX: &str = "JSON error: ";
const TRANSPORT_FAILURE_PREFIX: &str = "transport error: ";
const INTERNAL_FORMAT_PREFIX: &str = "internal JSON error: ";
const TIMEOUT_USER_MESSAGE: &str = "connection timeout";

/// Outcome of a relay cycle that did not produce a listing.
#[derive(Debug, ThisError)]
pub enum RelayError {
    /// The dashboard rejected the stored password.
    #[error("Auth Error: {message} {location}")]
    Auth {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No reply arrived within the refresh window.
    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    /// The handheld answered with an `/error` message.
    #[error("Remote Error: {message} {location}")]
    Remote {
        message: String,
        location: ErrorLocation,
    },
}

impl RelayError {
    /// Short diagnostic sent as the `/error` payload.
    ///
    /// Names the failure category and omits source locations.
    pub fn diagnostic(&self) -> String {
        match self {
            RelayError::Auth { message, .. }
            | RelayError::Timeout { message, .. }
            | RelayError::Remote { message, .. } => message.clone(),
            RelayError::Session(SessionError::Format { message, .. }) => {
                format!("{FORMAT_FAILURE_PREFIX}{message}")
            }
            RelayError::Session(e) => format!("{FETCH_FAILURE_PREFIX}{}", e.message()),
            RelayError::Codec(e) => format!("{FORMAT_FAILURE_PREFIX}{}", e.message()),
            RelayError::Transport(e) => format!("{TRANSPORT_FAILURE_PREFIX}{}", e.message()),
        }
    }

    /// The single line shown to the user on the requesting device.
    pub fn user_message(&self) -> String {
        match self {
            RelayError::Timeout { .. } => String::from(TIMEOUT_USER_MESSAGE),
            RelayError::Remote { message, .. } => message.clone(),
            RelayError::Codec(e) => format!("{INTERNAL_FORMAT_PREFIX}{}", e.message()),
            RelayError::Transport(e) => e.message().to_string(),
            RelayError::Auth { .. } | RelayError::Session(_) => self.diagnostic(),
        }
    }
}
