use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures talking to the dashboard service.
#[derive(Debug, ThisError)]
pub enum SessionError {
    /// Connection could not be established, or a connect/read bound elapsed.
    #[error("Transport Error: {message} {location}")]
    Transport {
        message: String,
        is_timeout: bool,
        location: ErrorLocation,
    },

    #[error("Fetch Error: HTTP {status} - {message} {location}")]
    Fetch {
        message: String,
        status: HttpStatusCode,
        location: ErrorLocation,
    },

    #[error("Format Error: {message} {location}")]
    Format {
        message: String,
        location: ErrorLocation,
    },

    #[error("URL Parse Error: {message} {location}")]
    UrlParse {
        message: String,
        location: ErrorLocation,
    },
}

impl SessionError {
    pub fn message(&self) -> &str {
        match self {
            SessionError::Transport { message, .. }
            | SessionError::Fetch { message, .. }
            | SessionError::Format { message, .. }
            | SessionError::UrlParse { message, .. } => message,
        }
    }
}

impl From<reqwest::Error> for SessionError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        SessionError::Transport {
            is_timeout: error.is_timeout(),
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<url::ParseError> for SessionError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        SessionError::UrlParse {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        SessionError::Format {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
