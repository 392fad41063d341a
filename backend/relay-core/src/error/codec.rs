use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("Format Error: {message} {location}")]
    Format {
        message: String,
        location: ErrorLocation,
    },
}

impl CodecError {
    pub fn message(&self) -> &str {
        match self {
            CodecError::Format { message, .. } => message,
        }
    }
}

impl From<serde_json::Error> for CodecError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        CodecError::Format {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
