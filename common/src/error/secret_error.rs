use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Refusals raised by secret-holding types such as
/// [`RedactedPassword`](crate::RedactedPassword).
#[derive(Debug, ThisError)]
pub enum SecretError {
    /// A secret was about to leave the process through a serializer.
    #[error("Secret Disclosure Error: {secret} refused to serialize {location}")]
    Disclosure {
        secret: &'static str,
        location: ErrorLocation,
    },
}
