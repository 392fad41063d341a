//! Shared building blocks for the StatusHub relay.
//!
//! This crate holds the small types every other crate leans on: error
//! location tracking, HTTP status classification and secret handling.
//!
//! ## Architecture
//!
//! - **common** (this crate): Cross-cutting primitives
//! - **models**: Pure data exchanged between devices
//! - **relay-core**: Session client, codec, transport layer and relay logic
//! - **statushub**: Application wiring everything together

pub mod error;
pub mod http_status;
pub mod redacted_password;

pub use error::error_location::ErrorLocation;
pub use error::secret_error::SecretError;
pub use http_status::HttpStatusCode;
pub use redacted_password::RedactedPassword;

#[cfg(test)]
mod tests;
