pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod inbox;
pub mod relay;
pub mod requester;
pub mod session_client;
pub mod transport;

#[cfg(test)]
mod tests;

pub const STATUSHUB_USER_AGENT: &str =
    const_format::concatcp!("statushub-relay/", env!("CARGO_PKG_VERSION"));
