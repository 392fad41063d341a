//! Domain models for the StatusHub relay.
//!
//! This crate contains the pure data structures exchanged between the
//! handheld and the wearable. Models have no I/O and no business logic;
//! the JSON shape of [`LogEntry`] is the device-to-device wire contract.

pub mod error;
pub mod log_entry;
pub mod node_id;
pub mod relay_path;

pub use error::model_error::ModelError;
pub use log_entry::{EntryCollection, LogEntry};
pub use node_id::NodeId;
pub use relay_path::RelayPath;

#[cfg(test)]
mod tests;
