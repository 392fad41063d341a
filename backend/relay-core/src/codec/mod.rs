//! Device-to-device encoding of the dashboard overview.
//!
//! The wire form is a JSON array of `{"serviceName": .., "message": ..}`
//! objects in display order. Both the handheld (encoding what it fetched)
//! and the wearable (decoding for display) go through these two functions.

use crate::error::CodecError;

use models::EntryCollection;

use log::debug;

/// Encode entries for a `/listing` payload.
///
/// Key names, key order and array order are fixed, so equal collections
/// always produce identical bytes.
///
/// # Errors
///
/// Returns [`CodecError::Format`] only if serde rejects a value, which string
/// fields never trigger.
pub fn encode(entries: &EntryCollection) -> Result<Vec<u8>, CodecError> {
    let bytes = serde_json::to_vec(entries)?;
    debug!("Encoded {} entries into {} bytes", entries.len(), bytes.len());
    Ok(bytes)
}

/// Decode a `/listing` payload.
///
/// # Errors
///
/// Returns [`CodecError::Format`] if the bytes are not a JSON array or any
/// element lacks `serviceName` or `message`. No partial result is returned.
pub fn decode(bytes: &[u8]) -> Result<EntryCollection, CodecError> {
    let entries: EntryCollection = serde_json::from_slice(bytes)?;
    debug!("Decoded {} entries from {} bytes", entries.len(), bytes.len());
    Ok(entries)
}
