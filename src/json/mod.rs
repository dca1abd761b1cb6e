//! JSON Decoding
//!
//! Parses response bodies into a generic value tree. Any valid document is
//! accepted at top level, including bare arrays and scalars. Numbers keep
//! their textual precision.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DecodeError;

/// Generic JSON value tree.
pub type JsonValue = serde_json::Value;

/// Decode a JSON document.
pub fn decode(bytes: &[u8]) -> Result<JsonValue, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decode a JSON document into a concrete type.
pub fn decode_as<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Encode a value as compact JSON.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, DecodeError> {
    Ok(serde_json::to_string(value)?)
}
