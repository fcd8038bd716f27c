// src/utils/serialization.rs
//! JSON helpers shared by the index file store and proof export.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt::Display;

/// Serializes a value to a compact JSON string.
pub fn serialize<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Serializes a value to indented JSON, the format handed to humans.
pub fn serialize_pretty<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}

/// Deserializes a value from a JSON string.
///
/// # Note
/// The lifetime parameter lets the result borrow from the input string.
pub fn deserialize<'a, T: Deserialize<'a>>(data: &'a str) -> Result<T, serde_json::Error> {
    serde_json::from_str(data)
}

/// `serialize_with` adapter that writes any `Display` value as a string.
pub fn as_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
