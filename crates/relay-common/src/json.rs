//! JSON encoding and decoding helpers.
//!
//! Thin wrappers over `serde_json` so relay code and sibling services share
//! one place where bodies are encoded and documents are read.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// Serializes a value to a compact JSON string.
///
/// # Errors
///
/// Returns an error if the value cannot be represented as JSON, for example
/// a map whose keys are not strings.
pub fn to_json_string<T>(value: &T) -> serde_json::Result<String>
where
    T: Serialize + ?Sized,
{
    serde_json::to_string(value)
}

/// Deserializes a value from a JSON string.
///
/// # Errors
///
/// Returns an error if the input is malformed or doesn't match `T`.
pub fn from_json_str<T: DeserializeOwned>(contents: &str) -> serde_json::Result<T> {
    serde_json::from_str(contents)
}

/// Deserializes a value from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, or its contents are
/// malformed or don't match `T`.
pub fn from_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
