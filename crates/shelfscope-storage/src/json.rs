//! JSON helpers over a `KeyValueStore`

use serde::{Serialize, de::DeserializeOwned};
use shelfscope_core::Result;

use crate::KeyValueStore;

/// Outcome of reading a JSON value that may be absent or malformed
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRead<T> {
    Missing,
    Malformed,
    Found(T),
}

impl<T> JsonRead<T> {
    /// Collapse to an option, treating malformed data like missing data
    pub fn ok(self) -> Option<T> {
        match self {
            JsonRead::Found(value) => Some(value),
            JsonRead::Missing | JsonRead::Malformed => None,
        }
    }
}

/// Read and decode a JSON value.
///
/// Storage errors propagate; decode errors are reported as `Malformed`
/// so callers can fall back to defaults.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<JsonRead<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(JsonRead::Missing);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(JsonRead::Found(value)),
        Err(err) => {
            tracing::warn!(key, error = %err, "Discarding malformed stored JSON");
            Ok(JsonRead::Malformed)
        }
    }
}

/// Encode and write a JSON value
pub fn set_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}
