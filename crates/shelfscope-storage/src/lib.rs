//! Shelfscope Storage - durable string key-value persistence
//!
//! Column orders and the product image cache both live in a shared
//! key-value store. Every write is last-write-wins at the granularity of
//! one key; there is no transactional isolation between writers.

mod json;
mod memory;
pub mod paths;
mod sqlite;

pub use json::*;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use shelfscope_core::Result;

/// A string-keyed, string-valued persistent map
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Returns whether a value was present.
    fn remove(&self, key: &str) -> Result<bool>;

    /// All keys starting with `prefix`, in ascending order
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
