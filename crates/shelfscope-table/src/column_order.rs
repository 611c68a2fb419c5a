//! Persisted column ordering
//!
//! Orders are stored per table under `table-column-order-{table_key}` as a
//! JSON array of column keys. The pinned key is forced to the front on every
//! load, save and reset. Tables without a key keep their order in memory only.

use shelfscope_core::Result;
use shelfscope_storage::{JsonRead, KeyValueStore, get_json, set_json};
use std::sync::Arc;

/// Conventional pinned column
pub const DEFAULT_PINNED_KEY: &str = "product";

const STORAGE_KEY_PREFIX: &str = "table-column-order-";

/// Move `pinned` to index 0 if it is present anywhere in `keys`.
///
/// Idempotent; orders without the pinned key are returned unchanged.
pub fn normalize_order(mut keys: Vec<String>, pinned: &str) -> Vec<String> {
    if let Some(ix) = keys.iter().position(|k| k == pinned) {
        if ix != 0 {
            let key = keys.remove(ix);
            keys.insert(0, key);
        }
    }
    keys
}

/// An ordered sequence of column keys with a pinned first column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOrder {
    keys: Vec<String>,
    pinned_key: String,
}

impl ColumnOrder {
    pub fn new(keys: Vec<String>, pinned_key: impl Into<String>) -> Self {
        let pinned_key = pinned_key.into();
        Self {
            keys: normalize_order(keys, &pinned_key),
            pinned_key,
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn pinned_key(&self) -> &str {
        &self.pinned_key
    }

    pub fn is_pinned(&self, key: &str) -> bool {
        self.pinned_key == key
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub(crate) fn replace(&mut self, keys: Vec<String>) {
        self.keys = normalize_order(keys, &self.pinned_key);
    }

    pub fn into_keys(self) -> Vec<String> {
        self.keys
    }
}

/// Loads, saves and resets column orders against a shared key-value store
#[derive(Clone)]
pub struct ColumnOrderStore {
    store: Arc<dyn KeyValueStore>,
    pinned_key: String,
}

impl std::fmt::Debug for ColumnOrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnOrderStore")
            .field("pinned_key", &self.pinned_key)
            .finish_non_exhaustive()
    }
}

impl ColumnOrderStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            pinned_key: DEFAULT_PINNED_KEY.to_string(),
        }
    }

    pub fn with_pinned_key(mut self, pinned_key: impl Into<String>) -> Self {
        self.pinned_key = pinned_key.into();
        self
    }

    pub fn pinned_key(&self) -> &str {
        &self.pinned_key
    }

    pub fn storage_key(table_key: &str) -> String {
        format!("{STORAGE_KEY_PREFIX}{table_key}")
    }

    /// Resolve the order for a table: persisted if readable, otherwise the default.
    ///
    /// Storage failures and malformed data fall back to the default instead of
    /// surfacing to the caller.
    pub fn load(&self, table_key: Option<&str>, default_order: &[String]) -> ColumnOrder {
        let Some(table_key) = table_key else {
            return ColumnOrder::new(default_order.to_vec(), &self.pinned_key);
        };

        let storage_key = Self::storage_key(table_key);
        let keys = match get_json::<Vec<String>>(self.store.as_ref(), &storage_key) {
            Ok(JsonRead::Found(keys)) => keys,
            Ok(JsonRead::Missing) | Ok(JsonRead::Malformed) => default_order.to_vec(),
            Err(err) => {
                tracing::warn!(table = table_key, error = %err, "Failed to read column order, using default");
                default_order.to_vec()
            }
        };

        ColumnOrder::new(keys, &self.pinned_key)
    }

    /// Persist the full order. A table without a key is not persisted.
    pub fn save(&self, table_key: Option<&str>, order: &ColumnOrder) -> Result<()> {
        let Some(table_key) = table_key else {
            return Ok(());
        };
        set_json(
            self.store.as_ref(),
            &Self::storage_key(table_key),
            order.keys(),
        )?;
        tracing::debug!(table = table_key, columns = ?order.keys(), "Saved column order");
        Ok(())
    }

    /// Restore the default order and persist it. A failed write is logged
    /// and the default order is still returned, same as a drop.
    pub fn reset(&self, table_key: Option<&str>, default_order: &[String]) -> ColumnOrder {
        let order = ColumnOrder::new(default_order.to_vec(), &self.pinned_key);
        if let Err(err) = self.save(table_key, &order) {
            tracing::warn!(table = table_key, error = %err, "Failed to persist column order reset");
        }
        tracing::info!(table = table_key.unwrap_or("<session>"), "Reset column order");
        order
    }
}
