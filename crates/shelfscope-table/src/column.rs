//! Column descriptors

use shelfscope_core::Record;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::query::SortDirection;

/// Custom comparator for a column.
///
/// Fully replaces the default comparison and receives the active direction,
/// so it is responsible for reversing its own result when descending.
pub type Comparator = Arc<dyn Fn(&Record, &Record, SortDirection) -> Ordering + Send + Sync>;

/// Metadata for one table column
#[derive(Clone)]
pub struct ColumnDescriptor {
    /// Unique column key, also the identifier stored in column orders
    pub key: String,
    /// Header label
    pub label: String,
    /// Record field to sort on. `None` marks a non-sortable column.
    pub sort_key: Option<String>,
    /// Whether the header may be dragged to reorder
    pub draggable: bool,
    pub comparator: Option<Comparator>,
}

impl ColumnDescriptor {
    /// A sortable, draggable column whose sort field equals its key
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            sort_key: Some(key.clone()),
            key,
            label: label.into(),
            draggable: true,
            comparator: None,
        }
    }

    pub fn sort_key(mut self, field: impl Into<String>) -> Self {
        self.sort_key = Some(field.into());
        self
    }

    /// Mark the column as non-sortable (e.g. action buttons)
    pub fn unsortable(mut self) -> Self {
        self.sort_key = None;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.draggable = false;
        self
    }

    pub fn comparator(
        mut self,
        compare: impl Fn(&Record, &Record, SortDirection) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.comparator = Some(Arc::new(compare));
        self
    }

    pub fn is_sortable(&self) -> bool {
        self.sort_key.is_some()
    }
}

impl std::fmt::Debug for ColumnDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("sort_key", &self.sort_key)
            .field("draggable", &self.draggable)
            .field("comparator", &self.comparator.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Resolve an ordered list of keys to descriptors.
///
/// Keys without a descriptor are skipped; descriptors absent from the order
/// are not rendered.
pub fn resolve_columns<'a>(
    order: &[String],
    columns: &'a [ColumnDescriptor],
) -> Vec<&'a ColumnDescriptor> {
    order
        .iter()
        .filter_map(|key| {
            let column = columns.iter().find(|c| &c.key == key);
            if column.is_none() {
                tracing::debug!(column = %key, "Skipping unknown column key");
            }
            column
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_skips_unknown_and_unlisted() {
        let columns = vec![
            ColumnDescriptor::new("product", "Product").fixed(),
            ColumnDescriptor::new("age", "Age"),
            ColumnDescriptor::new("actions", "").unsortable(),
        ];
        let order = vec![
            "product".to_string(),
            "removed_column".to_string(),
            "age".to_string(),
        ];

        let resolved: Vec<&str> = resolve_columns(&order, &columns)
            .into_iter()
            .map(|c| c.key.as_str())
            .collect();
        assert_eq!(resolved, vec!["product", "age"]);
    }

    #[test]
    fn test_builder_flags() {
        let column = ColumnDescriptor::new("price", "Price").sort_key("unit_price");
        assert_eq!(column.sort_key.as_deref(), Some("unit_price"));
        assert!(column.draggable);

        let actions = ColumnDescriptor::new("actions", "Actions").unsortable().fixed();
        assert!(!actions.is_sortable());
        assert!(!actions.draggable);
    }
}
