//! Search, filter and sort over an in-memory record collection
//!
//! The engine is a strict three-stage pipeline: search, then filters, then
//! sort. Each stage works on indices into the caller's slice, so the derived
//! view never copies records.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use shelfscope_core::Record;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::column::ColumnDescriptor;

/// Filter value meaning "do not filter on this key"
pub const ALL_FILTER_VALUE: &str = "all";

/// Predicate deciding whether a record passes a filter with the selected value
pub type FilterPredicate = Arc<dyn Fn(&Record, &str) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Active sort. `key = None` keeps the input order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    pub key: Option<String>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn by(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: Some(key.into()),
            direction,
        }
    }

    /// Header click: the same column flips direction, a new column starts ascending
    pub fn toggle(&mut self, key: &str) {
        if self.key.as_deref() == Some(key) {
            self.direction = self.direction.flipped();
        } else {
            self.key = Some(key.to_string());
            self.direction = SortDirection::Asc;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self) -> bool {
        self.key.is_some()
    }
}

/// Transient user input for one table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryState {
    pub search: String,
    /// Filter key to selected value; `ALL_FILTER_VALUE` disables the filter
    pub filters: IndexMap<String, String>,
    pub sort: SortState,
}

impl QueryState {
    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.filters.insert(key.into(), value.into());
    }

    /// Filters whose value is not the "all" sentinel
    pub fn active_filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters
            .iter()
            .filter(|(_, value)| value.as_str() != ALL_FILTER_VALUE)
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Reset search, every filter back to "all", and sort to unsorted
    pub fn clear(&mut self) {
        self.search.clear();
        for value in self.filters.values_mut() {
            *value = ALL_FILTER_VALUE.to_string();
        }
        self.sort.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.active_filters().next().is_none() && !self.sort.is_active()
    }
}

/// Fixed table configuration: which fields search looks at and the filter predicates
#[derive(Clone, Default)]
pub struct QueryEngine {
    search_fields: Vec<String>,
    predicates: IndexMap<String, FilterPredicate>,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("search_fields", &self.search_fields)
            .field("predicates", &self.predicates.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl QueryEngine {
    pub fn new<S: Into<String>>(search_fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            search_fields: search_fields.into_iter().map(Into::into).collect(),
            predicates: IndexMap::new(),
        }
    }

    pub fn with_search_fields<S: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filter(
        mut self,
        key: impl Into<String>,
        predicate: impl Fn(&Record, &str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicates.insert(key.into(), Arc::new(predicate));
        self
    }

    pub fn search_fields(&self) -> &[String] {
        &self.search_fields
    }

    pub fn filter_keys(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }

    /// Run the full pipeline and return indices into `records`, in display order
    pub fn run(
        &self,
        records: &[Record],
        columns: &[ColumnDescriptor],
        state: &QueryState,
    ) -> Vec<usize> {
        let all: Vec<usize> = (0..records.len()).collect();
        let searched = apply_search(records, all, &state.search, &self.search_fields);
        let filtered = self.apply_filters(records, searched, state);
        apply_sort(records, filtered, columns, &state.sort)
    }

    /// Convenience over `run` returning record references
    pub fn run_records<'a>(
        &self,
        records: &'a [Record],
        columns: &[ColumnDescriptor],
        state: &QueryState,
    ) -> Vec<&'a Record> {
        self.run(records, columns, state)
            .into_iter()
            .map(|ix| &records[ix])
            .collect()
    }

    /// Keep rows passing every active filter (logical AND)
    pub fn apply_filters(
        &self,
        records: &[Record],
        indices: Vec<usize>,
        state: &QueryState,
    ) -> Vec<usize> {
        let active: Vec<(&FilterPredicate, &str)> = state
            .active_filters()
            .filter_map(|(key, value)| match self.predicates.get(key) {
                Some(predicate) => Some((predicate, value)),
                None => {
                    tracing::debug!(filter = key, "Ignoring filter without a predicate");
                    None
                }
            })
            .collect();

        if active.is_empty() {
            return indices;
        }

        indices
            .into_iter()
            .filter(|&ix| {
                active
                    .iter()
                    .all(|(predicate, value)| predicate(&records[ix], *value))
            })
            .collect()
    }
}

/// Keep rows where any search field contains `term`, case-insensitively.
/// An empty term passes everything through.
pub fn apply_search(
    records: &[Record],
    indices: Vec<usize>,
    term: &str,
    fields: &[String],
) -> Vec<usize> {
    if term.is_empty() {
        return indices;
    }

    let needle = term.to_lowercase();
    indices
        .into_iter()
        .filter(|&ix| {
            let record = &records[ix];
            fields.iter().any(|field| {
                record
                    .get(field)
                    .is_some_and(|value| value.display_text().to_lowercase().contains(&needle))
            })
        })
        .collect()
}

/// Stable sort of `indices` by the active sort column.
///
/// Missing values always sort after present ones, in both directions.
pub fn apply_sort(
    records: &[Record],
    mut indices: Vec<usize>,
    columns: &[ColumnDescriptor],
    sort: &SortState,
) -> Vec<usize> {
    let Some(key) = sort.key.as_deref() else {
        return indices;
    };
    let Some(column) = columns.iter().find(|c| c.key == key) else {
        return indices;
    };
    let Some(field) = column.sort_key.as_deref() else {
        return indices;
    };

    let direction = sort.direction;
    match &column.comparator {
        Some(compare) => {
            indices.sort_by(|&a, &b| compare(&records[a], &records[b], direction));
        }
        None => {
            indices.sort_by(|&a, &b| {
                match (records[a].get_present(field), records[b].get_present(field)) {
                    (Some(va), Some(vb)) => direction.apply(va.compare(vb)),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            });
        }
    }

    indices
}
