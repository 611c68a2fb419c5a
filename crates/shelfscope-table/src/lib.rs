//! Shelfscope Table - the data table engine behind every dashboard grid
//!
//! - `query` - search, filter and sort composed into one derived view
//! - `column_order` - durable per-table column ordering with a pinned first column
//! - `drag` - drag-and-drop column reordering as an explicit state machine
//! - `fullscreen` - presentation mode toggle, independent of the data
//! - `state` - `TableState`, which wires the pieces together for one table

mod column;
pub mod column_order;
pub mod drag;
pub mod fullscreen;
pub mod query;
mod state;

pub use column::*;
pub use column_order::{ColumnOrder, ColumnOrderStore, DEFAULT_PINNED_KEY, normalize_order};
pub use drag::{DragReorderController, DragState, DropOutcome, DropSide, reorder};
pub use fullscreen::{FullscreenController, Key, NoopScrollLock, ScrollLock, ViewMode};
pub use query::{
    FilterPredicate, QueryEngine, QueryState, SortDirection, SortState, ALL_FILTER_VALUE,
};
pub use state::{TableState, TableStateBuilder};
