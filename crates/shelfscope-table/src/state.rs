//! Per-table state
//!
//! `TableState` is what a page holds for one grid: the fixed column and
//! filter configuration plus the transient query, the column order, the
//! drag gesture and the fullscreen flag.

use shelfscope_core::Record;
use shelfscope_storage::{KeyValueStore, MemoryStore};
use std::sync::Arc;

use crate::column::{ColumnDescriptor, resolve_columns};
use crate::column_order::{ColumnOrder, ColumnOrderStore, DEFAULT_PINNED_KEY};
use crate::drag::{DragReorderController, DropOutcome};
use crate::fullscreen::{FullscreenController, Key, NoopScrollLock, ScrollLock, ViewMode};
use crate::query::{QueryEngine, QueryState, SortState};

pub struct TableStateBuilder {
    columns: Vec<ColumnDescriptor>,
    engine: QueryEngine,
    table_key: Option<String>,
    default_order: Option<Vec<String>>,
    pinned_key: String,
    store: Option<Arc<dyn KeyValueStore>>,
    scroll_lock: Arc<dyn ScrollLock>,
}

impl TableStateBuilder {
    pub fn search_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.engine = self.engine.with_search_fields(fields);
        self
    }

    pub fn filter(
        mut self,
        key: impl Into<String>,
        predicate: impl Fn(&Record, &str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.engine = self.engine.with_filter(key, predicate);
        self
    }

    /// Persist the column order under this key. Without one the order is session-only.
    pub fn table_key(mut self, key: impl Into<String>) -> Self {
        self.table_key = Some(key.into());
        self
    }

    /// Default column order; falls back to descriptor order
    pub fn default_order<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.default_order = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn pinned_key(mut self, key: impl Into<String>) -> Self {
        self.pinned_key = key.into();
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn scroll_lock(mut self, lock: Arc<dyn ScrollLock>) -> Self {
        self.scroll_lock = lock;
        self
    }

    pub fn build(self) -> TableState {
        let default_order = self
            .default_order
            .unwrap_or_else(|| self.columns.iter().map(|c| c.key.clone()).collect());

        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let order_store = ColumnOrderStore::new(store).with_pinned_key(self.pinned_key);
        let order = order_store.load(self.table_key.as_deref(), &default_order);

        TableState {
            columns: self.columns,
            engine: self.engine,
            query: QueryState::default(),
            table_key: self.table_key,
            default_order,
            order_store,
            order,
            drag: DragReorderController::new(),
            fullscreen: FullscreenController::new(self.scroll_lock),
        }
    }
}

#[derive(Debug)]
pub struct TableState {
    columns: Vec<ColumnDescriptor>,
    engine: QueryEngine,
    query: QueryState,
    table_key: Option<String>,
    default_order: Vec<String>,
    order_store: ColumnOrderStore,
    order: ColumnOrder,
    drag: DragReorderController,
    fullscreen: FullscreenController,
}

impl TableState {
    pub fn builder(columns: Vec<ColumnDescriptor>) -> TableStateBuilder {
        TableStateBuilder {
            columns,
            engine: QueryEngine::default(),
            table_key: None,
            default_order: None,
            pinned_key: DEFAULT_PINNED_KEY.to_string(),
            store: None,
            scroll_lock: Arc::new(NoopScrollLock),
        }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn table_key(&self) -> Option<&str> {
        self.table_key.as_deref()
    }

    // Query

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.query.search = term.into();
    }

    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.set_filter(key, value);
    }

    /// Header click on a column. Non-sortable and unknown columns are ignored.
    pub fn toggle_sort(&mut self, column_key: &str) {
        let sortable = self
            .columns
            .iter()
            .any(|c| c.key == column_key && c.is_sortable());
        if sortable {
            self.query.sort.toggle(column_key);
        }
    }

    pub fn sort(&self) -> &SortState {
        &self.query.sort
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
    }

    /// Indices into `records` in display order
    pub fn rows(&self, records: &[Record]) -> Vec<usize> {
        self.engine.run(records, &self.columns, &self.query)
    }

    pub fn match_count(&self, records: &[Record]) -> usize {
        self.rows(records).len()
    }

    pub fn row_records<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        self.engine.run_records(records, &self.columns, &self.query)
    }

    // Columns

    pub fn column_order(&self) -> &ColumnOrder {
        &self.order
    }

    /// Descriptors in display order, skipping keys without a descriptor
    pub fn visible_columns(&self) -> Vec<&ColumnDescriptor> {
        resolve_columns(self.order.keys(), &self.columns)
    }

    /// Back to the declared column order. Applied even when it cannot be
    /// persisted.
    pub fn reset_column_order(&mut self) {
        self.order = self
            .order_store
            .reset(self.table_key.as_deref(), &self.default_order);
    }

    // Drag and drop

    pub fn drag(&self) -> &DragReorderController {
        &self.drag
    }

    pub fn drag_start(&mut self, column_key: &str) -> bool {
        let Some(column) = self.columns.iter().find(|c| c.key == column_key) else {
            return false;
        };
        self.drag.drag_start(column, &self.order)
    }

    pub fn drag_enter(&mut self, target: &str, pointer_x: f32, header_left: f32, header_width: f32) {
        self.drag
            .drag_enter(target, &self.order, pointer_x, header_left, header_width);
    }

    pub fn drag_leave(&mut self, target: &str, into_descendant: bool) {
        self.drag.drag_leave(target, into_descendant);
    }

    pub fn drop_on(&mut self, target: &str) -> DropOutcome {
        self.drag.drop(
            target,
            &mut self.order,
            Some((&self.order_store, self.table_key.as_deref())),
        )
    }

    pub fn drag_end(&mut self) {
        self.drag.drag_end();
    }

    // Fullscreen

    pub fn view_mode(&self) -> ViewMode {
        self.fullscreen.mode()
    }

    pub fn enter_fullscreen(&mut self) {
        self.fullscreen.enter();
    }

    pub fn exit_fullscreen(&mut self) {
        self.fullscreen.exit();
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen.toggle();
    }

    pub fn key_pressed(&mut self, key: Key) -> bool {
        self.fullscreen.key_pressed(key)
    }

    pub fn outside_click(&mut self) {
        self.fullscreen.outside_click();
    }
}
