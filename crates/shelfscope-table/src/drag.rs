//! Drag-and-drop column reordering
//!
//! Pointer gestures arrive as discrete events and drive a small state machine:
//!
//! ```text
//! Idle --drag_start--> Dragging --drag_enter--> Hovering
//!   ^                     |  ^                     |
//!   |                     |  +----drag_leave-------+
//!   +------drop/drag_end--+------------------------+
//! ```
//!
//! The pinned column can neither be dragged nor act as a drop target.

use crate::column::ColumnDescriptor;
use crate::column_order::{ColumnOrder, ColumnOrderStore, normalize_order};

/// Which half of the target header the pointer is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropSide {
    Left,
    Right,
}

impl DropSide {
    /// Left of the header's horizontal midpoint is `Left`, anything else `Right`
    pub fn from_pointer(pointer_x: f32, header_left: f32, header_width: f32) -> Self {
        if pointer_x < header_left + header_width / 2.0 {
            DropSide::Left
        } else {
            DropSide::Right
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        dragged: String,
    },
    Hovering {
        dragged: String,
        target: String,
        side: DropSide,
    },
}

impl DragState {
    pub fn dragged(&self) -> Option<&str> {
        match self {
            DragState::Idle => None,
            DragState::Dragging { dragged } | DragState::Hovering { dragged, .. } => Some(dragged),
        }
    }

    /// Current drop indicator, if any
    pub fn indicator(&self) -> Option<(&str, DropSide)> {
        match self {
            DragState::Hovering { target, side, .. } => Some((target, *side)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// The new order, already normalized and persisted
    Committed(Vec<String>),
    Aborted,
}

/// Move `dragged` next to `target` on the given side.
///
/// Returns `None` (no mutation) when either key is pinned, either key is not
/// in the order, or the column is dropped onto itself. The result always has
/// the pinned key first.
pub fn reorder(
    order: &[String],
    dragged: &str,
    target: &str,
    side: DropSide,
    pinned: &str,
) -> Option<Vec<String>> {
    if dragged == pinned || target == pinned || dragged == target {
        return None;
    }
    let from = order.iter().position(|k| k == dragged)?;
    let target_ix = order.iter().position(|k| k == target)?;

    let mut insert_at = match side {
        DropSide::Left => target_ix,
        DropSide::Right => target_ix + 1,
    };
    if from < insert_at {
        insert_at -= 1;
    }

    let mut next = order.to_vec();
    let key = next.remove(from);
    next.insert(insert_at, key);
    Some(normalize_order(next, pinned))
}

/// Drives `DragState` from pointer events and commits reorders.
///
/// Only one drag may be active; the controller assumes a single pointer.
#[derive(Debug, Default)]
pub struct DragReorderController {
    state: DragState,
}

impl DragReorderController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    /// Begin dragging a header. Returns whether the drag started.
    pub fn drag_start(&mut self, column: &ColumnDescriptor, order: &ColumnOrder) -> bool {
        if order.is_pinned(&column.key) || !column.draggable {
            tracing::debug!(column = %column.key, "Rejected drag start");
            return false;
        }
        self.state = DragState::Dragging {
            dragged: column.key.clone(),
        };
        true
    }

    /// Pointer entered a header; updates the drop indicator
    pub fn drag_enter(
        &mut self,
        target: &str,
        order: &ColumnOrder,
        pointer_x: f32,
        header_left: f32,
        header_width: f32,
    ) {
        if order.is_pinned(target) {
            return;
        }
        let Some(dragged) = self.state.dragged() else {
            return;
        };
        self.state = DragState::Hovering {
            dragged: dragged.to_string(),
            target: target.to_string(),
            side: DropSide::from_pointer(pointer_x, header_left, header_width),
        };
    }

    /// Pointer left a header. Moving into one of the header's own children
    /// keeps the indicator.
    pub fn drag_leave(&mut self, target: &str, into_descendant: bool) {
        if into_descendant {
            return;
        }
        let still_dragging = match &self.state {
            DragState::Hovering {
                dragged,
                target: hovered,
                ..
            } if hovered == target => Some(dragged.clone()),
            _ => None,
        };
        if let Some(dragged) = still_dragging {
            self.state = DragState::Dragging { dragged };
        }
    }

    /// Drop on a header. Commits through `order_store` when the drop is valid.
    pub fn drop(
        &mut self,
        target: &str,
        order: &mut ColumnOrder,
        order_store: Option<(&ColumnOrderStore, Option<&str>)>,
    ) -> DropOutcome {
        let state = std::mem::take(&mut self.state);
        let (dragged, side) = match state {
            DragState::Idle => return DropOutcome::Aborted,
            DragState::Dragging { dragged } => (dragged, DropSide::Left),
            DragState::Hovering {
                dragged,
                target: hovered,
                side,
            } => {
                let side = if hovered == target { side } else { DropSide::Left };
                (dragged, side)
            }
        };

        let Some(next) = reorder(order.keys(), &dragged, target, side, order.pinned_key()) else {
            tracing::debug!(dragged = %dragged, drop_target = target, "Aborted column drop");
            return DropOutcome::Aborted;
        };

        order.replace(next);
        if let Some((store, table_key)) = order_store {
            if let Err(err) = store.save(table_key, order) {
                tracing::warn!(error = %err, "Failed to persist column order");
            }
        }
        tracing::info!(dragged = %dragged, drop_target = target, ?side, "Reordered columns");
        DropOutcome::Committed(order.keys().to_vec())
    }

    /// Gesture ended. If no drop happened the drag is abandoned.
    pub fn drag_end(&mut self) {
        self.state = DragState::Idle;
    }
}
