//! Window placement arithmetic.
//!
//! Two clamp rules coexist on purpose:
//! - [`clamp_to_drag_container`] is used while a window is being dragged and
//!   keeps the whole window inside the container.
//! - [`clamp_position`] / [`reconcile_on_container_resize`] run after the
//!   container changes size (and once after mount). They only require
//!   `min_visible_px` of the window to remain reachable, and never let the
//!   top edge go above the container so the title bar stays grabbable.

use shared::{Extent, Position};

/// Clamps `position` so that at least `min_visible_px` of the window stays
/// inside the container on every edge. The top edge never goes negative.
pub fn clamp_position(
    position: Position,
    window: Extent,
    container: Extent,
    min_visible_px: f64,
) -> Position {
    let min_x = -(window.width - min_visible_px);
    let max_x = container.width - min_visible_px;
    let min_y = 0.0;
    let max_y = container.height - min_visible_px;

    Position::new(
        clamp_axis(position.x, min_x, max_x),
        clamp_axis(position.y, min_y, max_y),
    )
}

/// Unclamped position for a pointer that grabbed the window `drag_offset`
/// pixels away from its top-left corner.
pub fn drag_to(pointer: Position, drag_offset: Position) -> Position {
    Position::new(pointer.x - drag_offset.x, pointer.y - drag_offset.y)
}

/// Strict clamp used during live dragging: the window must fit entirely.
pub fn clamp_to_drag_container(position: Position, window: Extent, container: Extent) -> Position {
    let max_x = container.width - window.width;
    let max_y = container.height - window.height;
    Position::new(
        position.x.min(max_x).max(0.0),
        position.y.min(max_y).max(0.0),
    )
}

/// Size at the moment a resize gesture started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeOrigin {
    pub size: Extent,
}

/// New size after the pointer moved `pointer_delta` since the resize began.
/// Floors at `min_size`, no upper bound.
pub fn resize_to(pointer_delta: Position, origin: ResizeOrigin, min_size: Extent) -> Extent {
    Extent::new(
        (origin.size.width + pointer_delta.x).max(min_size.width),
        (origin.size.height + pointer_delta.y).max(min_size.height),
    )
}

/// Re-asserts bounds after the container was resized or the window mounted.
/// Returns `None` when the window is already within bounds.
pub fn reconcile_on_container_resize(
    position: Position,
    window: Extent,
    container: Extent,
    min_visible_px: f64,
) -> Option<Position> {
    let clamped = clamp_position(position, window, container, min_visible_px);
    (clamped != position).then_some(clamped)
}

// Lower bound wins when the range is empty (tiny containers).
fn clamp_axis(value: f64, min: f64, max: f64) -> f64 {
    value.min(max).max(min)
}
