//! Stacking order of floating windows.
//!
//! The activation list is the only source of truth: index 0 is the window
//! activated longest ago (bottom), the last index is on top. Rendered
//! z-index is `base + index`.

use crate::windows::WindowId;
use zoon::{Mutable, Signal, SignalExt};

#[derive(Clone, Debug)]
pub struct StackingOrder {
    order: Mutable<Vec<WindowId>>,
    base: i32,
}

impl StackingOrder {
    pub fn new(base: i32) -> Self {
        Self {
            order: Mutable::new(Vec::new()),
            base,
        }
    }

    /// Moves `id` to the top, registering it if needed.
    pub fn bring_to_front(&self, id: WindowId) {
        let mut order = self.order.lock_mut();
        if order.last() == Some(&id) {
            return;
        }
        order.retain(|existing| *existing != id);
        order.push(id);
    }

    pub fn unregister(&self, id: WindowId) {
        let mut order = self.order.lock_mut();
        if order.contains(&id) {
            order.retain(|existing| *existing != id);
        }
    }

    /// Windows never activated sit at `base`.
    pub fn z_index_of(&self, id: WindowId) -> i32 {
        let order = self.order.lock_ref();
        z_index_in(&order, id, self.base)
    }

    /// Emits whenever this window's z-index changes.
    pub fn z_index_signal(&self, id: WindowId) -> impl Signal<Item = i32> + use<> {
        let base = self.base;
        self.order
            .signal_ref(move |order| z_index_in(order, id, base))
            .dedupe()
    }

    pub fn top(&self) -> Option<WindowId> {
        self.order.lock_ref().last().copied()
    }

    /// Bottom to top.
    pub fn order(&self) -> Vec<WindowId> {
        self.order.get_cloned()
    }

    pub fn base(&self) -> i32 {
        self.base
    }
}

fn z_index_in(order: &[WindowId], id: WindowId, base: i32) -> i32 {
    order
        .iter()
        .position(|existing| *existing == id)
        .map_or(base, |index| base + index as i32)
}
