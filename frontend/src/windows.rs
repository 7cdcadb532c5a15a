//! The set of open asset windows.
//!
//! `OpenWindows` exclusively owns every [`WindowHandle`] and the
//! [`StackingOrder`]; windows change each other only through its methods.
//! At most one window exists per saved asset. Draft windows (no asset id
//! yet) are exempt and may multiply.
//!
//! Each window has at most one mounted [`AssetEditor`]; closing the window
//! unmounts it.

use crate::editor::{AssetEditor, EditorDeps};
use crate::geometry::{self, ResizeOrigin};
use crate::stacking::StackingOrder;
use crate::telemetry::Telemetry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use shared::{AssetId, AssetType, Extent, Position, WindowLayout, WindowSize, WindowsSection};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};
use zoon::{Mutable, Signal, SignalExt};

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(u64);

impl WindowId {
    pub fn next() -> Self {
        Self(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "modal-{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowHandle {
    pub id: WindowId,
    pub asset_type: AssetType,
    /// `None` until a draft is created on the server
    pub asset_id: Option<AssetId>,
    pub display_name: String,
    pub position: Position,
    pub size: WindowSize,
    pub is_minimized: bool,
    pub is_stale: bool,
}

impl WindowHandle {
    pub fn is_draft(&self) -> bool {
        self.asset_id.is_none()
    }

    fn shows(&self, asset_type: AssetType, asset_id: &AssetId) -> bool {
        self.asset_type == asset_type && self.asset_id.as_ref() == Some(asset_id)
    }

    fn layout(&self) -> Option<WindowLayout> {
        Some(WindowLayout {
            asset_type: self.asset_type,
            asset_id: self.asset_id.clone()?,
            display_name: self.display_name.clone(),
            position: self.position,
            size: self.size,
            is_minimized: self.is_minimized,
        })
    }
}

#[derive(Clone)]
pub struct OpenWindows {
    windows: Mutable<IndexMap<WindowId, WindowHandle>>,
    stacking: StackingOrder,
    editors: Arc<Mutex<IndexMap<WindowId, AssetEditor>>>,
    settings: Arc<WindowsSection>,
    telemetry: Arc<dyn Telemetry>,
}

impl OpenWindows {
    pub fn new(settings: WindowsSection, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            windows: Mutable::new(IndexMap::new()),
            stacking: StackingOrder::new(settings.base_z_index),
            editors: Arc::new(Mutex::new(IndexMap::new())),
            settings: Arc::new(settings),
            telemetry,
        }
    }

    // ===== OPEN / CLOSE =====

    /// Opens a window for the asset, or raises the one already showing it.
    pub fn open_modal(
        &self,
        asset_type: AssetType,
        asset_id: Option<AssetId>,
        display_name: impl Into<String>,
    ) -> WindowId {
        self.open_with(asset_type, asset_id, display_name.into(), None, None)
    }

    /// Like [`open_modal`](Self::open_modal) with explicit geometry for a new window.
    pub fn open_modal_at(
        &self,
        asset_type: AssetType,
        asset_id: Option<AssetId>,
        display_name: impl Into<String>,
        position: Position,
        size: WindowSize,
    ) -> WindowId {
        self.open_with(asset_type, asset_id, display_name.into(), Some(position), Some(size))
    }

    fn open_with(
        &self,
        asset_type: AssetType,
        asset_id: Option<AssetId>,
        display_name: String,
        position: Option<Position>,
        size: Option<WindowSize>,
    ) -> WindowId {
        if let Some(asset_id) = &asset_id {
            if let Some(existing) = self.find_by_asset(asset_type, asset_id) {
                log::debug!("windows: {asset_type} {asset_id} already open as {existing}, raising it");
                self.maximize_modal(existing);
                return existing;
            }
        }

        let id = WindowId::next();
        {
            let mut windows = self.windows.lock_mut();
            let position = position.unwrap_or_else(|| self.cascade_position(windows.len()));
            let size = size.unwrap_or(WindowSize::new(
                self.settings.default_width,
                self.settings.default_height,
            ));
            windows.insert(
                id,
                WindowHandle {
                    id,
                    asset_type,
                    asset_id: asset_id.clone(),
                    display_name,
                    position,
                    size,
                    is_minimized: false,
                    is_stale: false,
                },
            );
        }
        self.stacking.bring_to_front(id);

        log::debug!("windows: opened {id} for {asset_type} {asset_id:?}");
        self.telemetry.log_event(
            "modal_opened",
            &[
                ("asset_type", asset_type.label().to_string()),
                ("asset_id", asset_id.map_or_else(|| "new".to_string(), |id| id.to_string())),
            ],
        );
        id
    }

    fn cascade_position(&self, open_count: usize) -> Position {
        let step = (open_count % self.settings.cascade_steps.max(1) as usize) as f64;
        Position::new(
            self.settings.initial_x + step * self.settings.cascade_offset,
            self.settings.initial_y + step * self.settings.cascade_offset,
        )
    }

    /// Closes the window and unmounts its editor.
    pub fn close_modal(&self, id: WindowId) -> bool {
        let removed = self.windows.lock_mut().shift_remove(&id);
        self.stacking.unregister(id);
        let editor = self.editors().shift_remove(&id);
        if let Some(editor) = editor {
            editor.unmount();
        }
        match removed {
            Some(handle) => {
                log::debug!("windows: closed {id}");
                self.telemetry.log_event(
                    "modal_closed",
                    &[("asset_type", handle.asset_type.label().to_string())],
                );
                true
            }
            None => false,
        }
    }

    /// Replaces a draft window by one bound to the freshly created asset, at
    /// the same place. Returns `None` if the draft window was already closed.
    pub fn transplant(
        &self,
        draft_id: WindowId,
        asset_id: AssetId,
        display_name: impl Into<String>,
    ) -> Option<WindowId> {
        let draft = self.get(draft_id)?;
        self.close_modal(draft_id);
        let id = self.open_with(
            draft.asset_type,
            Some(asset_id),
            display_name.into(),
            Some(draft.position),
            Some(draft.size),
        );
        if draft.is_minimized {
            self.minimize_modal(id);
        }
        log::debug!("windows: {draft_id} became {id}");
        self.telemetry.log_event(
            "modal_transplanted",
            &[("asset_type", draft.asset_type.label().to_string())],
        );
        Some(id)
    }

    /// The window's editor, mounting one on first use. `None` if the window
    /// is not open.
    pub fn mount_editor(&self, id: WindowId, deps: EditorDeps) -> Option<AssetEditor> {
        if let Some(editor) = self.editor(id) {
            return Some(editor);
        }
        let editor = AssetEditor::mount(self.clone(), id, deps)?;
        let mut editors = self.editors();
        // Another caller may have mounted first.
        if let Some(existing) = editors.get(&id).filter(|existing| existing.is_mounted()) {
            let existing = existing.clone();
            drop(editors);
            editor.unmount();
            return Some(existing);
        }
        editors.insert(id, editor.clone());
        Some(editor)
    }

    pub fn editor(&self, id: WindowId) -> Option<AssetEditor> {
        self.editors()
            .get(&id)
            .filter(|editor| editor.is_mounted())
            .cloned()
    }

    // ===== VISIBILITY & ORDER =====

    pub fn activate(&self, id: WindowId) {
        if self.contains(id) {
            self.stacking.bring_to_front(id);
        }
    }

    pub fn minimize_modal(&self, id: WindowId) -> bool {
        self.update_handle(id, |handle| handle.is_minimized = true)
    }

    /// Restores a minimized window and raises it.
    pub fn maximize_modal(&self, id: WindowId) -> bool {
        let found = self.update_handle(id, |handle| handle.is_minimized = false);
        if found {
            self.stacking.bring_to_front(id);
        }
        found
    }

    pub fn toggle_minimize(&self, id: WindowId) -> bool {
        match self.get(id) {
            Some(handle) if handle.is_minimized => self.maximize_modal(id),
            Some(_) => self.minimize_modal(id),
            None => false,
        }
    }

    pub fn minimize_all_by_type(&self, asset_type: AssetType) -> usize {
        self.ids_of_type(asset_type)
            .into_iter()
            .filter(|id| self.minimize_modal(*id))
            .count()
    }

    pub fn maximize_all_by_type(&self, asset_type: AssetType) -> usize {
        self.ids_of_type(asset_type)
            .into_iter()
            .filter(|id| self.maximize_modal(*id))
            .count()
    }

    pub fn close_all_by_type(&self, asset_type: AssetType) -> usize {
        self.ids_of_type(asset_type)
            .into_iter()
            .filter(|id| self.close_modal(*id))
            .count()
    }

    pub fn z_index_of(&self, id: WindowId) -> i32 {
        self.stacking.z_index_of(id)
    }

    pub fn z_index_signal(&self, id: WindowId) -> impl Signal<Item = i32> + use<> {
        self.stacking.z_index_signal(id)
    }

    pub fn stacking(&self) -> &StackingOrder {
        &self.stacking
    }

    // ===== GEOMETRY =====

    pub fn update_modal_transform(&self, id: WindowId, position: Position) -> bool {
        self.update_handle(id, |handle| handle.position = position)
    }

    pub fn update_modal_size(&self, id: WindowId, size: WindowSize) -> bool {
        self.update_handle(id, |handle| handle.size = size)
    }

    /// Drag and resize gestures raise the window they start on.
    pub fn begin_interaction(&self, id: WindowId) {
        self.activate(id);
    }

    /// Live drag step: the whole window stays inside the drag container.
    pub fn drag_to(
        &self,
        id: WindowId,
        pointer: Position,
        drag_offset: Position,
        rendered: Extent,
        container: Extent,
    ) -> Option<Position> {
        let wanted = geometry::drag_to(pointer, drag_offset);
        let position = geometry::clamp_to_drag_container(wanted, rendered, container);
        self.update_modal_transform(id, position).then_some(position)
    }

    pub fn resize_to(&self, id: WindowId, pointer_delta: Position, origin: ResizeOrigin) -> Option<Extent> {
        let min_size = Extent::new(self.settings.min_width, self.settings.min_height);
        let size = geometry::resize_to(pointer_delta, origin, min_size);
        self.update_modal_size(id, size.into()).then_some(size)
    }

    /// Pulls one window back into reach, e.g. right after it mounted with an
    /// out-of-range initial position.
    pub fn reconcile_window(&self, id: WindowId, rendered: Extent, container: Extent) -> Option<Position> {
        let handle = self.get(id)?;
        let position = geometry::reconcile_on_container_resize(
            handle.position,
            rendered,
            container,
            self.settings.min_visible_px,
        )?;
        self.update_modal_transform(id, position);
        Some(position)
    }

    /// Re-asserts bounds for every window after the container changed size.
    /// Auto-height windows are assumed to be `min_height` tall.
    pub fn reconcile_all(&self, container: Extent) -> usize {
        let min_visible_px = self.settings.min_visible_px;
        let min_height = self.settings.min_height;
        let mut windows = self.windows.lock_mut();
        let mut moved = 0;
        for handle in windows.values_mut() {
            let rendered = handle.size.extent_or(min_height);
            if let Some(position) =
                geometry::reconcile_on_container_resize(handle.position, rendered, container, min_visible_px)
            {
                handle.position = position;
                moved += 1;
            }
        }
        moved
    }

    // ===== NAME & STALENESS =====

    pub fn update_modal_name(&self, id: WindowId, name: impl Into<String>) -> bool {
        let name = name.into();
        self.update_handle(id, |handle| handle.display_name = name)
    }

    /// Flags windows showing `asset_id` that have no mounted editor; mounted
    /// editors keep their own flag in sync. Returns how many were flagged.
    pub fn mark_asset_stale(&self, asset_id: &AssetId) -> usize {
        let with_editor: Vec<WindowId> = self
            .editors()
            .iter()
            .filter(|(_, editor)| editor.is_mounted())
            .map(|(id, _)| *id)
            .collect();
        let mut windows = self.windows.lock_mut();
        let mut marked = 0;
        for handle in windows.values_mut() {
            if handle.asset_id.as_ref() == Some(asset_id) && !with_editor.contains(&handle.id) {
                handle.is_stale = true;
                marked += 1;
            }
        }
        marked
    }

    pub fn mark_window_stale(&self, id: WindowId) -> bool {
        self.update_handle(id, |handle| handle.is_stale = true)
    }

    pub fn clear_stale_flag(&self, id: WindowId) -> bool {
        self.update_handle(id, |handle| handle.is_stale = false)
    }

    // ===== QUERIES =====

    pub fn get(&self, id: WindowId) -> Option<WindowHandle> {
        self.windows.lock_ref().get(&id).cloned()
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.lock_ref().contains_key(&id)
    }

    pub fn find_by_asset(&self, asset_type: AssetType, asset_id: &AssetId) -> Option<WindowId> {
        self.windows
            .lock_ref()
            .values()
            .find(|handle| handle.shows(asset_type, asset_id))
            .map(|handle| handle.id)
    }

    /// In opening order.
    pub fn handles(&self) -> Vec<WindowHandle> {
        self.windows.lock_ref().values().cloned().collect()
    }

    pub fn handles_by_type(&self, asset_type: AssetType) -> Vec<WindowHandle> {
        self.windows
            .lock_ref()
            .values()
            .filter(|handle| handle.asset_type == asset_type)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.windows.lock_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn windows_signal(&self) -> impl Signal<Item = Vec<WindowHandle>> + use<> {
        self.windows
            .signal_ref(|windows| windows.values().cloned().collect::<Vec<_>>())
            .dedupe_cloned()
    }

    pub fn open_count_signal(&self) -> impl Signal<Item = usize> + use<> {
        self.windows.signal_ref(IndexMap::len).dedupe()
    }

    // ===== LAYOUT =====

    /// Placement of every window bound to a saved asset, bottom to top.
    pub fn layout_snapshot(&self) -> Vec<WindowLayout> {
        let windows = self.windows.lock_ref();
        self.stacking
            .order()
            .into_iter()
            .filter_map(|id| windows.get(&id))
            .filter_map(WindowHandle::layout)
            .collect()
    }

    /// Reopens windows from a snapshot; the last entry ends up on top.
    pub fn restore_layout(&self, layout: &[WindowLayout]) -> Vec<WindowId> {
        layout
            .iter()
            .map(|entry| {
                let id = self.open_modal_at(
                    entry.asset_type,
                    Some(entry.asset_id.clone()),
                    entry.display_name.clone(),
                    entry.position,
                    entry.size,
                );
                if entry.is_minimized {
                    self.minimize_modal(id);
                }
                id
            })
            .collect()
    }

    // ===== INTERNALS =====

    fn editors(&self) -> MutexGuard<'_, IndexMap<WindowId, AssetEditor>> {
        self.editors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_handle(&self, id: WindowId, update: impl FnOnce(&mut WindowHandle)) -> bool {
        let mut windows = self.windows.lock_mut();
        match windows.get_mut(&id) {
            Some(handle) => {
                update(handle);
                true
            }
            None => false,
        }
    }

    fn ids_of_type(&self, asset_type: AssetType) -> Vec<WindowId> {
        self.windows
            .lock_ref()
            .values()
            .filter(|handle| handle.asset_type == asset_type)
            .map(|handle| handle.id)
            .collect()
    }
}

impl fmt::Debug for OpenWindows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWindows")
            .field("windows", &self.len())
            .field("stacking", &self.stacking)
            .finish_non_exhaustive()
    }
}
