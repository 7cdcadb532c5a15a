//! Editing state behind one asset window.
//!
//! An [`AssetEditor`] owns the working copy for exactly one window. It keeps
//! the form aligned with the server without ever discarding local edits
//! silently:
//!
//! - a clean form follows external changes through a debounced refetch
//! - an edited form is only flagged stale and keeps its content
//! - reload, save and revert hold the `is_resetting` flag so a notification
//!   arriving in the middle cannot trigger a competing refetch
//!
//! State lives in one [`Mutable`]. Every transition is applied under a single
//! lock and no lock is held across an await; after each await the state is
//! re-checked, and nothing is applied once the editor is unmounted.

pub mod state;

pub use state::{EditState, EditorMode, EditorStatus, ExternalChange, LoadPhase, ResyncOutcome, SaveBlocker};

use crate::notices::{Notice, Notices};
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::staleness::{StalenessChannel, Subscription};
use crate::store::{AssetStore, StoreError};
use crate::telemetry::Telemetry;
use crate::windows::{OpenWindows, WindowId};
use shared::{AssetForm, AssetId, AssetInput, AssetRecord, AssetType, AssetVersion, GameId, VersionId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use zoon::{Mutable, Signal, SignalExt};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditorError {
    #[error("asset is still loading")]
    NotReady,
    #[error("save not allowed: {0}")]
    SaveNotAllowed(SaveBlocker),
    #[error("another operation is in progress")]
    Busy,
    #[error("asset has not been created yet")]
    NoPersistedAsset,
    #[error("asset {0} no longer exists")]
    AssetMissing(AssetId),
    #[error("editor was unmounted")]
    Unmounted,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Updated {
        asset_id: AssetId,
    },
    /// The draft was created; its window was replaced by `window_id`
    /// (`None` if the draft window had been closed meanwhile).
    Created {
        asset_id: AssetId,
        window_id: Option<WindowId>,
    },
}

/// Collaborators shared by every editor.
#[derive(Clone)]
pub struct EditorDeps {
    pub store: Arc<dyn AssetStore>,
    pub staleness: StalenessChannel,
    pub scheduler: Scheduler,
    pub notices: Notices,
    pub telemetry: Arc<dyn Telemetry>,
    pub game_id: GameId,
    pub resync_debounce: Duration,
}

struct EditorInner {
    window_id: WindowId,
    asset_type: AssetType,
    asset_id: Option<AssetId>,
    windows: OpenWindows,
    deps: EditorDeps,
    state: Mutable<EditState>,
    mounted: AtomicBool,
    resync_task: Mutex<Option<ScheduledTask>>,
    subscription: Mutex<Option<Subscription>>,
}

#[derive(Clone)]
pub struct AssetEditor {
    inner: Arc<EditorInner>,
}

impl AssetEditor {
    /// Binds an editor to an open window and subscribes to changes of its
    /// asset. Call [`load`](Self::load) afterwards for saved assets.
    /// Reached through [`OpenWindows::mount_editor`], which keeps one editor
    /// per window.
    pub(crate) fn mount(windows: OpenWindows, window_id: WindowId, deps: EditorDeps) -> Option<Self> {
        let handle = windows.get(window_id)?;
        let state = match handle.asset_id {
            Some(_) => EditState::loading(handle.asset_type),
            None => EditState::draft(handle.asset_type),
        };
        let inner = Arc::new(EditorInner {
            window_id,
            asset_type: handle.asset_type,
            asset_id: handle.asset_id.clone(),
            windows,
            deps,
            state: Mutable::new(state),
            mounted: AtomicBool::new(true),
            resync_task: Mutex::new(None),
            subscription: Mutex::new(None),
        });

        if let Some(asset_id) = handle.asset_id {
            let weak = Arc::downgrade(&inner);
            let subscription = inner.deps.staleness.subscribe(asset_id, move |_| {
                if let Some(editor) = Self::upgrade(&weak) {
                    editor.on_external_change();
                }
            });
            *lock(&inner.subscription) = Some(subscription);
        }

        log::debug!("editor: mounted on {window_id}");
        Some(Self { inner })
    }

    fn upgrade(weak: &Weak<EditorInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Stops reacting to notifications and cancels a pending resync.
    /// Results of requests still in flight are dropped.
    pub fn unmount(&self) {
        if self.inner.mounted.swap(false, Ordering::SeqCst) {
            lock(&self.inner.resync_task).take();
            lock(&self.inner.subscription).take();
            log::debug!("editor: unmounted from {}", self.inner.window_id);
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    // ===== LOADING =====

    /// Initial fetch. A failure leaves the editor loading so it can be retried.
    pub async fn load(&self) -> Result<(), EditorError> {
        self.ensure_mounted()?;
        let Some(asset_id) = self.inner.asset_id.clone() else {
            return Ok(());
        };
        if self.with_state(|state| state.phase == LoadPhase::Ready) {
            return Ok(());
        }

        let fetched = self.inner.deps.store.fetch_asset(&asset_id).await;
        self.ensure_mounted()?;
        match fetched {
            Ok(Some(record)) => {
                let loaded = self.with_state(|state| {
                    let fresh = state.phase == LoadPhase::Loading;
                    if fresh {
                        state.apply_server_form(AssetForm::from_record(&record));
                    }
                    fresh
                });
                if loaded {
                    self.inner.windows.clear_stale_flag(self.inner.window_id);
                    self.sync_window_name(&record);
                    self.event("asset_loaded");
                }
                Ok(())
            }
            Ok(None) => {
                let error = EditorError::AssetMissing(asset_id);
                self.report_load_failure(&error);
                Err(error)
            }
            Err(error) => {
                let error = EditorError::Store(error);
                self.report_load_failure(&error);
                Err(error)
            }
        }
    }

    /// Discards local edits and refetches. Drafts go back to their defaults.
    pub async fn reload(&self) -> Result<(), EditorError> {
        self.ensure_mounted()?;
        self.with_state(|state| {
            if state.phase != LoadPhase::Ready {
                Err(EditorError::NotReady)
            } else if state.is_saving || state.is_resetting {
                Err(EditorError::Busy)
            } else {
                Ok(())
            }
        })?;
        let Some(asset_id) = self.inner.asset_id.clone() else {
            self.with_state(EditState::reset_draft);
            return Ok(());
        };

        self.with_state(|state| state.is_resetting = true);
        self.cancel_pending_resync();

        let fetched = self.inner.deps.store.fetch_asset(&asset_id).await;
        self.ensure_mounted()?;
        match fetched {
            Ok(Some(record)) => {
                self.with_state(|state| {
                    state.apply_server_form(AssetForm::from_record(&record));
                    state.is_resetting = false;
                });
                self.inner.windows.clear_stale_flag(self.inner.window_id);
                self.sync_window_name(&record);
                self.event("asset_reloaded");
                Ok(())
            }
            Ok(None) => {
                let error = EditorError::AssetMissing(asset_id);
                self.with_state(|state| {
                    state.is_resetting = false;
                    state.last_error = Some(error.to_string());
                });
                self.notify_failure(Notice::load_failed, &error);
                Err(error)
            }
            Err(error) => {
                let error = EditorError::Store(error);
                self.with_state(|state| {
                    state.is_resetting = false;
                    state.last_error = Some(error.to_string());
                });
                self.notify_failure(Notice::load_failed, &error);
                Err(error)
            }
        }
    }

    /// Reload, then back to view mode. A failed reload keeps the edit mode so
    /// the retained edits stay visible.
    pub async fn cancel(&self) -> Result<(), EditorError> {
        self.reload().await?;
        self.with_state(|state| state.mode = EditorMode::View);
        Ok(())
    }

    // ===== EDITING =====

    /// Applies a user edit to the form. Returns `false` when edits are
    /// currently refused (loading, saving, resetting or unmounted).
    pub fn edit(&self, edit: impl FnOnce(&mut AssetForm)) -> bool {
        self.is_mounted() && self.with_state(|state| state.apply_edit(edit))
    }

    pub fn set_name(&self, name: impl Into<String>) -> bool {
        let name = name.into();
        self.edit(|form| form.set_name(name))
    }

    pub fn begin_editing(&self) {
        self.with_state(|state| state.mode = EditorMode::Edit);
    }

    // ===== SAVING =====

    /// Persists the form. Updates a saved asset in place; creates a draft and
    /// moves it into a window bound to the new asset, unmounting this editor.
    pub async fn save(&self) -> Result<SaveOutcome, EditorError> {
        self.ensure_mounted()?;
        let form = self
            .with_state(EditState::begin_save)
            .map_err(EditorError::SaveNotAllowed)?;
        self.cancel_pending_resync();

        let input = AssetInput {
            game_id: self.inner.deps.game_id.clone(),
            details: form.to_details(),
        };
        match self.inner.asset_id.clone() {
            Some(asset_id) => self.save_existing(asset_id, input).await,
            None => self.save_draft(input).await,
        }
    }

    async fn save_existing(&self, asset_id: AssetId, input: AssetInput) -> Result<SaveOutcome, EditorError> {
        let updated = match self.inner.deps.store.update_asset(&asset_id, input).await {
            Ok(record) => record,
            Err(error) => return Err(self.fail_save(error)),
        };

        // The post-save read is authoritative; fall back to the update response.
        let record = match self.inner.deps.store.fetch_asset(&asset_id).await {
            Ok(Some(record)) => record,
            Ok(None) => updated,
            Err(error) => {
                log::warn!("editor: post-save fetch of {asset_id} failed: {error}");
                updated
            }
        };
        if !self.is_mounted() {
            return Ok(SaveOutcome::Updated { asset_id });
        }

        self.with_state(|state| state.finish_save(AssetForm::from_record(&record)));
        self.inner.windows.clear_stale_flag(self.inner.window_id);
        self.sync_window_name(&record);
        self.inner
            .deps
            .notices
            .push(Notice::saved(self.inner.asset_type, record.name()));
        self.event("asset_saved");
        Ok(SaveOutcome::Updated { asset_id })
    }

    async fn save_draft(&self, input: AssetInput) -> Result<SaveOutcome, EditorError> {
        let record = match self.inner.deps.store.create_asset(input).await {
            Ok(record) => record,
            Err(error) => return Err(self.fail_save(error)),
        };

        self.with_state(|state| state.finish_save(AssetForm::from_record(&record)));
        let window_id = if self.is_mounted() {
            self.inner
                .windows
                .transplant(self.inner.window_id, record.id.clone(), record.name())
        } else {
            None
        };
        self.unmount();
        self.inner
            .deps
            .notices
            .push(Notice::saved(self.inner.asset_type, record.name()));
        self.event("asset_created");
        Ok(SaveOutcome::Created {
            asset_id: record.id,
            window_id,
        })
    }

    fn fail_save(&self, error: StoreError) -> EditorError {
        self.with_state(|state| state.fail_save(error.to_string()));
        let name = self.current_name();
        self.inner
            .deps
            .notices
            .push(Notice::save_failed(self.inner.asset_type, &name, &error.to_string()));
        self.inner.deps.telemetry.log_event(
            "asset_save_failed",
            &[
                ("asset_type", self.inner.asset_type.label().to_string()),
                ("error", error.to_string()),
            ],
        );
        EditorError::Store(error)
    }

    // ===== DELETE & HISTORY =====

    /// Deletes the asset and closes its window. A draft is simply closed.
    pub async fn delete(&self) -> Result<(), EditorError> {
        self.ensure_mounted()?;
        let Some(asset_id) = self.inner.asset_id.clone() else {
            self.unmount();
            self.inner.windows.close_modal(self.inner.window_id);
            return Ok(());
        };
        self.enter_busy()?;

        match self.inner.deps.store.delete_asset(&asset_id).await {
            Ok(()) => {
                self.unmount();
                self.inner.windows.close_modal(self.inner.window_id);
                self.event("asset_deleted");
                Ok(())
            }
            Err(error) => {
                self.with_state(|state| state.is_saving = false);
                let error = EditorError::Store(error);
                self.notify_failure(Notice::delete_failed, &error);
                Err(error)
            }
        }
    }

    pub async fn list_versions(&self) -> Result<Vec<AssetVersion>, EditorError> {
        let asset_id = self.inner.asset_id.clone().ok_or(EditorError::NoPersistedAsset)?;
        match self.inner.deps.store.list_versions(&asset_id).await {
            Ok(versions) => Ok(versions),
            Err(error) => {
                let error = EditorError::Store(error);
                self.notify_failure(Notice::versions_failed, &error);
                Err(error)
            }
        }
    }

    /// Restores an earlier version on the server, then reloads.
    pub async fn revert_to_version(&self, version_id: &VersionId) -> Result<(), EditorError> {
        self.ensure_mounted()?;
        let asset_id = self.inner.asset_id.clone().ok_or(EditorError::NoPersistedAsset)?;
        self.enter_busy()?;
        self.cancel_pending_resync();

        let reverted = self.inner.deps.store.revert_asset(&asset_id, version_id).await;
        self.with_state(|state| state.is_saving = false);
        match reverted {
            Ok(_) => {
                self.inner.deps.telemetry.log_event(
                    "asset_reverted",
                    &[
                        ("asset_type", self.inner.asset_type.label().to_string()),
                        ("version_id", version_id.to_string()),
                    ],
                );
                self.reload().await
            }
            Err(error) => {
                let error = EditorError::Store(error);
                self.notify_failure(Notice::revert_failed, &error);
                Err(error)
            }
        }
    }

    // ===== STALENESS =====

    fn on_external_change(&self) {
        if !self.is_mounted() {
            return;
        }
        match self.with_state(EditState::on_external_change) {
            ExternalChange::MarkedStale => {
                self.inner.windows.mark_window_stale(self.inner.window_id);
                self.event("asset_marked_stale");
            }
            ExternalChange::ScheduleResync => self.schedule_resync(),
            ExternalChange::Ignored => {
                log::debug!("editor: change notification ignored on {}", self.inner.window_id);
            }
        }
    }

    /// (Re)starts the debounce; only the last notification of a burst fetches.
    fn schedule_resync(&self) {
        let weak = Arc::downgrade(&self.inner);
        let task = self
            .inner
            .deps
            .scheduler
            .schedule_after(self.inner.deps.resync_debounce, async move {
                if let Some(editor) = Self::upgrade(&weak) {
                    editor.silent_resync().await;
                }
            });
        *lock(&self.inner.resync_task) = Some(task);
    }

    fn cancel_pending_resync(&self) {
        lock(&self.inner.resync_task).take();
    }

    async fn silent_resync(&self) {
        let Some(asset_id) = self.inner.asset_id.clone() else {
            return;
        };
        if !self.is_mounted() || !self.with_state(|state| state.wants_resync()) {
            return;
        }

        match self.inner.deps.store.fetch_asset(&asset_id).await {
            Ok(Some(record)) => {
                if !self.is_mounted() {
                    return;
                }
                match self.with_state(|state| state.apply_resync(AssetForm::from_record(&record))) {
                    ResyncOutcome::Applied => {
                        self.sync_window_name(&record);
                        self.event("asset_silently_resynced");
                    }
                    ResyncOutcome::MarkedStale => {
                        self.inner.windows.mark_window_stale(self.inner.window_id);
                        self.event("asset_marked_stale");
                    }
                    ResyncOutcome::Skipped => {}
                }
            }
            Ok(None) => log::warn!("editor: {asset_id} disappeared before resync"),
            Err(error) => log::warn!("editor: background resync of {asset_id} failed: {error}"),
        }
    }

    // ===== ACCESSORS =====

    pub fn window_id(&self) -> WindowId {
        self.inner.window_id
    }

    pub fn asset_type(&self) -> AssetType {
        self.inner.asset_type
    }

    pub fn asset_id(&self) -> Option<&AssetId> {
        self.inner.asset_id.as_ref()
    }

    pub fn snapshot(&self) -> EditState {
        self.inner.state.get_cloned()
    }

    pub fn form(&self) -> AssetForm {
        self.inner.state.lock_ref().form_data.clone()
    }

    pub fn status(&self) -> EditorStatus {
        self.inner.state.lock_ref().status()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.state.lock_ref().is_dirty()
    }

    pub fn is_stale(&self) -> bool {
        self.inner.state.lock_ref().is_stale
    }

    pub fn needs_confirmation(&self) -> bool {
        self.inner.state.lock_ref().needs_confirmation()
    }

    pub fn form_signal(&self) -> impl Signal<Item = AssetForm> + use<> {
        self.inner
            .state
            .signal_ref(|state| state.form_data.clone())
            .dedupe_cloned()
    }

    pub fn status_signal(&self) -> impl Signal<Item = EditorStatus> + use<> {
        self.inner.state.signal_ref(EditState::status).dedupe()
    }

    pub fn is_dirty_signal(&self) -> impl Signal<Item = bool> + use<> {
        self.inner.state.signal_ref(EditState::is_dirty).dedupe()
    }

    pub fn is_stale_signal(&self) -> impl Signal<Item = bool> + use<> {
        self.inner.state.signal_ref(|state| state.is_stale).dedupe()
    }

    // ===== INTERNALS =====

    fn with_state<R>(&self, update: impl FnOnce(&mut EditState) -> R) -> R {
        update(&mut self.inner.state.lock_mut())
    }

    fn ensure_mounted(&self) -> Result<(), EditorError> {
        if self.is_mounted() { Ok(()) } else { Err(EditorError::Unmounted) }
    }

    fn enter_busy(&self) -> Result<(), EditorError> {
        self.with_state(|state| {
            if state.phase != LoadPhase::Ready {
                Err(EditorError::NotReady)
            } else if state.is_saving || state.is_resetting {
                Err(EditorError::Busy)
            } else {
                state.is_saving = true;
                Ok(())
            }
        })
    }

    fn current_name(&self) -> String {
        self.inner.state.lock_ref().form_data.name().to_string()
    }

    fn sync_window_name(&self, record: &AssetRecord) {
        self.inner
            .windows
            .update_modal_name(self.inner.window_id, record.name());
    }

    fn report_load_failure(&self, error: &EditorError) {
        self.with_state(|state| state.last_error = Some(error.to_string()));
        self.notify_failure(Notice::load_failed, error);
    }

    fn notify_failure(&self, notice: fn(AssetType, &str, &str) -> Notice, error: &EditorError) {
        let name = self
            .inner
            .windows
            .get(self.inner.window_id)
            .map(|handle| handle.display_name)
            .unwrap_or_else(|| self.current_name());
        self.inner
            .deps
            .notices
            .push(notice(self.inner.asset_type, &name, &error.to_string()));
    }

    fn event(&self, name: &str) {
        let asset_id = self
            .inner
            .asset_id
            .as_ref()
            .map_or_else(|| "new".to_string(), AssetId::to_string);
        self.inner.deps.telemetry.log_event(
            name,
            &[
                ("asset_type", self.inner.asset_type.label().to_string()),
                ("asset_id", asset_id),
            ],
        );
    }
}

impl std::fmt::Debug for AssetEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetEditor")
            .field("window_id", &self.inner.window_id)
            .field("asset_id", &self.inner.asset_id)
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
