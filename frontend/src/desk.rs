//! Session wiring: one `CampaignDesk` per signed-in session owns the open
//! windows and the collaborators every editor shares.

use crate::dataflow::{Relay, relay};
use crate::editor::{AssetEditor, EditorDeps};
use crate::hold_confirm::HoldConfirm;
use crate::notices::Notices;
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::staleness::{StalenessChannel, forward_changes};
use crate::store::AssetStore;
use crate::telemetry::Telemetry;
use crate::windows::{OpenWindows, WindowId};
use futures::StreamExt;
use shared::{AssetId, AssetType, DeskConfig, GameId, HoldConfirmSection, LayoutSection};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub struct CampaignDesk {
    windows: OpenWindows,
    deps: EditorDeps,
    hold_confirm: HoldConfirmSection,
    change_feed: Mutex<Option<ScheduledTask>>,
}

impl CampaignDesk {
    pub fn new(
        config: &DeskConfig,
        game_id: GameId,
        store: Arc<dyn AssetStore>,
        telemetry: Arc<dyn Telemetry>,
        scheduler: Scheduler,
    ) -> Self {
        let windows = OpenWindows::new(config.windows.clone(), telemetry.clone());
        let restored = windows.restore_layout(&config.layout.windows);
        if !restored.is_empty() {
            log::debug!("desk: restored {} windows", restored.len());
        }
        let deps = EditorDeps {
            store,
            staleness: StalenessChannel::new(),
            scheduler,
            notices: Notices::new(),
            telemetry,
            game_id,
            resync_debounce: Duration::from_millis(config.staleness.debounce_ms),
        };
        Self {
            windows,
            deps,
            hold_confirm: config.hold_confirm.clone(),
            change_feed: Mutex::new(None),
        }
    }

    pub fn windows(&self) -> &OpenWindows {
        &self.windows
    }

    pub fn notices(&self) -> &Notices {
        &self.deps.notices
    }

    pub fn staleness(&self) -> &StalenessChannel {
        &self.deps.staleness
    }

    /// Current placement of the saved-asset windows, ready to be stored as
    /// the `[layout]` section.
    pub fn layout(&self) -> LayoutSection {
        LayoutSection {
            windows: self.windows.layout_snapshot(),
        }
    }

    /// Returns the relay the transport sends "asset changed" events into.
    /// Windows without a mounted editor are flagged stale directly; editors
    /// get the notification. Calling it again replaces the previous feed.
    pub fn connect_change_feed(&self) -> Relay<AssetId> {
        let (asset_changed_relay, asset_changed_stream) = relay();
        let windows = self.windows.clone();
        let changes = asset_changed_stream.map(move |asset_id| {
            windows.mark_asset_stale(&asset_id);
            asset_id
        });
        let task = self
            .deps
            .scheduler
            .spawn(forward_changes(self.deps.staleness.clone(), changes));
        *self.change_feed.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        asset_changed_relay
    }

    /// Opens (or raises) the window for an asset and mounts its editor.
    pub fn open(&self, asset_type: AssetType, asset_id: Option<AssetId>, display_name: &str) -> Option<(WindowId, AssetEditor)> {
        let window_id = self.windows.open_modal(asset_type, asset_id, display_name);
        let editor = self.windows.mount_editor(window_id, self.deps.clone())?;
        Some((window_id, editor))
    }

    pub fn mount(&self, window_id: WindowId) -> Option<AssetEditor> {
        self.windows.mount_editor(window_id, self.deps.clone())
    }

    /// Hold-to-confirm button wired to this session's scheduler and telemetry.
    pub fn hold_confirm(&self, action: &str, on_confirm: impl Fn() + Send + Sync + 'static) -> HoldConfirm {
        HoldConfirm::new(
            action,
            &self.hold_confirm,
            self.deps.scheduler.clone(),
            self.deps.telemetry.clone(),
            on_confirm,
        )
    }
}
