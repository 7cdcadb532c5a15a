//! Floating asset windows for the campaign desk: stacking, geometry,
//! per-window editing state and external-change reconciliation.

pub mod dataflow;
pub mod desk;
pub mod editor;
pub mod geometry;
pub mod hold_confirm;
pub mod logging;
pub mod notices;
pub mod scheduler;
pub mod stacking;
pub mod staleness;
pub mod store;
pub mod telemetry;
pub mod windows;

#[cfg(test)]
pub mod testing;

pub use desk::CampaignDesk;
pub use editor::{AssetEditor, EditorDeps, EditorError, EditorMode, EditorStatus, SaveOutcome};
pub use hold_confirm::{HoldConfirm, HoldGesture};
pub use notices::{Notice, Notices};
pub use scheduler::{Runtime, ScheduledTask, Scheduler, ZoonRuntime};
pub use stacking::StackingOrder;
pub use staleness::{StalenessChannel, Subscription};
pub use store::{AssetStore, StoreError, StoreResult};
pub use telemetry::{LogTelemetry, NoopTelemetry, Telemetry};
pub use windows::{OpenWindows, WindowHandle, WindowId};
