//! Per-window editing state and its synchronous transitions.
//!
//! Nothing here awaits. [`super::AssetEditor`] applies these transitions under
//! one lock and does the I/O in between.

use shared::{AssetForm, AssetType};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Initial fetch has not completed (or failed and may be retried)
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    View,
    Edit,
}

/// Why a save is not possible right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveBlocker {
    NotReady,
    Invalid,
    Clean,
    Saving,
    Resetting,
}

impl fmt::Display for SaveBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SaveBlocker::NotReady => "asset is still loading",
            SaveBlocker::Invalid => "name is required",
            SaveBlocker::Clean => "nothing changed",
            SaveBlocker::Saving => "a save is already in flight",
            SaveBlocker::Resetting => "the form is being reset",
        };
        f.write_str(reason)
    }
}

/// What an external change notification should lead to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalChange {
    /// The user has local edits; they are kept and the window shows a warning.
    MarkedStale,
    /// Clean form; refetch after the debounce.
    ScheduleResync,
    Ignored,
}

/// Result of applying a background refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncOutcome {
    Applied,
    /// The user started editing while the fetch was in flight.
    MarkedStale,
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditState {
    pub asset_type: AssetType,
    pub phase: LoadPhase,
    /// Last server-confirmed content; `None` for drafts
    pub server_snapshot: Option<AssetForm>,
    pub form_data: AssetForm,
    /// Sticky until the next server sync
    pub user_has_edited: bool,
    pub is_stale: bool,
    pub is_resetting: bool,
    pub is_saving: bool,
    pub mode: EditorMode,
    pub last_error: Option<String>,
}

impl EditState {
    /// State for a saved asset whose content is still being fetched.
    pub fn loading(asset_type: AssetType) -> Self {
        Self {
            asset_type,
            phase: LoadPhase::Loading,
            server_snapshot: None,
            form_data: AssetForm::defaults(asset_type),
            user_has_edited: false,
            is_stale: false,
            is_resetting: false,
            is_saving: false,
            mode: EditorMode::View,
            last_error: None,
        }
    }

    /// State for a record that does not exist on the server yet.
    pub fn draft(asset_type: AssetType) -> Self {
        Self {
            phase: LoadPhase::Ready,
            mode: EditorMode::Edit,
            ..Self::loading(asset_type)
        }
    }

    pub fn is_draft(&self) -> bool {
        self.phase == LoadPhase::Ready && self.server_snapshot.is_none()
    }

    /// Structural difference between the form and its baseline: the server
    /// snapshot, or the type's defaults for a draft.
    pub fn is_dirty(&self) -> bool {
        match &self.server_snapshot {
            Some(snapshot) => &self.form_data != snapshot,
            None => self.form_data != AssetForm::defaults(self.asset_type),
        }
    }

    pub fn save_blocker(&self) -> Option<SaveBlocker> {
        if self.phase != LoadPhase::Ready {
            Some(SaveBlocker::NotReady)
        } else if self.is_saving {
            Some(SaveBlocker::Saving)
        } else if self.is_resetting {
            Some(SaveBlocker::Resetting)
        } else if !self.form_data.is_valid() {
            Some(SaveBlocker::Invalid)
        } else if !self.is_dirty() {
            Some(SaveBlocker::Clean)
        } else {
            None
        }
    }

    pub fn can_save(&self) -> bool {
        self.save_blocker().is_none()
    }

    /// Saving over (or discarding) a form that is both dirty and stale needs
    /// a deliberate hold-to-confirm.
    pub fn needs_confirmation(&self) -> bool {
        self.is_stale && self.is_dirty()
    }

    /// Applies a user edit. Refused while loading, saving or resetting.
    pub fn apply_edit(&mut self, edit: impl FnOnce(&mut AssetForm)) -> bool {
        if self.phase != LoadPhase::Ready || self.is_saving || self.is_resetting {
            return false;
        }
        edit(&mut self.form_data);
        self.user_has_edited = true;
        self.mode = EditorMode::Edit;
        true
    }

    /// Replaces snapshot and form with server content; the form becomes clean.
    pub fn apply_server_form(&mut self, form: AssetForm) {
        self.server_snapshot = Some(form.clone());
        self.form_data = form;
        self.phase = LoadPhase::Ready;
        self.user_has_edited = false;
        self.is_stale = false;
        self.last_error = None;
    }

    /// Draft reset: back to the type's defaults.
    pub fn reset_draft(&mut self) {
        self.form_data = AssetForm::defaults(self.asset_type);
        self.user_has_edited = false;
        self.is_stale = false;
        self.last_error = None;
    }

    pub fn on_external_change(&mut self) -> ExternalChange {
        if self.user_has_edited {
            self.is_stale = true;
            ExternalChange::MarkedStale
        } else if self.phase != LoadPhase::Ready || self.is_resetting {
            ExternalChange::Ignored
        } else {
            ExternalChange::ScheduleResync
        }
    }

    /// Whether a debounced resync should still fetch when its timer fires.
    pub fn wants_resync(&self) -> bool {
        self.phase == LoadPhase::Ready && !self.user_has_edited && !self.is_resetting && !self.is_saving
    }

    /// Applies the result of a background fetch, unless the situation changed
    /// while it was in flight.
    pub fn apply_resync(&mut self, form: AssetForm) -> ResyncOutcome {
        if self.is_resetting || self.is_saving {
            ResyncOutcome::Skipped
        } else if self.user_has_edited {
            self.is_stale = true;
            ResyncOutcome::MarkedStale
        } else {
            self.apply_server_form(form);
            ResyncOutcome::Applied
        }
    }

    /// Enters the saving phase and returns the form to send.
    pub fn begin_save(&mut self) -> Result<AssetForm, SaveBlocker> {
        if let Some(blocker) = self.save_blocker() {
            return Err(blocker);
        }
        self.is_saving = true;
        self.is_resetting = true;
        self.last_error = None;
        Ok(self.form_data.clone())
    }

    /// Leaves the saving phase; the form is untouched so edits survive.
    pub fn fail_save(&mut self, error: String) {
        self.is_saving = false;
        self.is_resetting = false;
        self.last_error = Some(error);
    }

    pub fn finish_save(&mut self, form: AssetForm) {
        self.apply_server_form(form);
        self.is_saving = false;
        self.is_resetting = false;
    }

    pub fn status(&self) -> EditorStatus {
        EditorStatus {
            phase: self.phase,
            mode: self.mode,
            is_dirty: self.is_dirty(),
            is_stale: self.is_stale,
            is_saving: self.is_saving,
            is_resetting: self.is_resetting,
            can_save: self.can_save(),
            needs_confirmation: self.needs_confirmation(),
        }
    }
}

/// Flags an editor toolbar renders from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorStatus {
    pub phase: LoadPhase,
    pub mode: EditorMode,
    pub is_dirty: bool,
    pub is_stale: bool,
    pub is_saving: bool,
    pub is_resetting: bool,
    pub can_save: bool,
    pub needs_confirmation: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bob() -> AssetForm {
        let mut form = AssetForm::defaults(AssetType::Npc);
        form.set_name("Bob");
        form
    }

    fn ready_bob() -> EditState {
        let mut state = EditState::loading(AssetType::Npc);
        state.apply_server_form(bob());
        state
    }

    #[test]
    fn dirty_is_a_pure_comparison() {
        let mut state = ready_bob();
        assert!(!state.is_dirty());

        state.apply_edit(|form| form.set_name("Bobby"));
        assert!(state.is_dirty());
        assert!(state.user_has_edited);

        state.apply_edit(|form| form.set_name("Bob"));
        assert!(!state.is_dirty());
        assert!(state.user_has_edited);
    }

    #[test]
    fn draft_compares_against_defaults() {
        let mut state = EditState::draft(AssetType::Location);
        assert!(state.is_draft());
        assert!(!state.is_dirty());
        assert_eq!(state.mode, EditorMode::Edit);
        assert_eq!(state.save_blocker(), Some(SaveBlocker::Clean));

        state.apply_edit(|form| form.set_name("Harbor"));
        assert!(state.is_dirty());
        assert!(state.can_save());
    }

    #[test]
    fn save_gate_reports_the_first_blocker() {
        let loading = EditState::loading(AssetType::Npc);
        assert_eq!(loading.save_blocker(), Some(SaveBlocker::NotReady));

        let mut state = ready_bob();
        assert_eq!(state.save_blocker(), Some(SaveBlocker::Clean));

        state.apply_edit(|form| form.set_name("   "));
        assert_eq!(state.save_blocker(), Some(SaveBlocker::Invalid));

        state.apply_edit(|form| form.set_name("Bobby"));
        assert_eq!(state.save_blocker(), None);

        state.is_resetting = true;
        assert_eq!(state.save_blocker(), Some(SaveBlocker::Resetting));
        state.is_saving = true;
        assert_eq!(state.save_blocker(), Some(SaveBlocker::Saving));
    }

    #[test]
    fn edits_are_refused_while_busy() {
        let mut state = ready_bob();
        assert!(state.apply_edit(|form| form.set_name("Bobby")));
        let form = state.begin_save();
        assert_eq!(form.as_ref().map(AssetForm::name), Ok("Bobby"));
        assert!(!state.apply_edit(|form| form.set_name("Late")));
        assert_eq!(state.form_data.name(), "Bobby");
        assert_eq!(state.begin_save(), Err(SaveBlocker::Saving));

        let mut loading = EditState::loading(AssetType::Npc);
        assert!(!loading.apply_edit(|form| form.set_name("Early")));
        assert!(!loading.user_has_edited);
    }

    #[test]
    fn external_change_depends_on_local_edits() {
        let mut clean = ready_bob();
        assert_eq!(clean.on_external_change(), ExternalChange::ScheduleResync);
        assert!(!clean.is_stale);

        let mut edited = ready_bob();
        edited.apply_edit(|form| form.set_name("Bobby"));
        assert_eq!(edited.on_external_change(), ExternalChange::MarkedStale);
        assert!(edited.is_stale);
        assert_eq!(edited.form_data.name(), "Bobby");

        let mut resetting = ready_bob();
        resetting.is_resetting = true;
        assert_eq!(resetting.on_external_change(), ExternalChange::Ignored);
    }

    #[test]
    fn resync_that_lost_the_race_marks_stale() {
        let mut state = ready_bob();
        assert!(state.wants_resync());
        state.apply_edit(|form| form.set_name("Bobby"));
        assert!(!state.wants_resync());

        let mut remote = bob();
        remote.set_name("Robert");
        assert_eq!(state.apply_resync(remote.clone()), ResyncOutcome::MarkedStale);
        assert_eq!(state.form_data.name(), "Bobby");
        assert!(state.needs_confirmation());

        let mut clean = ready_bob();
        assert_eq!(clean.apply_resync(remote), ResyncOutcome::Applied);
        assert_eq!(clean.form_data.name(), "Robert");
        assert!(!clean.is_dirty());
    }

    #[test]
    fn resync_landing_during_save_is_skipped() {
        let mut state = ready_bob();
        state.apply_edit(|form| form.set_name("Bobby"));
        let _ = state.begin_save();

        let mut remote = bob();
        remote.set_name("Robert");
        assert_eq!(state.apply_resync(remote.clone()), ResyncOutcome::Skipped);
        assert_eq!(state.form_data.name(), "Bobby");
        assert!(!state.is_stale);

        let mut reloading = ready_bob();
        reloading.is_resetting = true;
        assert_eq!(reloading.apply_resync(remote), ResyncOutcome::Skipped);
        assert_eq!(reloading.form_data.name(), "Bob");
    }

    #[test]
    fn failed_save_keeps_the_form() {
        let mut state = ready_bob();
        state.apply_edit(|form| form.set_name("Bobby"));
        let _ = state.begin_save();
        state.fail_save("network error: offline".to_string());

        assert!(!state.is_saving);
        assert!(!state.is_resetting);
        assert!(state.is_dirty());
        assert_eq!(state.form_data.name(), "Bobby");
        assert_eq!(state.last_error.as_deref(), Some("network error: offline"));
    }

    #[test]
    fn finished_save_clears_every_flag() {
        let mut state = ready_bob();
        state.apply_edit(|form| form.set_name("Bobby"));
        state.on_external_change();
        let form = state.begin_save().unwrap();
        state.finish_save(form);

        let status = state.status();
        assert!(!status.is_dirty);
        assert!(!status.is_stale);
        assert!(!status.is_saving);
        assert!(!status.is_resetting);
        assert!(!state.user_has_edited);
        assert_eq!(state.server_snapshot.as_ref().map(AssetForm::name), Some("Bobby"));
    }
}
