//! Toast notices for non-fatal failures (and the occasional success).
//!
//! Every failure that reaches the user also logs its technical text so the
//! console keeps the raw error.

use shared::AssetType;
use std::sync::atomic::{AtomicUsize, Ordering};
use zoon::{Mutable, Signal, SignalExt};

#[derive(Debug, Clone, PartialEq, Copy, Default)]
pub enum NotificationVariant {
    #[default]
    Error,
    Info,
    Success,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: String,
    pub title: String,
    pub message: String,
    /// Raw error for the console
    pub technical_error: String,
    /// 0 = stays until dismissed
    pub auto_dismiss_ms: u64,
    pub variant: NotificationVariant,
}

impl Notice {
    pub fn load_failed(asset_type: AssetType, asset_name: &str, error: &str) -> Self {
        Self {
            id: String::new(),
            title: format!("Couldn't load {}", asset_type.label()),
            message: format!("{}: {}", display_name(asset_name), make_error_user_friendly(error)),
            technical_error: format!("Loading {asset_type} '{asset_name}' failed: {error}"),
            auto_dismiss_ms: 5000,
            variant: NotificationVariant::Error,
        }
    }

    pub fn save_failed(asset_type: AssetType, asset_name: &str, error: &str) -> Self {
        Self {
            id: String::new(),
            title: format!("Couldn't save {}", asset_type.label()),
            message: format!(
                "{}: {} Your changes are still here.",
                display_name(asset_name),
                make_error_user_friendly(error)
            ),
            technical_error: format!("Saving {asset_type} '{asset_name}' failed: {error}"),
            auto_dismiss_ms: 8000,
            variant: NotificationVariant::Error,
        }
    }

    pub fn delete_failed(asset_type: AssetType, asset_name: &str, error: &str) -> Self {
        Self {
            id: String::new(),
            title: format!("Couldn't delete {}", asset_type.label()),
            message: format!("{}: {}", display_name(asset_name), make_error_user_friendly(error)),
            technical_error: format!("Deleting {asset_type} '{asset_name}' failed: {error}"),
            auto_dismiss_ms: 5000,
            variant: NotificationVariant::Error,
        }
    }

    pub fn revert_failed(asset_type: AssetType, asset_name: &str, error: &str) -> Self {
        Self {
            id: String::new(),
            title: "Couldn't restore version".to_string(),
            message: format!("{}: {}", display_name(asset_name), make_error_user_friendly(error)),
            technical_error: format!("Reverting {asset_type} '{asset_name}' failed: {error}"),
            auto_dismiss_ms: 5000,
            variant: NotificationVariant::Error,
        }
    }

    pub fn versions_failed(asset_type: AssetType, asset_name: &str, error: &str) -> Self {
        Self {
            id: String::new(),
            title: "Couldn't load history".to_string(),
            message: format!("{}: {}", display_name(asset_name), make_error_user_friendly(error)),
            technical_error: format!("Listing versions of {asset_type} '{asset_name}' failed: {error}"),
            auto_dismiss_ms: 5000,
            variant: NotificationVariant::Error,
        }
    }

    pub fn saved(asset_type: AssetType, asset_name: &str) -> Self {
        Self {
            id: String::new(),
            title: format!("{} saved", asset_type.label()),
            message: display_name(asset_name).to_string(),
            technical_error: format!("Saved {asset_type} '{asset_name}'"),
            auto_dismiss_ms: 3000,
            variant: NotificationVariant::Success,
        }
    }
}

fn display_name(asset_name: &str) -> &str {
    let trimmed = asset_name.trim();
    if trimmed.is_empty() { "Untitled" } else { trimmed }
}

pub fn make_error_user_friendly(error: &str) -> String {
    let error_lower = error.to_lowercase();

    if error_lower.contains("not found") {
        "It no longer exists. It may have been deleted in another session.".to_string()
    } else if error_lower.contains("permission denied")
        || error_lower.contains("unauthorized")
        || error_lower.contains("forbidden")
    {
        "You don't have permission to do that.".to_string()
    } else if error_lower.contains("timeout") || error_lower.contains("timed out") {
        "Operation timed out. Please try again.".to_string()
    } else if error_lower.contains("connection") || error_lower.contains("network") {
        "Connection error. Please check your network connection.".to_string()
    } else if error_lower.contains("validation") {
        match error.split_once(':') {
            Some((_, detail)) if !detail.trim().is_empty() => format!("Invalid input: {}", detail.trim()),
            _ => "Invalid input.".to_string(),
        }
    } else {
        error.trim().to_string()
    }
}

static NOTICE_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Active toasts, oldest first.
#[derive(Clone, Debug, Default)]
pub struct Notices {
    active: Mutable<Vec<Notice>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs the technical error, assigns an id and shows the notice.
    pub fn push(&self, mut notice: Notice) -> String {
        match notice.variant {
            NotificationVariant::Error => log::error!("{}", notice.technical_error),
            NotificationVariant::Info | NotificationVariant::Success => {
                log::info!("{}", notice.technical_error)
            }
        }
        let notice_id = NOTICE_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        notice.id = format!("toast_{notice_id}");
        let id = notice.id.clone();
        self.active.lock_mut().push(notice);
        id
    }

    pub fn dismiss(&self, id: &str) {
        self.active.lock_mut().retain(|notice| notice.id != id);
    }

    pub fn current(&self) -> Vec<Notice> {
        self.active.get_cloned()
    }

    pub fn notices_signal(&self) -> impl Signal<Item = Vec<Notice>> + use<> {
        self.active.signal_cloned().dedupe_cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendly_messages_for_common_failures() {
        assert_eq!(
            make_error_user_friendly("network error: connection reset"),
            "Connection error. Please check your network connection."
        );
        assert_eq!(
            make_error_user_friendly("request timed out after 30s"),
            "Operation timed out. Please try again."
        );
        assert_eq!(
            make_error_user_friendly("validation failed: name is required"),
            "Invalid input: name is required"
        );
        assert_eq!(make_error_user_friendly("  something odd  "), "something odd");
    }

    #[test]
    fn push_assigns_ids_and_dismiss_removes() {
        let notices = Notices::new();
        let first = notices.push(Notice::save_failed(AssetType::Npc, "Bob", "network error: down"));
        let second = notices.push(Notice::saved(AssetType::Plot, ""));
        assert_ne!(first, second);
        assert_eq!(notices.current().len(), 2);
        assert_eq!(notices.current()[1].message, "Untitled");

        notices.dismiss(&first);
        let remaining = notices.current();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second);
        assert_eq!(remaining[0].variant, NotificationVariant::Success);
    }

    #[test]
    fn save_failure_tells_the_user_edits_are_kept() {
        let notice = Notice::save_failed(AssetType::Location, "Harbor", "request rejected: conflict");
        assert_eq!(notice.title, "Couldn't save Location");
        assert!(notice.message.starts_with("Harbor: request rejected: conflict"));
        assert!(notice.message.ends_with("Your changes are still here."));
    }
}
