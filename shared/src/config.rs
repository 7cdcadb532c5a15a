use crate::WindowLayout;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("unsupported config version '{0}'")]
    UnsupportedVersion(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DeskConfig {
    pub app: AppSection,
    pub windows: WindowsSection,
    pub staleness: StalenessSection,
    pub hold_confirm: HoldConfirmSection,
    pub layout: LayoutSection,
}

impl DeskConfig {
    /// Parses a (possibly partial) TOML document. Missing sections fall back to defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: DeskConfig = toml::from_str(text)?;
        if config.app.migration_strategy() == MigrationStrategy::Recreate {
            return Err(ConfigError::UnsupportedVersion(config.app.version));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let windows = &self.windows;
        if windows.min_visible_px <= 0.0 {
            return Err(ConfigError::Invalid("windows.min_visible_px must be positive".into()));
        }
        if windows.min_width <= 0.0 || windows.min_height <= 0.0 {
            return Err(ConfigError::Invalid("windows.min_width and windows.min_height must be positive".into()));
        }
        if windows.default_width < windows.min_width {
            return Err(ConfigError::Invalid("windows.default_width is below windows.min_width".into()));
        }
        if windows.cascade_steps == 0 {
            return Err(ConfigError::Invalid("windows.cascade_steps must be at least 1".into()));
        }
        let hold = &self.hold_confirm;
        if hold.frame_ms == 0 || hold.frame_ms > hold.duration_ms {
            return Err(ConfigError::Invalid("hold_confirm.frame_ms must be in 1..=duration_ms".into()));
        }
        Ok(())
    }
}

// AppSection carries the config format version so stored desks can be migrated
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AppSection {
    pub version: String,
}

impl AppSection {
    pub const CURRENT_VERSION: &'static str = "1.0.0";

    pub fn needs_migration(&self) -> bool {
        self.version != Self::CURRENT_VERSION
    }

    pub fn migration_strategy(&self) -> MigrationStrategy {
        match self.version.as_str() {
            "1.0.0" => MigrationStrategy::None,
            // "0.9.0" => MigrationStrategy::Upgrade("0.9.0 -> 1.0.0".into()),
            _ => MigrationStrategy::Recreate,
        }
    }
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MigrationStrategy {
    None,
    Upgrade(String),
    Recreate,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WindowsSection {
    /// z-index of the bottom-most window
    pub base_z_index: i32,
    /// Pixels of a window that must stay inside the viewport after the viewport resizes
    pub min_visible_px: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub default_width: f64,
    /// `None` = auto height
    pub default_height: Option<f64>,
    pub initial_x: f64,
    pub initial_y: f64,
    pub cascade_offset: f64,
    pub cascade_steps: u32,
}

impl Default for WindowsSection {
    fn default() -> Self {
        Self {
            base_z_index: 1000,
            min_visible_px: 50.0,
            min_width: 400.0,
            min_height: 200.0,
            default_width: 600.0,
            default_height: None,
            initial_x: 80.0,
            initial_y: 60.0,
            cascade_offset: 32.0,
            cascade_steps: 8,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StalenessSection {
    pub debounce_ms: u64,
}

impl Default for StalenessSection {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HoldConfirmSection {
    pub duration_ms: u64,
    pub frame_ms: u64,
}

impl Default for HoldConfirmSection {
    fn default() -> Self {
        Self {
            duration_ms: 1500,
            frame_ms: 16,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LayoutSection {
    pub windows: Vec<WindowLayout>,
}
