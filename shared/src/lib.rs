use serde::{Deserialize, Serialize};
use std::fmt;

mod config;

pub use config::{
    AppSection, ConfigError, DeskConfig, HoldConfirmSection, LayoutSection, MigrationStrategy,
    StalenessSection, WindowsSection,
};

// ===== IDENTIFIERS =====

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct GameId(pub String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct VersionId(pub String);

impl VersionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ===== ASSET KINDS =====

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Npc,
    Location,
    Plot,
}

impl AssetType {
    pub const ALL: [AssetType; 3] = [AssetType::Npc, AssetType::Location, AssetType::Plot];

    pub fn label(&self) -> &'static str {
        match self {
            AssetType::Npc => "NPC",
            AssetType::Location => "Location",
            AssetType::Plot => "Plot",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlotStatus {
    #[default]
    Planned,
    Active,
    Resolved,
    Abandoned,
}

// ===== SERVER SHAPE =====
//
// Nullable text fields come back as `None` from the server. Forms carry plain
// strings so the editing surface never has to distinguish "empty" from "unset".

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NpcDetails {
    pub name: String,
    pub description: Option<String>,
    pub appearance: Option<String>,
    pub personality: Option<String>,
    pub motivation: Option<String>,
    pub secrets: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct LocationDetails {
    pub name: String,
    pub description: Option<String>,
    pub terrain: Option<String>,
    pub parent_location_id: Option<AssetId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PlotDetails {
    pub name: String,
    pub summary: Option<String>,
    pub status: PlotStatus,
    pub related_npc_ids: Vec<AssetId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "asset_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetDetails {
    Npc(NpcDetails),
    Location(LocationDetails),
    Plot(PlotDetails),
}

impl AssetDetails {
    pub fn asset_type(&self) -> AssetType {
        match self {
            AssetDetails::Npc(_) => AssetType::Npc,
            AssetDetails::Location(_) => AssetType::Location,
            AssetDetails::Plot(_) => AssetType::Plot,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AssetDetails::Npc(npc) => &npc.name,
            AssetDetails::Location(location) => &location.name,
            AssetDetails::Plot(plot) => &plot.name,
        }
    }
}

/// Server-confirmed asset as returned by fetch, create, update and revert.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssetRecord {
    pub id: AssetId,
    pub game_id: GameId,
    pub details: AssetDetails,
    pub image_url: Option<String>,
    /// Milliseconds since epoch
    pub updated_at: i64,
}

impl AssetRecord {
    pub fn asset_type(&self) -> AssetType {
        self.details.asset_type()
    }

    pub fn name(&self) -> &str {
        self.details.name()
    }
}

/// Payload for create and update calls.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssetInput {
    pub game_id: GameId,
    pub details: AssetDetails,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssetVersion {
    pub version_id: VersionId,
    pub name: String,
    /// Milliseconds since epoch
    pub created_at: i64,
}

// ===== EDITABLE SHAPE =====

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NpcForm {
    pub name: String,
    pub description: String,
    pub appearance: String,
    pub personality: String,
    pub motivation: String,
    pub secrets: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct LocationForm {
    pub name: String,
    pub description: String,
    pub terrain: String,
    pub parent_location_id: Option<AssetId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PlotForm {
    pub name: String,
    pub summary: String,
    pub status: PlotStatus,
    pub related_npc_ids: Vec<AssetId>,
}

/// Working copy shown in an asset window.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "asset_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetForm {
    Npc(NpcForm),
    Location(LocationForm),
    Plot(PlotForm),
}

impl AssetForm {
    /// Blank form for a record that does not exist on the server yet.
    pub fn defaults(asset_type: AssetType) -> Self {
        match asset_type {
            AssetType::Npc => AssetForm::Npc(NpcForm::default()),
            AssetType::Location => AssetForm::Location(LocationForm::default()),
            AssetType::Plot => AssetForm::Plot(PlotForm::default()),
        }
    }

    pub fn from_details(details: &AssetDetails) -> Self {
        match details {
            AssetDetails::Npc(npc) => AssetForm::Npc(NpcForm {
                name: npc.name.clone(),
                description: text_or_empty(&npc.description),
                appearance: text_or_empty(&npc.appearance),
                personality: text_or_empty(&npc.personality),
                motivation: text_or_empty(&npc.motivation),
                secrets: text_or_empty(&npc.secrets),
            }),
            AssetDetails::Location(location) => AssetForm::Location(LocationForm {
                name: location.name.clone(),
                description: text_or_empty(&location.description),
                terrain: text_or_empty(&location.terrain),
                parent_location_id: location.parent_location_id.clone(),
            }),
            AssetDetails::Plot(plot) => AssetForm::Plot(PlotForm {
                name: plot.name.clone(),
                summary: text_or_empty(&plot.summary),
                status: plot.status,
                related_npc_ids: plot.related_npc_ids.clone(),
            }),
        }
    }

    pub fn from_record(record: &AssetRecord) -> Self {
        Self::from_details(&record.details)
    }

    /// Converts back to the server shape. Names are trimmed, blank text becomes `None`.
    pub fn to_details(&self) -> AssetDetails {
        match self {
            AssetForm::Npc(npc) => AssetDetails::Npc(NpcDetails {
                name: npc.name.trim().to_string(),
                description: empty_to_none(&npc.description),
                appearance: empty_to_none(&npc.appearance),
                personality: empty_to_none(&npc.personality),
                motivation: empty_to_none(&npc.motivation),
                secrets: empty_to_none(&npc.secrets),
            }),
            AssetForm::Location(location) => AssetDetails::Location(LocationDetails {
                name: location.name.trim().to_string(),
                description: empty_to_none(&location.description),
                terrain: empty_to_none(&location.terrain),
                parent_location_id: location.parent_location_id.clone(),
            }),
            AssetForm::Plot(plot) => AssetDetails::Plot(PlotDetails {
                name: plot.name.trim().to_string(),
                summary: empty_to_none(&plot.summary),
                status: plot.status,
                related_npc_ids: plot.related_npc_ids.clone(),
            }),
        }
    }

    pub fn asset_type(&self) -> AssetType {
        match self {
            AssetForm::Npc(_) => AssetType::Npc,
            AssetForm::Location(_) => AssetType::Location,
            AssetForm::Plot(_) => AssetType::Plot,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AssetForm::Npc(npc) => &npc.name,
            AssetForm::Location(location) => &location.name,
            AssetForm::Plot(plot) => &plot.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            AssetForm::Npc(npc) => npc.name = name,
            AssetForm::Location(location) => location.name = name,
            AssetForm::Plot(plot) => plot.name = name,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.name().trim().is_empty()
    }
}

fn text_or_empty(text: &Option<String>) -> String {
    text.clone().unwrap_or_default()
}

fn empty_to_none(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ===== WINDOW GEOMETRY =====

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Measured width and height in pixels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Requested window size. `height: None` lets the content decide ("auto").
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct WindowSize {
    pub width: f64,
    pub height: Option<f64>,
}

impl WindowSize {
    pub const fn new(width: f64, height: Option<f64>) -> Self {
        Self { width, height }
    }

    /// Resolves an auto height with `fallback_height`.
    pub fn extent_or(&self, fallback_height: f64) -> Extent {
        Extent::new(self.width, self.height.unwrap_or(fallback_height))
    }
}

impl From<Extent> for WindowSize {
    fn from(extent: Extent) -> Self {
        Self::new(extent.width, Some(extent.height))
    }
}

/// Persisted placement of a window bound to a saved asset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WindowLayout {
    pub asset_type: AssetType,
    pub asset_id: AssetId,
    pub display_name: String,
    pub position: Position,
    pub size: WindowSize,
    #[serde(default)]
    pub is_minimized: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bob() -> AssetRecord {
        AssetRecord {
            id: AssetId::from("n1"),
            game_id: GameId::new("g1"),
            details: AssetDetails::Npc(NpcDetails {
                name: "Bob".to_string(),
                description: Some("Innkeeper".to_string()),
                ..Default::default()
            }),
            image_url: None,
            updated_at: 0,
        }
    }

    #[test]
    fn form_from_record_fills_missing_text_with_empty_strings() {
        let form = AssetForm::from_record(&bob());
        let AssetForm::Npc(npc) = &form else {
            panic!("expected npc form");
        };
        assert_eq!(npc.name, "Bob");
        assert_eq!(npc.description, "Innkeeper");
        assert_eq!(npc.secrets, "");
    }

    #[test]
    fn form_back_to_details_matches_server_shape() {
        let record = bob();
        let form = AssetForm::from_record(&record);
        assert_eq!(form.to_details(), record.details);
    }

    #[test]
    fn blank_name_is_invalid() {
        let mut form = AssetForm::defaults(AssetType::Plot);
        assert!(!form.is_valid());
        form.set_name("   ");
        assert!(!form.is_valid());
        form.set_name("The Heist");
        assert!(form.is_valid());
        assert_eq!(form.asset_type(), AssetType::Plot);
    }

    #[test]
    fn details_serialize_with_asset_type_tag() {
        let json = serde_json::to_value(&bob().details).unwrap();
        assert_eq!(json["asset_type"], "NPC");
        assert_eq!(json["name"], "Bob");
    }

    #[test]
    fn auto_height_resolves_to_fallback() {
        let size = WindowSize::new(600.0, None);
        assert_eq!(size.extent_or(200.0), Extent::new(600.0, 200.0));
        let fixed = WindowSize::new(600.0, Some(480.0));
        assert_eq!(fixed.extent_or(200.0), Extent::new(600.0, 480.0));
    }
}
