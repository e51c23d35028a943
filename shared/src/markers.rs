use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MarkerId, Role, TileCoordinate};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    /// Point of interest, placed by the DM
    Poi,
    /// Free-form note, always visible to players
    Note,
}

/// A location marker pinned to one tile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub id: MarkerId,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub kind: MarkerKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    pub author_role: Role,
    pub visible_to_players: bool,
    #[serde(default)]
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MapMarker {
    pub fn coords(&self) -> TileCoordinate {
        TileCoordinate::new(self.x, self.y)
    }

    /// Notes are always player-visible; a poi is visible only when the DM says so
    pub fn is_player_visible(&self) -> bool {
        match self.kind {
            MarkerKind::Note => true,
            MarkerKind::Poi => self.visible_to_players,
        }
    }

    /// Applies a patch in place, keeping the visibility invariant intact
    pub fn apply_patch(&mut self, patch: &MarkerPatch, now: DateTime<Utc>) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(title) = &patch.title {
            self.title = normalize_text(Some(title.as_str()));
        }
        if let Some(content) = &patch.content {
            self.content = normalize_text(content.as_deref());
        }
        if let Some(visible) = patch.visible_to_players {
            self.visible_to_players = visible;
        }
        if let Some(image_path) = &patch.image_path {
            self.image_path = normalize_text(image_path.as_deref());
        }
        if self.kind == MarkerKind::Note {
            self.visible_to_players = true;
        }
        self.updated_at = now;
    }
}

/// Body of a marker create request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMarker {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub kind: MarkerKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub visible_to_players: Option<bool>,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl NewMarker {
    pub fn coords(&self) -> TileCoordinate {
        TileCoordinate::new(self.x, self.y)
    }
}

/// Body of a marker update request. Absent fields are left untouched; for the
/// nullable fields `Some(None)` clears the value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerPatch {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MarkerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_to_players: Option<bool>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_path: Option<Option<String>>,
}

impl MarkerPatch {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.title.is_none()
            && self.content.is_none()
            && self.visible_to_players.is_none()
            && self.image_path.is_none()
    }
}

/// Trims user text; blank text becomes absent
pub fn normalize_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

// distinguishes an explicit `null` (clear) from a missing field (keep)
fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
