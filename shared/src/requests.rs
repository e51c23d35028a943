use serde::{Deserialize, Serialize};

use crate::{
    GameDays, GameSession, Path, PathStep, RevealedTile, SessionId, TileCoordinate,
    TimeAuditEntry, ToggledTile,
};

/// The three tile batch operations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileBatchKind {
    #[serde(rename = "reveal")]
    Reveal,
    #[serde(rename = "hide")]
    Hide,
    #[serde(rename = "toggle-always-revealed")]
    ToggleAlwaysRevealed,
}

impl TileBatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TileBatchKind::Reveal => "reveal",
            TileBatchKind::Hide => "hide",
            TileBatchKind::ToggleAlwaysRevealed => "toggle-always-revealed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileBatchRequest {
    #[serde(rename = "type")]
    pub kind: TileBatchKind,
    pub tiles: Vec<TileCoordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_revealed: Option<bool>,
}

/// Rows actually affected by a batch, shaped per operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchCounts {
    Reveal { revealed: usize, existing: usize },
    Hide { hidden: usize },
    Toggle { updated: usize, inserted: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileBatchResponse {
    pub success: bool,
    pub operation: TileBatchKind,
    pub processed: usize,
    pub result: BatchCounts,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revealed_tiles: Vec<RevealedTile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hidden_tiles: Vec<TileCoordinate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub toggled_tiles: Vec<ToggledTile>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMoveRequest {
    pub tile_key: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeleportRequest {
    pub from_tile: String,
    pub to_tile: String,
    pub time_cost: GameDays,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmPathRequest {
    pub from_tile: String,
    pub tiles: Vec<String>,
    pub time_cost: GameDays,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustTimeRequest {
    pub delta: GameDays,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_game_time: Option<GameDays>,
}

/// Answer to any of the three movement requests. Carries everything the
/// `movement:step-added`, `time:updated` and `tile:revealed` events carry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementResponse {
    pub success: bool,
    pub session_id: SessionId,
    pub step: PathStep,
    pub tiles: Vec<String>,
    pub revealed_tiles: Vec<RevealedTile>,
    pub global_game_time: GameDays,
    pub party_token_position: TileCoordinate,
    pub audit_entry: TimeAuditEntry,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustTimeResponse {
    pub success: bool,
    pub global_game_time: GameDays,
    pub audit_entry: TimeAuditEntry,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub session: GameSession,
    pub path: Path,
}
