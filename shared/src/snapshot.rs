use serde::{Deserialize, Serialize};

use crate::{
    CampaignId, GameDays, GameSession, MapMarker, Path, RevealedTile, TileCoordinate,
    TimeAuditEntry,
};

/// Geometry of a campaign's hex grid (flat-top, odd-q offset)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HexGrid {
    pub columns: i32,
    pub rows: i32,
    pub hex_size: f64,
}

impl HexGrid {
    pub fn new(columns: i32, rows: i32) -> Self {
        Self {
            columns,
            rows,
            ..Self::default()
        }
    }

    pub fn contains(&self, coords: TileCoordinate) -> bool {
        (0..self.columns).contains(&coords.x) && (0..self.rows).contains(&coords.y)
    }
}

impl Default for HexGrid {
    fn default() -> Self {
        Self {
            columns: 20,
            rows: 20,
            hex_size: 40.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignInfo {
    pub id: CampaignId,
    pub name: String,
    pub slug: String,
    pub grid: HexGrid,
    pub global_game_time: GameDays,
    #[serde(default)]
    pub party_token_position: Option<TileCoordinate>,
}

/// Everything a replica needs to (re)build itself, filtered for one role
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSnapshot {
    pub campaign: CampaignInfo,
    pub revealed_tiles: Vec<RevealedTile>,
    pub map_markers: Vec<MapMarker>,
    /// Newest first
    pub game_sessions: Vec<GameSession>,
    pub paths: Vec<Path>,
    /// Newest first; only present for the DM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_audit_log: Option<Vec<TimeAuditEntry>>,
}
