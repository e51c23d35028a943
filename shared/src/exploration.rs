use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    game_time_eq, AuditEntryId, CampaignId, GameDays, PathId, Role, SessionId, TileCoordinate,
};

/// One play session of a campaign. At most one session per campaign is active.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub id: SessionId,
    pub campaign_id: CampaignId,
    pub sequence_number: u32,
    pub name: String,
    pub start_game_time: GameDays,
    #[serde(default)]
    pub end_game_time: Option<GameDays>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub last_activity_at: DateTime<Utc>,
}

/// One unit of party movement / time advancement within a session.
///
/// Tiles are carried as canonical `"col-row"` keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PathStep {
    PlayerMove {
        tile_key: String,
        timestamp: DateTime<Utc>,
        game_time: GameDays,
    },
    DmTeleport {
        from_tile: String,
        to_tile: String,
        timestamp: DateTime<Utc>,
        game_time: GameDays,
        time_cost: GameDays,
    },
    DmPath {
        tiles: Vec<String>,
        timestamp: DateTime<Utc>,
        game_time: GameDays,
        time_cost: GameDays,
    },
}

impl PathStep {
    pub fn game_time(&self) -> GameDays {
        match self {
            PathStep::PlayerMove { game_time, .. }
            | PathStep::DmTeleport { game_time, .. }
            | PathStep::DmPath { game_time, .. } => *game_time,
        }
    }

    /// Key of the tile the party stands on after this step
    pub fn destination(&self) -> Option<&str> {
        match self {
            PathStep::PlayerMove { tile_key, .. } => Some(tile_key),
            PathStep::DmTeleport { to_tile, .. } => Some(to_tile),
            PathStep::DmPath { tiles, .. } => tiles.last().map(String::as_str),
        }
    }

    pub fn destination_coords(&self) -> Option<TileCoordinate> {
        self.destination()
            .and_then(|key| TileCoordinate::from_key(key).ok())
    }

    /// Every tile the party enters during this step, in order
    pub fn visited(&self) -> Vec<&str> {
        match self {
            PathStep::PlayerMove { tile_key, .. } => vec![tile_key.as_str()],
            PathStep::DmTeleport { to_tile, .. } => vec![to_tile.as_str()],
            PathStep::DmPath { tiles, .. } => tiles.iter().map(String::as_str).collect(),
        }
    }

    /// Two steps are equivalent when they have the same kind, the same tiles and
    /// game times equal within the epsilon. Wall-clock timestamps are ignored.
    pub fn equivalent(&self, other: &PathStep) -> bool {
        let same_tiles = match (self, other) {
            (PathStep::PlayerMove { tile_key: a, .. }, PathStep::PlayerMove { tile_key: b, .. }) => {
                a == b
            }
            (
                PathStep::DmTeleport {
                    from_tile: a_from,
                    to_tile: a_to,
                    ..
                },
                PathStep::DmTeleport {
                    from_tile: b_from,
                    to_tile: b_to,
                    ..
                },
            ) => a_from == b_from && a_to == b_to,
            (PathStep::DmPath { tiles: a, .. }, PathStep::DmPath { tiles: b, .. }) => a == b,
            _ => false,
        };

        same_tiles && game_time_eq(self.game_time(), other.game_time())
    }
}

/// The ordered movement record of one session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Path {
    pub id: PathId,
    pub game_session_id: SessionId,
    pub steps: Vec<PathStep>,
    pub revealed_tiles: Vec<String>,
}

impl Path {
    pub fn empty(id: PathId, game_session_id: SessionId) -> Self {
        Self {
            id,
            game_session_id,
            steps: Vec::new(),
            revealed_tiles: Vec::new(),
        }
    }

    pub fn last_game_time(&self) -> Option<GameDays> {
        self.steps.last().map(PathStep::game_time)
    }

    pub fn contains_equivalent(&self, step: &PathStep) -> bool {
        self.steps.iter().any(|existing| existing.equivalent(step))
    }

    /// Adds tile keys to the path's revealed set, skipping ones already present.
    /// Returns how many were added.
    pub fn union_revealed<'a, I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut added = 0;
        for key in keys {
            if !self.revealed_tiles.iter().any(|existing| existing == key) {
                self.revealed_tiles.push(key.to_string());
                added += 1;
            }
        }
        added
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Movement,
    DmTeleport,
    DmPath,
    DmAdjust,
}

/// One append-only entry of the game time ledger
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAuditEntry {
    pub id: AuditEntryId,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: AuditKind,
    #[serde(rename = "amount")]
    pub amount_days: GameDays,
    pub actor_role: Role,
    #[serde(default)]
    pub notes: Option<String>,
}
