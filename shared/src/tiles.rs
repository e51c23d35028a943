use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TileCoordinate;

/// Reveal status of a single tile. The three states are mutually exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileState {
    Unrevealed,
    Revealed,
    AlwaysRevealed,
}

impl TileState {
    pub fn is_revealed(self) -> bool {
        self != TileState::Unrevealed
    }

    pub fn from_flag(always_revealed: bool) -> Self {
        if always_revealed {
            TileState::AlwaysRevealed
        } else {
            TileState::Revealed
        }
    }
}

/// A persisted revealed tile, as stored and as carried by `tile:revealed`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedTile {
    pub x: i32,
    pub y: i32,
    pub always_revealed: bool,
    pub revealed_at: DateTime<Utc>,
}

impl RevealedTile {
    pub fn new(coords: TileCoordinate, always_revealed: bool, revealed_at: DateTime<Utc>) -> Self {
        Self {
            x: coords.x,
            y: coords.y,
            always_revealed,
            revealed_at,
        }
    }

    pub fn coords(&self) -> TileCoordinate {
        TileCoordinate::new(self.x, self.y)
    }

    pub fn state(&self) -> TileState {
        TileState::from_flag(self.always_revealed)
    }
}

/// A tile whose always-revealed flag changed, as carried by `tile:toggled`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggledTile {
    pub x: i32,
    pub y: i32,
    pub always_revealed: bool,
}

impl ToggledTile {
    pub fn coords(&self) -> TileCoordinate {
        TileCoordinate::new(self.x, self.y)
    }
}
