use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while parsing a canonical tile key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseTileKeyError {
    /// The key has no `-` separating column and row
    #[error("tile key '{key}' is missing the column/row separator")]
    MissingSeparator { key: String },

    /// One of the two halves is not an integer
    #[error("tile key '{key}' has a non-integer {part}")]
    InvalidNumber { key: String, part: &'static str },
}

/// A hex tile position on the campaign grid, in odd-q offset coordinates.
///
/// Serialized as `{x, y}`; its canonical key form is `"col-row"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoordinate {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl TileCoordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the canonical `"col-row"` key for this tile
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Parses a canonical `"col-row"` key.
    ///
    /// Negative components are accepted (`"-1-2"` is column -1, row 2) so that
    /// every coordinate round-trips through its key.
    pub fn from_key(key: &str) -> Result<Self, ParseTileKeyError> {
        key.parse()
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.x, self.y)
    }
}

impl FromStr for TileCoordinate {
    type Err = ParseTileKeyError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        // the separator is the first '-' that isn't a leading sign
        let separator = key
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '-')
            .map(|(index, _)| index)
            .ok_or_else(|| ParseTileKeyError::MissingSeparator {
                key: key.to_string(),
            })?;

        let (col, row) = (&key[..separator], &key[separator + 1..]);

        let x = col
            .parse::<i32>()
            .map_err(|_| ParseTileKeyError::InvalidNumber {
                key: key.to_string(),
                part: "column",
            })?;
        let y = row
            .parse::<i32>()
            .map_err(|_| ParseTileKeyError::InvalidNumber {
                key: key.to_string(),
                part: "row",
            })?;

        Ok(Self { x, y })
    }
}

impl From<(i32, i32)> for TileCoordinate {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}
