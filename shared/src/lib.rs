//! # Hexmap Shared
//! Common functionality shared between hexmap-server & hexmap-client crates:
//! the map data model, the wire events pushed to replicas, request/response
//! bodies and the error taxonomy.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod coords;
mod error;
mod events;
mod exploration;
mod markers;
mod requests;
mod snapshot;
mod tiles;
mod types;

pub use coords::{ParseTileKeyError, TileCoordinate};
pub use error::ApiError;
pub use events::{
    CampaignEvent, Frame, MarkerDeleted, SessionDeleted, SessionStarted, StepAdded, TimeUpdated,
    WireError, WireEvent, MARKER_CREATED, MARKER_DELETED, MARKER_UPDATED, SESSION_DELETED,
    SESSION_ENDED, SESSION_STARTED, STEP_ADDED, TILE_HIDDEN, TILE_REVEALED, TILE_TOGGLED,
    TIME_UPDATED,
};
pub use exploration::{AuditKind, GameSession, Path, PathStep, TimeAuditEntry};
pub use markers::{normalize_text, MapMarker, MarkerKind, MarkerPatch, NewMarker};
pub use requests::{
    AdjustTimeRequest, AdjustTimeResponse, BatchCounts, DmPathRequest, MovementResponse,
    PlayerMoveRequest, StartSessionResponse, TeleportRequest, TileBatchKind, TileBatchRequest,
    TileBatchResponse,
};
pub use snapshot::{CampaignInfo, CampaignSnapshot, HexGrid};
pub use tiles::{RevealedTile, TileState, ToggledTile};
pub use types::{
    game_time_eq, AuditEntryId, Audience, CampaignId, GameDays, MarkerId, PathId, Role,
    SessionId, GAME_TIME_EPSILON,
};
