use std::collections::BTreeMap;

use hexmap_shared::{
    CampaignInfo, GameSession, MapMarker, MarkerId, Path, RevealedTile, SessionId,
    TileCoordinate, TimeAuditEntry,
};

/// Every persisted row of one campaign. Transactions work on a clone of this
/// and swap it in whole on success.
#[derive(Clone, Debug)]
pub struct CampaignRecord {
    pub info: CampaignInfo,
    pub tiles: BTreeMap<TileCoordinate, RevealedTile>,
    pub markers: BTreeMap<MarkerId, MapMarker>,
    pub sessions: BTreeMap<SessionId, GameSession>,
    pub paths: BTreeMap<SessionId, Path>,
    /// Oldest first
    pub audit_log: Vec<TimeAuditEntry>,
}

impl CampaignRecord {
    pub fn new(info: CampaignInfo) -> Self {
        Self {
            info,
            tiles: BTreeMap::new(),
            markers: BTreeMap::new(),
            sessions: BTreeMap::new(),
            paths: BTreeMap::new(),
            audit_log: Vec::new(),
        }
    }

    pub fn active_session(&self) -> Option<&GameSession> {
        self.sessions.values().find(|session| session.is_active)
    }

    pub fn active_session_id(&self) -> Option<SessionId> {
        self.active_session().map(|session| session.id)
    }

    pub fn marker_at(&self, coords: TileCoordinate) -> Option<&MapMarker> {
        self.markers
            .values()
            .find(|marker| marker.coords() == coords)
    }

    pub fn next_session_sequence(&self) -> u32 {
        self.sessions
            .values()
            .map(|session| session.sequence_number)
            .max()
            .unwrap_or(0)
            + 1
    }
}
