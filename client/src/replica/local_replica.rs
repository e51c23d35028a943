use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use parking_lot::Mutex;

use hexmap_shared::{
    game_time_eq, CampaignInfo, CampaignSnapshot, GameDays, GameSession, MapMarker, MarkerId,
    Path, PathId, Role, SessionId, TileCoordinate, TileState, TimeAuditEntry,
};

use super::{ChangeSet, Versions};

/// A replica shared between its client, batcher and event pump. The lock is
/// never held across an await.
pub type SharedReplica = Arc<Mutex<LocalReplica>>;

/// Path id used for a path the replica created on its own, before the server
/// told it the real id
pub const UNCONFIRMED_PATH_ID: PathId = PathId::new(0);

/// One client's non-authoritative mirror of a campaign.
///
/// The same type serves both roles; what differs is what the role may do with
/// it (see [`LocalReplica::can_mutate_tiles`]) and whether an audit log is
/// kept.
#[derive(Clone, Debug)]
pub struct LocalReplica {
    role: Role,
    campaign: Option<CampaignInfo>,
    pub(crate) revealed: HashSet<TileCoordinate>,
    pub(crate) always_revealed: HashSet<TileCoordinate>,
    pub(crate) markers: BTreeMap<MarkerId, MapMarker>,
    pub(crate) markers_by_tile: HashMap<TileCoordinate, MarkerId>,
    /// Newest first
    pub(crate) sessions: Vec<GameSession>,
    pub(crate) paths: HashMap<SessionId, Path>,
    pub(crate) game_time: GameDays,
    pub(crate) party_position: Option<TileCoordinate>,
    /// Newest first; always empty for players
    pub(crate) audit_log: Vec<TimeAuditEntry>,
    /// Tiles with a batch in flight
    watched_tiles: HashMap<TileCoordinate, TileWatch>,
    versions: Versions,
}

#[derive(Clone, Copy, Debug, Default)]
struct TileWatch {
    in_flight: usize,
    /// Last state the server announced for the tile while watched
    reported: Option<TileState>,
}

impl LocalReplica {
    /// An empty replica, before any snapshot arrived
    pub fn new(role: Role) -> Self {
        Self {
            role,
            campaign: None,
            revealed: HashSet::new(),
            always_revealed: HashSet::new(),
            markers: BTreeMap::new(),
            markers_by_tile: HashMap::new(),
            sessions: Vec::new(),
            paths: HashMap::new(),
            game_time: 0.0,
            party_position: None,
            audit_log: Vec::new(),
            watched_tiles: HashMap::new(),
            versions: Versions::default(),
        }
    }

    pub fn from_snapshot(role: Role, snapshot: CampaignSnapshot) -> Self {
        let mut replica = Self::new(role);
        replica.resync(snapshot);
        replica
    }

    pub fn shared(self) -> SharedReplica {
        Arc::new(Mutex::new(self))
    }

    /// Replaces all state with a fresh snapshot. Used after reconnecting,
    /// since events missed while disconnected are never replayed.
    pub fn resync(&mut self, snapshot: CampaignSnapshot) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.tiles.extend(self.revealed.drain());
        changes.tiles.extend(self.always_revealed.drain());
        changes.markers.extend(self.markers.keys().copied());
        changes.sessions.extend(self.sessions.iter().map(|session| session.id));
        changes.paths.extend(self.paths.keys().copied());
        self.markers.clear();
        self.markers_by_tile.clear();
        self.paths.clear();

        for tile in snapshot.revealed_tiles {
            let coords = tile.coords();
            changes.tiles.insert(coords);
            if tile.always_revealed {
                self.always_revealed.insert(coords);
            } else {
                self.revealed.insert(coords);
            }
        }
        for marker in snapshot.map_markers {
            changes.markers.insert(marker.id);
            self.markers_by_tile.insert(marker.coords(), marker.id);
            self.markers.insert(marker.id, marker);
        }

        self.sessions = snapshot.game_sessions;
        self.sessions
            .sort_by(|a, b| b.sequence_number.cmp(&a.sequence_number));
        changes
            .sessions
            .extend(self.sessions.iter().map(|session| session.id));
        for path in snapshot.paths {
            changes.paths.insert(path.game_session_id);
            self.paths.insert(path.game_session_id, path);
        }

        self.audit_log = match self.role {
            Role::Dm => snapshot.time_audit_log.unwrap_or_default(),
            Role::Player => Vec::new(),
        };
        self.game_time = snapshot.campaign.global_game_time;
        self.party_position = snapshot.campaign.party_token_position;
        self.campaign = Some(snapshot.campaign);
        let watched: Vec<TileCoordinate> = self.watched_tiles.keys().copied().collect();
        for coords in watched {
            self.report_tile(coords, self.tile_state(coords));
        }

        changes.time = true;
        changes.party = true;
        changes.audit = self.role.is_dm();
        self.versions.bump_all();
        changes
    }

    // Read surface

    pub fn role(&self) -> Role {
        self.role
    }

    /// Only a DM replica may change tile visibility
    pub fn can_mutate_tiles(&self) -> bool {
        self.role.is_dm()
    }

    pub fn campaign(&self) -> Option<&CampaignInfo> {
        self.campaign.as_ref()
    }

    pub fn versions(&self) -> Versions {
        self.versions
    }

    pub fn tile_state(&self, coords: TileCoordinate) -> TileState {
        if self.always_revealed.contains(&coords) {
            TileState::AlwaysRevealed
        } else if self.revealed.contains(&coords) {
            TileState::Revealed
        } else {
            TileState::Unrevealed
        }
    }

    pub fn is_revealed(&self, coords: TileCoordinate) -> bool {
        self.tile_state(coords).is_revealed()
    }

    pub fn revealed_tiles(&self) -> impl Iterator<Item = &TileCoordinate> {
        self.revealed.iter()
    }

    pub fn always_revealed_tiles(&self) -> impl Iterator<Item = &TileCoordinate> {
        self.always_revealed.iter()
    }

    pub fn marker(&self, id: MarkerId) -> Option<&MapMarker> {
        self.markers.get(&id)
    }

    pub fn marker_at(&self, coords: TileCoordinate) -> Option<&MapMarker> {
        self.markers_by_tile
            .get(&coords)
            .and_then(|id| self.markers.get(id))
    }

    pub fn markers(&self) -> impl Iterator<Item = &MapMarker> {
        self.markers.values()
    }

    pub fn sessions(&self) -> &[GameSession] {
        &self.sessions
    }

    pub fn session(&self, id: SessionId) -> Option<&GameSession> {
        self.sessions.iter().find(|session| session.id == id)
    }

    pub fn active_session(&self) -> Option<&GameSession> {
        self.sessions.iter().find(|session| session.is_active)
    }

    pub fn path(&self, session_id: SessionId) -> Option<&Path> {
        self.paths.get(&session_id)
    }

    /// Path of the active session
    pub fn current_path(&self) -> Option<&Path> {
        self.active_session()
            .and_then(|session| self.paths.get(&session.id))
    }

    pub fn game_time(&self) -> GameDays {
        self.game_time
    }

    pub fn party_position(&self) -> Option<TileCoordinate> {
        self.party_position
    }

    /// Newest first. `None` for a player replica, which never holds one.
    pub fn audit_log(&self) -> Option<&[TimeAuditEntry]> {
        match self.role {
            Role::Dm => Some(&self.audit_log),
            Role::Player => None,
        }
    }

    // Direct mutations, used for optimistic writes and their rollback

    /// Moves a tile into exactly one of the three states
    pub fn set_tile_state(&mut self, coords: TileCoordinate, state: TileState) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if self.tile_state(coords) == state {
            return changes;
        }

        self.revealed.remove(&coords);
        self.always_revealed.remove(&coords);
        match state {
            TileState::Unrevealed => {}
            TileState::Revealed => {
                self.revealed.insert(coords);
            }
            TileState::AlwaysRevealed => {
                self.always_revealed.insert(coords);
            }
        }

        changes.tiles.insert(coords);
        self.commit(changes)
    }

    /// Starts recording what the server announces for `coords` until the
    /// matching [`unwatch_tile`](Self::unwatch_tile)
    pub fn watch_tile(&mut self, coords: TileCoordinate) {
        self.watched_tiles.entry(coords).or_default().in_flight += 1;
    }

    /// Stops one watch on `coords` and returns the last state the server
    /// announced for it while it was watched
    pub fn unwatch_tile(&mut self, coords: TileCoordinate) -> Option<TileState> {
        let watch = self.watched_tiles.get_mut(&coords)?;
        let reported = watch.reported;
        watch.in_flight = watch.in_flight.saturating_sub(1);
        if watch.in_flight == 0 {
            self.watched_tiles.remove(&coords);
        }
        reported
    }

    /// Records a server-announced tile state, whether or not it changed the
    /// replica
    pub(crate) fn report_tile(&mut self, coords: TileCoordinate, state: TileState) {
        if let Some(watch) = self.watched_tiles.get_mut(&coords) {
            watch.reported = Some(state);
        }
    }

    /// Inserts or replaces a marker by id, keeping the tile index in step
    pub fn upsert_marker(&mut self, marker: MapMarker) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if self.markers.get(&marker.id) == Some(&marker) {
            return changes;
        }

        if let Some(previous) = self.markers.get(&marker.id) {
            let previous_tile = previous.coords();
            self.unindex(previous_tile, marker.id);
        }
        self.markers_by_tile.insert(marker.coords(), marker.id);
        changes.markers.insert(marker.id);
        self.markers.insert(marker.id, marker);
        self.commit(changes)
    }

    pub fn remove_marker(&mut self, id: MarkerId) -> ChangeSet {
        let mut changes = ChangeSet::new();
        let Some(removed) = self.markers.remove(&id) else {
            return changes;
        };

        self.unindex(removed.coords(), id);
        changes.markers.insert(id);
        self.commit(changes)
    }

    pub fn set_game_time(&mut self, game_time: GameDays) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if self.game_time == game_time {
            return changes;
        }

        self.game_time = game_time;
        changes.time = true;
        self.commit(changes)
    }

    pub fn set_party_position(&mut self, position: Option<TileCoordinate>) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if self.party_position == position {
            return changes;
        }

        self.party_position = position;
        changes.party = true;
        self.commit(changes)
    }

    /// Adds an audit entry at the front unless one with the same id is known.
    /// Ignored on a player replica.
    pub fn prepend_audit_entry(&mut self, entry: TimeAuditEntry) -> ChangeSet {
        let changes = ChangeSet::new();
        if !self.role.is_dm() || self.audit_log.iter().any(|known| known.id == entry.id) {
            return changes;
        }

        self.audit_log.insert(0, entry);
        self.commit(ChangeSet {
            audit: true,
            ..changes
        })
    }

    /// Inserts or replaces a session by id, keeping newest-first order
    pub fn upsert_session(&mut self, session: GameSession) -> ChangeSet {
        let mut changes = ChangeSet::new();
        match self.sessions.iter_mut().find(|known| known.id == session.id) {
            Some(known) if *known == session => return changes,
            Some(known) => *known = session.clone(),
            None => {
                self.sessions.push(session.clone());
                self.sessions
                    .sort_by(|a, b| b.sequence_number.cmp(&a.sequence_number));
            }
        }

        changes.sessions.insert(session.id);
        self.commit(changes)
    }

    /// Takes in a path the server confirmed. A path the replica already holds
    /// keeps its steps and only learns its real id.
    pub fn adopt_path(&mut self, path: Path) -> ChangeSet {
        let mut changes = ChangeSet::new();
        let session_id = path.game_session_id;
        match self.paths.get_mut(&session_id) {
            Some(known) if known.id == path.id => return changes,
            Some(known) => known.id = path.id,
            None => {
                self.paths.insert(session_id, path);
            }
        }

        changes.paths.insert(session_id);
        self.commit(changes)
    }

    pub(crate) fn commit(&mut self, changes: ChangeSet) -> ChangeSet {
        self.versions.bump(&changes);
        changes
    }

    pub(crate) fn game_time_matches(&self, game_time: GameDays) -> bool {
        game_time_eq(self.game_time, game_time)
    }

    // a placeholder and its confirmed marker can briefly share a tile
    fn unindex(&mut self, coords: TileCoordinate, id: MarkerId) {
        if self.markers_by_tile.get(&coords) != Some(&id) {
            return;
        }
        self.markers_by_tile.remove(&coords);
        let other = self
            .markers
            .values()
            .find(|marker| marker.id != id && marker.coords() == coords)
            .map(|marker| marker.id);
        if let Some(other) = other {
            self.markers_by_tile.insert(coords, other);
        }
    }
}
