use log::{debug, warn};

use hexmap_shared::{
    CampaignEvent, MapMarker, MarkerDeleted, Path, RevealedTile, SessionDeleted, SessionStarted,
    StepAdded, TileCoordinate, TileState, TimeUpdated, ToggledTile, WireError, WireEvent,
};

use super::{local_replica::UNCONFIRMED_PATH_ID, ChangeSet, LocalReplica};

/// Merge rules for server-pushed events. Every rule is idempotent, so an
/// event may be applied after the mutation response that already carried the
/// same change.
impl LocalReplica {
    pub fn apply(&mut self, event: &CampaignEvent) -> ChangeSet {
        let changes = match event {
            CampaignEvent::TilesRevealed(tiles) => self.apply_revealed(tiles),
            CampaignEvent::TilesHidden(tiles) => self.apply_hidden(tiles),
            CampaignEvent::TilesToggled(tiles) => self.apply_toggled(tiles),
            CampaignEvent::MarkerCreated(marker) => self.apply_marker_created(marker),
            CampaignEvent::MarkerUpdated(marker) => self.upsert_marker(marker.clone()),
            CampaignEvent::MarkerDeleted(deleted) => self.apply_marker_deleted(deleted),
            CampaignEvent::SessionStarted(started) => self.apply_session_started(started),
            CampaignEvent::SessionEnded(session) => self.upsert_session(session.clone()),
            CampaignEvent::SessionDeleted(deleted) => self.apply_session_deleted(deleted),
            CampaignEvent::StepAdded(step) => self.apply_step_added(step),
            CampaignEvent::TimeUpdated(time) => self.apply_time_updated(time),
        };

        if changes.is_empty() {
            debug!("{} changed nothing", event.name());
        }
        changes
    }

    /// Decodes and applies one pushed event
    pub fn apply_wire(&mut self, wire: &WireEvent) -> Result<ChangeSet, WireError> {
        let event = wire.decode()?;
        Ok(self.apply(&event))
    }

    /// A tile joins the named set only if it is in neither
    pub fn apply_revealed(&mut self, tiles: &[RevealedTile]) -> ChangeSet {
        let mut changes = ChangeSet::new();
        for tile in tiles {
            let coords = tile.coords();
            self.report_tile(coords, TileState::from_flag(tile.always_revealed));
            if self.revealed.contains(&coords) || self.always_revealed.contains(&coords) {
                continue;
            }
            if tile.always_revealed {
                self.always_revealed.insert(coords);
            } else {
                self.revealed.insert(coords);
            }
            changes.tiles.insert(coords);
        }
        self.commit(changes)
    }

    pub fn apply_hidden(&mut self, tiles: &[TileCoordinate]) -> ChangeSet {
        let mut changes = ChangeSet::new();
        for coords in tiles {
            self.report_tile(*coords, TileState::Unrevealed);
            let removed = self.revealed.remove(coords) | self.always_revealed.remove(coords);
            if removed {
                changes.tiles.insert(*coords);
            }
        }
        self.commit(changes)
    }

    /// Moves keys between the two revealed sets. Turning the flag on for an
    /// unrevealed tile reveals it; turning it off for an absent tile does
    /// nothing.
    pub fn apply_toggled(&mut self, tiles: &[ToggledTile]) -> ChangeSet {
        let mut changes = ChangeSet::new();
        for tile in tiles {
            let coords = tile.coords();
            self.report_tile(coords, TileState::from_flag(tile.always_revealed));
            let moved = if tile.always_revealed {
                self.revealed.remove(&coords);
                self.always_revealed.insert(coords)
            } else if self.always_revealed.remove(&coords) {
                self.revealed.insert(coords)
            } else {
                false
            };
            if moved {
                changes.tiles.insert(coords);
            }
        }
        self.commit(changes)
    }

    pub fn apply_marker_created(&mut self, marker: &MapMarker) -> ChangeSet {
        if self.markers.contains_key(&marker.id) {
            return ChangeSet::new();
        }
        self.upsert_marker(marker.clone())
    }

    pub fn apply_marker_deleted(&mut self, deleted: &MarkerDeleted) -> ChangeSet {
        self.remove_marker(deleted.id)
    }

    /// Upserts the session and gives it an empty path unless one exists. An
    /// event without a path id leaves the path on [`UNCONFIRMED_PATH_ID`].
    pub fn apply_session_started(&mut self, started: &SessionStarted) -> ChangeSet {
        let session = &started.session;
        let mut changes = self.upsert_session(session.clone());
        let path_id = started.path_id.unwrap_or(UNCONFIRMED_PATH_ID);
        let needs_path = match self.paths.get(&session.id) {
            None => true,
            Some(path) => path.id == UNCONFIRMED_PATH_ID && path_id != UNCONFIRMED_PATH_ID,
        };
        if needs_path {
            changes.merge(self.adopt_path(Path::empty(path_id, session.id)));
        }
        changes
    }

    pub fn apply_session_deleted(&mut self, deleted: &SessionDeleted) -> ChangeSet {
        let mut changes = ChangeSet::new();
        let before = self.sessions.len();
        self.sessions.retain(|session| session.id != deleted.id);
        if self.sessions.len() != before {
            changes.sessions.insert(deleted.id);
        }
        if self.paths.remove(&deleted.id).is_some() {
            changes.paths.insert(deleted.id);
        }
        self.commit(changes)
    }

    /// Appends a step unless an equivalent one is already on the path, then
    /// moves the party and the clock to where the step left them
    pub fn apply_step_added(&mut self, added: &StepAdded) -> ChangeSet {
        let mut changes = ChangeSet::new();
        let Some(path) = self.paths.get_mut(&added.session_id) else {
            warn!(
                "No path for session {}, dropping {} step",
                added.session_id,
                added.step.destination().unwrap_or("?")
            );
            return changes;
        };
        if path.contains_equivalent(&added.step) {
            return changes;
        }

        path.steps.push(added.step.clone());
        path.union_revealed(added.tiles.iter().map(String::as_str));
        changes.paths.insert(added.session_id);

        let destination = added.step.destination_coords();
        if destination.is_some() && self.party_position != destination {
            self.party_position = destination;
            changes.party = true;
        }
        if self.game_time != added.step.game_time() {
            self.game_time = added.step.game_time();
            changes.time = true;
        }
        self.commit(changes)
    }

    pub fn apply_time_updated(&mut self, update: &TimeUpdated) -> ChangeSet {
        let mut changes = self.set_game_time(update.global_game_time);
        if let Some(entry) = &update.audit_entry {
            changes.merge(self.prepend_audit_entry(entry.clone()));
        }
        changes
    }
}
