use std::{
    future::Future,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use chrono::Utc;
use futures::{Stream, StreamExt};
use log::{debug, info, warn};

use hexmap_shared::{
    normalize_text, AdjustTimeRequest, AdjustTimeResponse, ApiError, CampaignEvent,
    DmPathRequest, Frame, GameDays, GameSession, MapMarker, MarkerDeleted, MarkerId, MarkerKind,
    MarkerPatch, MovementResponse, NewMarker, PlayerMoveRequest, Role, SessionDeleted, SessionId,
    SessionStarted, StartSessionResponse, StepAdded, TeleportRequest, TileCoordinate, TimeUpdated,
};

use crate::{
    CampaignApi, ChangeSet, ClientConfig, ClientError, LocalReplica, SharedReplica, TileBatcher,
};

/// One role's connection to a campaign: the replica, the batcher (DM only)
/// and the optimistic front for every other mutation.
pub struct CampaignClient {
    slug: String,
    role: Role,
    replica: SharedReplica,
    api: Arc<dyn CampaignApi>,
    batcher: Option<TileBatcher>,
    next_placeholder: AtomicI64,
}

impl CampaignClient {
    /// Fetches a snapshot and builds the replica from it
    pub async fn connect(
        api: Arc<dyn CampaignApi>,
        slug: impl Into<String>,
        role: Role,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let slug = slug.into();
        let snapshot = api.campaign_snapshot(&slug).await?;
        let replica = LocalReplica::from_snapshot(role, snapshot).shared();

        let batcher = match role {
            Role::Dm => Some(TileBatcher::new(
                replica.clone(),
                api.clone(),
                slug.clone(),
                config,
            )?),
            Role::Player => None,
        };

        info!("Connected to campaign '{}' as {}", slug, role);
        Ok(Self {
            slug,
            role,
            replica,
            api,
            batcher,
            next_placeholder: AtomicI64::new(-1),
        })
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn replica(&self) -> SharedReplica {
        self.replica.clone()
    }

    /// The tile batcher. Players have none.
    pub fn tiles(&self) -> Result<&TileBatcher, ClientError> {
        self.batcher
            .as_ref()
            .ok_or_else(|| ClientError::capability(self.role, "change tile visibility"))
    }

    /// Refetches everything. The only recovery from a missed event.
    pub async fn resync(&self) -> Result<ChangeSet, ClientError> {
        let snapshot = self.api.campaign_snapshot(&self.slug).await?;
        Ok(self.replica.lock().resync(snapshot))
    }

    /// Merges one pushed frame into the replica
    pub fn handle_frame(&self, frame: &Frame) -> Result<ChangeSet, ClientError> {
        match frame {
            Frame::KeepAlive => Ok(ChangeSet::new()),
            Frame::Event(wire) => Ok(self.replica.lock().apply_wire(wire)?),
        }
    }

    /// Pumps a push stream into the replica until the stream ends. Frames that
    /// fail to decode are logged and skipped.
    pub async fn run<S>(&self, mut frames: S)
    where
        S: Stream<Item = Frame> + Unpin,
    {
        while let Some(frame) = frames.next().await {
            if let Err(err) = self.handle_frame(&frame) {
                warn!("Skipping pushed frame: {}", err);
            }
        }
        debug!("Push stream for '{}' closed", self.slug);
    }

    // Markers

    /// Shows the marker at once under a negative placeholder id, then swaps in
    /// the confirmed row. A rejected create leaves no trace.
    pub async fn create_marker(&self, new_marker: NewMarker) -> Result<MapMarker, ClientError> {
        if self.role == Role::Player && new_marker.kind != MarkerKind::Note {
            return Err(ClientError::capability(self.role, "create points of interest"));
        }

        let placeholder_id = MarkerId::new(self.next_placeholder.fetch_sub(1, Ordering::Relaxed));
        let now = Utc::now();
        let placeholder = MapMarker {
            id: placeholder_id,
            x: new_marker.x,
            y: new_marker.y,
            kind: new_marker.kind,
            title: normalize_text(new_marker.title.as_deref()),
            content: normalize_text(new_marker.content.as_deref()),
            author_role: self.role,
            visible_to_players: new_marker.kind == MarkerKind::Note
                || new_marker.visible_to_players.unwrap_or(true),
            image_path: normalize_text(new_marker.image_path.as_deref()),
            created_at: now,
            updated_at: now,
        };
        self.replica.lock().upsert_marker(placeholder);

        let result = self.api.create_marker(&self.slug, new_marker).await;

        let mut replica = self.replica.lock();
        replica.remove_marker(placeholder_id);
        match result {
            Ok(marker) => {
                replica.upsert_marker(marker.clone());
                Ok(marker)
            }
            Err(err) => {
                warn!("Marker create rejected: {}", err);
                Err(err.into())
            }
        }
    }

    pub async fn update_marker(
        &self,
        id: MarkerId,
        patch: MarkerPatch,
    ) -> Result<MapMarker, ClientError> {
        let optimistic = {
            let mut replica = self.replica.lock();
            replica.marker(id).cloned().map(|before| {
                let mut after = before.clone();
                after.apply_patch(&patch, Utc::now());
                replica.upsert_marker(after.clone());
                (before, after)
            })
        };

        let result = self.api.update_marker(&self.slug, id, patch).await;

        let mut replica = self.replica.lock();
        match result {
            Ok(marker) => {
                replica.upsert_marker(marker.clone());
                Ok(marker)
            }
            Err(err) => {
                if let Some((before, after)) = optimistic {
                    // only undo if nothing newer landed meanwhile
                    if replica.marker(id) == Some(&after) {
                        replica.upsert_marker(before);
                    }
                }
                Err(err.into())
            }
        }
    }

    pub async fn delete_marker(&self, id: MarkerId) -> Result<MarkerDeleted, ClientError> {
        let removed = {
            let mut replica = self.replica.lock();
            let removed = replica.marker(id).cloned();
            replica.remove_marker(id);
            removed
        };

        let result = self.api.delete_marker(&self.slug, id).await;

        match result {
            Ok(deleted) => Ok(deleted),
            Err(err) => {
                if let Some(marker) = removed {
                    self.replica.lock().apply_marker_created(&marker);
                }
                Err(err.into())
            }
        }
    }

    // Sessions

    pub async fn start_session(&self) -> Result<StartSessionResponse, ClientError> {
        let response = self.api.start_session(&self.slug).await?;

        let mut replica = self.replica.lock();
        replica.apply_session_started(&SessionStarted {
            session: response.session.clone(),
            path_id: Some(response.path.id),
        });
        replica.adopt_path(response.path.clone());
        Ok(response)
    }

    pub async fn end_session(&self, id: SessionId) -> Result<GameSession, ClientError> {
        let session = self.api.end_session(&self.slug, id).await?;
        self.replica.lock().upsert_session(session.clone());
        Ok(session)
    }

    pub async fn delete_session(&self, id: SessionId) -> Result<SessionDeleted, ClientError> {
        let deleted = self.api.delete_session(&self.slug, id).await?;
        self.replica.lock().apply_session_deleted(&deleted);
        Ok(deleted)
    }

    // Movement & time

    pub async fn player_move(&self, to: TileCoordinate) -> Result<MovementResponse, ClientError> {
        let request = PlayerMoveRequest { tile_key: to.key() };
        self.move_party(to, self.api.player_move(&self.slug, request)).await
    }

    /// Teleports the party from wherever this replica last saw it
    pub async fn teleport(
        &self,
        to: TileCoordinate,
        time_cost: GameDays,
    ) -> Result<MovementResponse, ClientError> {
        self.require_dm("teleport the party")?;
        let from = self.replica.lock().party_position().unwrap_or(to);
        let request = TeleportRequest {
            from_tile: from.key(),
            to_tile: to.key(),
            time_cost,
        };
        self.move_party(to, self.api.dm_teleport(&self.slug, request)).await
    }

    pub async fn walk_path(
        &self,
        tiles: &[TileCoordinate],
        time_cost: GameDays,
    ) -> Result<MovementResponse, ClientError> {
        self.require_dm("move the party along a path")?;
        let Some(&to) = tiles.last() else {
            return Err(ApiError::validation("a path needs at least one tile").into());
        };
        let from = self.replica.lock().party_position().unwrap_or(tiles[0]);
        let request = DmPathRequest {
            from_tile: from.key(),
            tiles: tiles.iter().map(TileCoordinate::key).collect(),
            time_cost,
        };
        self.move_party(to, self.api.dm_path(&self.slug, request)).await
    }

    /// Applies a manual time change optimistically, guarded by the time this
    /// replica currently shows
    pub async fn adjust_time(
        &self,
        delta: GameDays,
        notes: Option<String>,
    ) -> Result<AdjustTimeResponse, ClientError> {
        self.require_dm("adjust game time")?;
        let (expected, optimistic) = {
            let mut replica = self.replica.lock();
            let expected = replica.game_time();
            replica.set_game_time(expected + delta);
            (expected, expected + delta)
        };

        let request = AdjustTimeRequest {
            delta,
            notes,
            expected_game_time: Some(expected),
        };
        let result = self.api.adjust_time(&self.slug, request).await;

        let mut replica = self.replica.lock();
        match result {
            Ok(response) => {
                replica.apply(&CampaignEvent::TimeUpdated(TimeUpdated {
                    global_game_time: response.global_game_time,
                    audit_entry: Some(response.audit_entry.clone()),
                }));
                Ok(response)
            }
            Err(err) => {
                if replica.game_time_matches(optimistic) {
                    replica.set_game_time(expected);
                }
                Err(err.into())
            }
        }
    }

    /// Shows the party at `to` while `request` is in flight
    async fn move_party<F>(
        &self,
        to: TileCoordinate,
        request: F,
    ) -> Result<MovementResponse, ClientError>
    where
        F: Future<Output = Result<MovementResponse, ApiError>>,
    {
        let before = {
            let mut replica = self.replica.lock();
            let before = replica.party_position();
            replica.set_party_position(Some(to));
            before
        };

        let result = request.await;

        let mut replica = self.replica.lock();
        match result {
            Ok(response) => {
                apply_movement(&mut replica, &response);
                Ok(response)
            }
            Err(err) => {
                if replica.party_position() == Some(to) {
                    replica.set_party_position(before);
                }
                Err(err.into())
            }
        }
    }

    fn require_dm(&self, action: &'static str) -> Result<(), ClientError> {
        match self.role {
            Role::Dm => Ok(()),
            Role::Player => Err(ClientError::capability(self.role, action)),
        }
    }
}

/// A movement response carries the same facts as the events it triggers, so
/// it merges through the same rules
fn apply_movement(replica: &mut LocalReplica, response: &MovementResponse) -> ChangeSet {
    let mut changes = replica.apply_revealed(&response.revealed_tiles);
    changes.merge(replica.apply_step_added(&StepAdded {
        session_id: response.session_id,
        step: response.step.clone(),
        tiles: response.tiles.clone(),
    }));
    changes.merge(replica.apply_time_updated(&TimeUpdated {
        global_game_time: response.global_game_time,
        audit_entry: Some(response.audit_entry.clone()),
    }));
    changes.merge(replica.set_party_position(Some(response.party_token_position)));
    changes
}
