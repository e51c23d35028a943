use chrono::{DateTime, Utc};
use log::{debug, info};

use hexmap_shared::{
    ApiError, Audience, AuditKind, CampaignEvent, CampaignId, DmPathRequest, GameDays,
    MovementResponse, PathStep, PlayerMoveRequest, RevealedTile, Role, StepAdded,
    TeleportRequest, TileCoordinate, TimeAuditEntry, GAME_TIME_EPSILON,
};

use super::time::time_fan_out;
use crate::{
    server::{ensure_on_grid, Outgoing},
    store::CampaignRecord,
    MapServer, SessionContext,
};

/// Everything one movement commits, minus what is derived from stored state
struct Movement {
    from: Option<TileCoordinate>,
    visited: Vec<TileCoordinate>,
    cost: GameDays,
    kind: AuditKind,
    notes: String,
}

impl MapServer {
    /// Moves the party one tile, costing the configured player move time
    pub fn player_move(
        &self,
        ctx: &SessionContext,
        slug: &str,
        request: PlayerMoveRequest,
    ) -> Result<MovementResponse, ApiError> {
        let campaign_id = self.resolve(ctx, slug)?;
        let to = TileCoordinate::from_key(&request.tile_key)?;
        let tile_key = to.key();

        let movement = Movement {
            from: None,
            visited: vec![to],
            cost: self.config.player_move_cost_days,
            kind: AuditKind::Movement,
            notes: format!("Player move to {}", tile_key),
        };

        self.move_party(campaign_id, ctx.role, movement, |game_time, timestamp| {
            PathStep::PlayerMove {
                tile_key,
                timestamp,
                game_time,
            }
        })
    }

    /// Moves the party straight to a tile. `from` must match where the server
    /// believes the party is.
    pub fn dm_teleport(
        &self,
        ctx: &SessionContext,
        slug: &str,
        request: TeleportRequest,
    ) -> Result<MovementResponse, ApiError> {
        let campaign_id = self.resolve_dm(ctx, slug, "teleport the party")?;
        ensure_cost(request.time_cost)?;
        let from = TileCoordinate::from_key(&request.from_tile)?;
        let to = TileCoordinate::from_key(&request.to_tile)?;
        let (from_tile, to_tile) = (from.key(), to.key());

        let movement = Movement {
            from: Some(from),
            visited: vec![to],
            cost: request.time_cost,
            kind: AuditKind::DmTeleport,
            notes: format!("Teleport from {} to {}", from_tile, to_tile),
        };
        let time_cost = request.time_cost;

        self.move_party(campaign_id, ctx.role, movement, |game_time, timestamp| {
            PathStep::DmTeleport {
                from_tile,
                to_tile,
                timestamp,
                game_time,
                time_cost,
            }
        })
    }

    /// Walks the party along a sequence of tiles, revealing each one
    pub fn dm_path(
        &self,
        ctx: &SessionContext,
        slug: &str,
        request: DmPathRequest,
    ) -> Result<MovementResponse, ApiError> {
        let campaign_id = self.resolve_dm(ctx, slug, "move the party along a path")?;
        ensure_cost(request.time_cost)?;
        if request.tiles.is_empty() {
            return Err(ApiError::validation("a path needs at least one tile"));
        }
        let from = TileCoordinate::from_key(&request.from_tile)?;
        let visited = request
            .tiles
            .iter()
            .map(|key| TileCoordinate::from_key(key))
            .collect::<Result<Vec<_>, _>>()?;
        let tiles: Vec<String> = visited.iter().map(TileCoordinate::key).collect();

        let movement = Movement {
            from: Some(from),
            visited,
            cost: request.time_cost,
            kind: AuditKind::DmPath,
            notes: format!("Path of {} tiles from {}", tiles.len(), from),
        };
        let time_cost = request.time_cost;

        self.move_party(campaign_id, ctx.role, movement, |game_time, timestamp| {
            PathStep::DmPath {
                tiles,
                timestamp,
                game_time,
                time_cost,
            }
        })
    }

    /// Commits step, newly revealed tiles, game time, party position, audit
    /// entry and session activity in one transaction, then publishes
    fn move_party<F>(
        &self,
        campaign_id: CampaignId,
        role: Role,
        movement: Movement,
        build_step: F,
    ) -> Result<MovementResponse, ApiError>
    where
        F: FnOnce(GameDays, DateTime<Utc>) -> PathStep,
    {
        let now = Self::now();

        let response = self.commit(
            campaign_id,
            |record| {
                for coords in &movement.visited {
                    ensure_on_grid(record, *coords)?;
                }
                ensure_party_at(record, movement.from)?;

                let session_id = record
                    .active_session_id()
                    .ok_or_else(|| ApiError::conflict("no active session"))?;

                let game_time = record.info.global_game_time + movement.cost;
                let step = build_step(game_time, now);

                let path = record
                    .paths
                    .get_mut(&session_id)
                    .ok_or_else(|| ApiError::not_found("Path for session", session_id))?;
                if let Some(last) = path.last_game_time() {
                    if game_time + GAME_TIME_EPSILON < last {
                        return Err(ApiError::conflict(format!(
                            "step at {} would precede the last step at {}",
                            game_time, last
                        )));
                    }
                }
                let tiles: Vec<String> = movement.visited.iter().map(TileCoordinate::key).collect();
                path.steps.push(step.clone());
                path.union_revealed(tiles.iter().map(String::as_str));

                let mut revealed_tiles = Vec::new();
                for coords in &movement.visited {
                    if !record.tiles.contains_key(coords) {
                        let tile = RevealedTile::new(*coords, false, now);
                        record.tiles.insert(*coords, tile.clone());
                        revealed_tiles.push(tile);
                    }
                }

                let destination = step
                    .destination_coords()
                    .ok_or_else(|| ApiError::validation("movement has no destination"))?;
                record.info.global_game_time = game_time;
                record.info.party_token_position = Some(destination);
                if let Some(session) = record.sessions.get_mut(&session_id) {
                    session.last_activity_at = now;
                }

                let audit_entry = TimeAuditEntry {
                    id: self.store.next_audit_id(),
                    timestamp: now,
                    kind: movement.kind,
                    amount_days: movement.cost,
                    actor_role: role,
                    notes: Some(movement.notes),
                };
                record.audit_log.push(audit_entry.clone());

                Ok(MovementResponse {
                    success: true,
                    session_id,
                    step,
                    tiles,
                    revealed_tiles,
                    global_game_time: game_time,
                    party_token_position: destination,
                    audit_entry,
                })
            },
            movement_fan_out,
        )?;

        info!(
            "Campaign {} party moved to {} at day {}",
            campaign_id, response.party_token_position, response.global_game_time
        );

        Ok(response)
    }
}

fn ensure_cost(time_cost: GameDays) -> Result<(), ApiError> {
    if time_cost.is_finite() && time_cost >= 0.0 {
        Ok(())
    } else {
        Err(ApiError::validation("time cost must be zero or more days"))
    }
}

/// A campaign that never placed its party accepts any starting tile
fn ensure_party_at(record: &CampaignRecord, from: Option<TileCoordinate>) -> Result<(), ApiError> {
    match (record.info.party_token_position, from) {
        (Some(stored), Some(from)) if stored != from => {
            debug!("Stale movement: party is at {}, request says {}", stored, from);
            Err(ApiError::conflict(format!(
                "party is at {}, not {}",
                stored, from
            )))
        }
        _ => Ok(()),
    }
}

fn movement_fan_out(response: &MovementResponse) -> Vec<Outgoing> {
    let mut outgoing = Vec::new();
    if !response.revealed_tiles.is_empty() {
        outgoing.push((
            CampaignEvent::TilesRevealed(response.revealed_tiles.clone()),
            Audience::All,
        ));
    }
    outgoing.push((
        CampaignEvent::StepAdded(StepAdded {
            session_id: response.session_id,
            step: response.step.clone(),
            tiles: response.tiles.clone(),
        }),
        Audience::All,
    ));
    outgoing.extend(time_fan_out(
        response.global_game_time,
        &response.audit_entry,
    ));
    outgoing
}
