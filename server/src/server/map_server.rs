use chrono::{DateTime, Utc};
use log::debug;

use hexmap_shared::{
    ApiError, Audience, CampaignEvent, CampaignId, CampaignSnapshot, Role, TileCoordinate,
};

use crate::{
    hub::{BroadcastHub, EventStream},
    store::{CampaignRecord, CampaignSeed, MemoryStore},
    ServerConfig, SessionContext,
};

/// An event published by the transaction that produced it
pub(crate) type Outgoing = (CampaignEvent, Audience);

/// Validates and applies every map mutation, then fans the resulting events
/// out through the [`BroadcastHub`]
pub struct MapServer {
    pub(crate) config: ServerConfig,
    pub(crate) store: MemoryStore,
    hub: BroadcastHub,
}

impl MapServer {
    /// Create a new MapServer with its own hub
    pub fn new(config: ServerConfig) -> Self {
        let hub = BroadcastHub::new(config.heartbeat_interval, config.subscriber_buffer);
        Self::with_hub(config, hub)
    }

    /// Create a new MapServer publishing into an existing hub
    pub fn with_hub(config: ServerConfig, hub: BroadcastHub) -> Self {
        Self {
            config,
            store: MemoryStore::new(),
            hub,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Registers a campaign handed over by the campaign collaborator
    pub fn register_campaign(&self, seed: CampaignSeed) -> Result<CampaignId, ApiError> {
        self.store.insert_campaign(seed)
    }

    /// Opens the caller's push stream for the campaign named by `slug`
    pub fn subscribe(&self, ctx: &SessionContext, slug: &str) -> Result<EventStream, ApiError> {
        let campaign_id = self.resolve(ctx, slug)?;
        Ok(self.hub.subscribe(campaign_id, ctx.role))
    }

    /// Full state of the campaign as the caller's role may see it
    pub fn campaign_snapshot(
        &self,
        ctx: &SessionContext,
        slug: &str,
    ) -> Result<CampaignSnapshot, ApiError> {
        let campaign_id = self.resolve(ctx, slug)?;
        let role = ctx.role;
        let session_limit = self.config.session_list_limit;
        let audit_limit = self.config.audit_log_limit;

        self.store.read(campaign_id, |record| {
            let map_markers = record
                .markers
                .values()
                .filter(|marker| role.is_dm() || marker.is_player_visible())
                .cloned()
                .collect();

            let mut game_sessions: Vec<_> = record.sessions.values().cloned().collect();
            game_sessions.sort_by(|a, b| b.sequence_number.cmp(&a.sequence_number));
            game_sessions.truncate(session_limit);

            let paths = game_sessions
                .iter()
                .filter_map(|session| record.paths.get(&session.id).cloned())
                .collect();

            let time_audit_log = match role {
                Role::Dm => Some(
                    record
                        .audit_log
                        .iter()
                        .rev()
                        .take(audit_limit)
                        .cloned()
                        .collect(),
                ),
                Role::Player => None,
            };

            CampaignSnapshot {
                campaign: record.info.clone(),
                revealed_tiles: record.tiles.values().cloned().collect(),
                map_markers,
                game_sessions,
                paths,
                time_audit_log,
            }
        })
    }

    /// Checks the caller against the addressed campaign and returns its id
    pub(crate) fn resolve(&self, ctx: &SessionContext, slug: &str) -> Result<CampaignId, ApiError> {
        ctx.authorize(slug)?;
        self.known_campaign(ctx)
    }

    pub(crate) fn resolve_dm(
        &self,
        ctx: &SessionContext,
        slug: &str,
        action: &str,
    ) -> Result<CampaignId, ApiError> {
        ctx.authorize_dm(slug, action)?;
        self.known_campaign(ctx)
    }

    /// Runs a store transaction and publishes what `fan_out` derives from its
    /// output before the campaign unlocks, so subscribers see events in
    /// commit order
    pub(crate) fn commit<T, F, E>(
        &self,
        campaign_id: CampaignId,
        transaction: F,
        fan_out: E,
    ) -> Result<T, ApiError>
    where
        F: FnOnce(&mut CampaignRecord) -> Result<T, ApiError>,
        E: FnOnce(&T) -> Vec<Outgoing>,
    {
        self.store.transaction_then(campaign_id, transaction, |output| {
            for (event, audience) in fan_out(output) {
                self.hub.publish(campaign_id, &event, audience);
            }
        })
    }

    pub(crate) fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn known_campaign(&self, ctx: &SessionContext) -> Result<CampaignId, ApiError> {
        match self.store.campaign_id(&ctx.campaign_slug) {
            Some(id) if id == ctx.campaign_id => Ok(id),
            Some(_) | None => {
                debug!(
                    "Rejecting request for unknown campaign '{}'",
                    ctx.campaign_slug
                );
                Err(ApiError::not_found("Campaign", &ctx.campaign_slug))
            }
        }
    }
}

/// Fails unless `coords` lies on the campaign's grid
pub(crate) fn ensure_on_grid(record: &CampaignRecord, coords: TileCoordinate) -> Result<(), ApiError> {
    if record.info.grid.contains(coords) {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "tile {} is outside the {}x{} grid",
            coords, record.info.grid.columns, record.info.grid.rows
        )))
    }
}
