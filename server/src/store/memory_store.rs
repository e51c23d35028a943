use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use log::info;
use parking_lot::{Mutex, RwLock};

use hexmap_shared::{
    ApiError, AuditEntryId, CampaignId, CampaignInfo, GameDays, HexGrid, MarkerId, PathId,
    SessionId, TileCoordinate,
};

use super::CampaignRecord;

/// What the campaign collaborator hands over when a campaign is created
#[derive(Clone, Debug)]
pub struct CampaignSeed {
    pub name: String,
    pub slug: String,
    pub grid: HexGrid,
    pub global_game_time: GameDays,
    pub party_token_position: Option<TileCoordinate>,
}

impl CampaignSeed {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            grid: HexGrid::default(),
            global_game_time: 0.0,
            party_token_position: None,
        }
    }
}

/// Row id counters, shared by every campaign
#[derive(Debug)]
struct IdCounters {
    campaign: AtomicI64,
    marker: AtomicI64,
    session: AtomicI64,
    path: AtomicI64,
    audit: AtomicI64,
}

impl IdCounters {
    fn new() -> Self {
        Self {
            campaign: AtomicI64::new(1),
            marker: AtomicI64::new(1),
            session: AtomicI64::new(1),
            path: AtomicI64::new(1),
            audit: AtomicI64::new(1),
        }
    }
}

/// In-process authoritative store.
///
/// Each campaign sits behind its own lock, so transactions on one campaign are
/// serialized while different campaigns proceed independently.
pub struct MemoryStore {
    campaigns: RwLock<HashMap<CampaignId, Arc<Mutex<CampaignRecord>>>>,
    slugs: RwLock<HashMap<String, CampaignId>>,
    ids: IdCounters,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            campaigns: RwLock::new(HashMap::new()),
            slugs: RwLock::new(HashMap::new()),
            ids: IdCounters::new(),
        }
    }

    /// Registers a new campaign. Slugs are unique.
    pub fn insert_campaign(&self, seed: CampaignSeed) -> Result<CampaignId, ApiError> {
        if seed.grid.columns <= 0 || seed.grid.rows <= 0 {
            return Err(ApiError::validation("hex grid must have at least one tile"));
        }
        if let Some(position) = seed.party_token_position {
            if !seed.grid.contains(position) {
                return Err(ApiError::validation(format!(
                    "party position {} is outside the grid",
                    position
                )));
            }
        }

        let mut slugs = self.slugs.write();
        if slugs.contains_key(&seed.slug) {
            return Err(ApiError::conflict(format!(
                "campaign slug '{}' is taken",
                seed.slug
            )));
        }

        let id = CampaignId::new(self.ids.campaign.fetch_add(1, Ordering::Relaxed));
        let info = CampaignInfo {
            id,
            name: seed.name,
            slug: seed.slug.clone(),
            grid: seed.grid,
            global_game_time: seed.global_game_time,
            party_token_position: seed.party_token_position,
        };

        self.campaigns
            .write()
            .insert(id, Arc::new(Mutex::new(CampaignRecord::new(info))));
        slugs.insert(seed.slug.clone(), id);

        info!("Registered campaign {} as '{}'", id, seed.slug);
        Ok(id)
    }

    pub fn campaign_id(&self, slug: &str) -> Option<CampaignId> {
        self.slugs.read().get(slug).copied()
    }

    /// Runs `f` against a private copy of the campaign. The copy replaces the
    /// stored record only if `f` returns `Ok`, so a failed transaction leaves
    /// no trace.
    pub fn transaction<T, F>(&self, campaign_id: CampaignId, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut CampaignRecord) -> Result<T, ApiError>,
    {
        self.transaction_then(campaign_id, f, |_| {})
    }

    /// Same as [`transaction`](Self::transaction), but `after_commit` runs
    /// before the campaign lock is released. Whatever it announces comes out
    /// in commit order.
    pub fn transaction_then<T, F, A>(
        &self,
        campaign_id: CampaignId,
        f: F,
        after_commit: A,
    ) -> Result<T, ApiError>
    where
        F: FnOnce(&mut CampaignRecord) -> Result<T, ApiError>,
        A: FnOnce(&T),
    {
        let cell = self.cell(campaign_id)?;
        let mut committed = cell.lock();

        let mut draft = committed.clone();
        let output = f(&mut draft)?;
        *committed = draft;
        after_commit(&output);

        Ok(output)
    }

    /// Read-only access to the current committed record
    pub fn read<T, F>(&self, campaign_id: CampaignId, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&CampaignRecord) -> T,
    {
        let cell = self.cell(campaign_id)?;
        let record = cell.lock();
        Ok(f(&record))
    }

    pub fn next_marker_id(&self) -> MarkerId {
        MarkerId::new(self.ids.marker.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_session_id(&self) -> SessionId {
        SessionId::new(self.ids.session.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_path_id(&self) -> PathId {
        PathId::new(self.ids.path.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_audit_id(&self) -> AuditEntryId {
        AuditEntryId::new(self.ids.audit.fetch_add(1, Ordering::Relaxed))
    }

    fn cell(&self, campaign_id: CampaignId) -> Result<Arc<Mutex<CampaignRecord>>, ApiError> {
        self.campaigns
            .read()
            .get(&campaign_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Campaign", campaign_id))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
