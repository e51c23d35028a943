use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

use hexmap_client::CampaignApi;
use hexmap_shared::{
    AdjustTimeRequest, AdjustTimeResponse, ApiError, CampaignSnapshot, DmPathRequest,
    GameSession, MapMarker, MarkerDeleted, MarkerId, MarkerPatch, MovementResponse, NewMarker,
    PlayerMoveRequest, SessionDeleted, SessionId, StartSessionResponse, TeleportRequest,
    TileBatchRequest, TileBatchResponse,
};

use crate::LoopbackApi;

/// Holds every response back after the server has handled the request,
/// until [`release`](Self::release)
pub struct ResponseGate {
    gate: Arc<Semaphore>,
    arrived: Arc<Notify>,
    slot: Arc<Mutex<Option<Arc<Semaphore>>>>,
}

impl ResponseGate {
    /// Resolves once a request has been handled and its response is waiting
    pub async fn arrived(&self) {
        self.arrived.notified().await;
    }

    pub fn release(self) {
        self.slot.lock().take();
        self.gate.close();
    }
}

/// A [`LoopbackApi`] whose connection can be dropped and whose responses can
/// be held back
#[derive(Clone)]
pub struct FlakyApi {
    inner: LoopbackApi,
    offline: Arc<AtomicBool>,
    rejected: Arc<AtomicUsize>,
    gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
    arrived: Arc<Notify>,
}

impl FlakyApi {
    pub fn new(inner: LoopbackApi) -> Self {
        Self {
            inner,
            offline: Arc::new(AtomicBool::new(false)),
            rejected: Arc::new(AtomicUsize::new(0)),
            gate: Arc::new(Mutex::new(None)),
            arrived: Arc::new(Notify::new()),
        }
    }

    pub fn loopback(&self) -> &LoopbackApi {
        &self.inner
    }

    /// While offline every call fails with a transport error before reaching
    /// the server
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Calls refused while offline
    pub fn rejected_count(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    pub fn hold_responses(&self) -> ResponseGate {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock() = Some(gate.clone());
        ResponseGate {
            gate,
            arrived: self.arrived.clone(),
            slot: self.gate.clone(),
        }
    }

    fn connection(&self) -> Result<(), ApiError> {
        if self.offline.load(Ordering::SeqCst) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(ApiError::transport("connection to the map server dropped"));
        }
        Ok(())
    }

    async fn deliver<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            self.arrived.notify_one();
            // a closed gate lets everything through
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        result
    }
}

#[async_trait]
impl CampaignApi for FlakyApi {
    async fn campaign_snapshot(&self, slug: &str) -> Result<CampaignSnapshot, ApiError> {
        self.connection()?;
        let result = self.inner.campaign_snapshot(slug).await;
        self.deliver(result).await
    }

    async fn tiles_batch(
        &self,
        slug: &str,
        request: TileBatchRequest,
    ) -> Result<TileBatchResponse, ApiError> {
        self.connection()?;
        let result = self.inner.tiles_batch(slug, request).await;
        self.deliver(result).await
    }

    async fn create_marker(&self, slug: &str, marker: NewMarker) -> Result<MapMarker, ApiError> {
        self.connection()?;
        let result = self.inner.create_marker(slug, marker).await;
        self.deliver(result).await
    }

    async fn update_marker(
        &self,
        slug: &str,
        id: MarkerId,
        patch: MarkerPatch,
    ) -> Result<MapMarker, ApiError> {
        self.connection()?;
        let result = self.inner.update_marker(slug, id, patch).await;
        self.deliver(result).await
    }

    async fn delete_marker(&self, slug: &str, id: MarkerId) -> Result<MarkerDeleted, ApiError> {
        self.connection()?;
        let result = self.inner.delete_marker(slug, id).await;
        self.deliver(result).await
    }

    async fn start_session(&self, slug: &str) -> Result<StartSessionResponse, ApiError> {
        self.connection()?;
        let result = self.inner.start_session(slug).await;
        self.deliver(result).await
    }

    async fn end_session(&self, slug: &str, id: SessionId) -> Result<GameSession, ApiError> {
        self.connection()?;
        let result = self.inner.end_session(slug, id).await;
        self.deliver(result).await
    }

    async fn delete_session(
        &self,
        slug: &str,
        id: SessionId,
    ) -> Result<SessionDeleted, ApiError> {
        self.connection()?;
        let result = self.inner.delete_session(slug, id).await;
        self.deliver(result).await
    }

    async fn player_move(
        &self,
        slug: &str,
        request: PlayerMoveRequest,
    ) -> Result<MovementResponse, ApiError> {
        self.connection()?;
        let result = self.inner.player_move(slug, request).await;
        self.deliver(result).await
    }

    async fn dm_teleport(
        &self,
        slug: &str,
        request: TeleportRequest,
    ) -> Result<MovementResponse, ApiError> {
        self.connection()?;
        let result = self.inner.dm_teleport(slug, request).await;
        self.deliver(result).await
    }

    async fn dm_path(
        &self,
        slug: &str,
        request: DmPathRequest,
    ) -> Result<MovementResponse, ApiError> {
        self.connection()?;
        let result = self.inner.dm_path(slug, request).await;
        self.deliver(result).await
    }

    async fn adjust_time(
        &self,
        slug: &str,
        request: AdjustTimeRequest,
    ) -> Result<AdjustTimeResponse, ApiError> {
        self.connection()?;
        let result = self.inner.adjust_time(slug, request).await;
        self.deliver(result).await
    }
}
