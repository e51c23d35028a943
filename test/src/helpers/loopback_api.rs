use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};

use hexmap_client::CampaignApi;
use hexmap_server::{MapServer, SessionContext};
use hexmap_shared::{
    AdjustTimeRequest, AdjustTimeResponse, ApiError, CampaignSnapshot, DmPathRequest,
    GameSession, MapMarker, MarkerDeleted, MarkerId, MarkerPatch, MovementResponse, NewMarker,
    PlayerMoveRequest, SessionDeleted, SessionId, StartSessionResponse, TeleportRequest,
    TileBatchRequest, TileBatchResponse,
};

/// Calls a [`MapServer`] in-process as one fixed caller. Every request, response
/// and error goes through its JSON form on the way.
#[derive(Clone)]
pub struct LoopbackApi {
    server: Arc<MapServer>,
    ctx: SessionContext,
    requests: Arc<AtomicUsize>,
    batches: Arc<Mutex<Vec<TileBatchRequest>>>,
}

impl LoopbackApi {
    pub fn new(server: Arc<MapServer>, ctx: SessionContext) -> Self {
        Self {
            server,
            ctx,
            requests: Arc::new(AtomicUsize::new(0)),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Requests that reached the server, of any kind
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Every tile batch that reached the server, in arrival order
    pub fn batch_requests(&self) -> Vec<TileBatchRequest> {
        self.batches.lock().clone()
    }

    async fn call<Q, R, F>(&self, request: Q, handler: F) -> Result<R, ApiError>
    where
        Q: Serialize + DeserializeOwned,
        R: Serialize + DeserializeOwned,
        F: FnOnce(&MapServer, &SessionContext, Q) -> Result<R, ApiError>,
    {
        tokio::task::yield_now().await;
        self.requests.fetch_add(1, Ordering::SeqCst);

        let result = handler(&self.server, &self.ctx, over_the_wire(request));
        match result {
            Ok(response) => Ok(over_the_wire(response)),
            Err(error) => Err(over_the_wire(error)),
        }
    }
}

fn over_the_wire<T: Serialize + DeserializeOwned>(value: T) -> T {
    let text = serde_json::to_string(&value).expect("value should encode");
    serde_json::from_str(&text).expect("value should decode from its own encoding")
}

#[async_trait]
impl CampaignApi for LoopbackApi {
    async fn campaign_snapshot(&self, slug: &str) -> Result<CampaignSnapshot, ApiError> {
        self.call((), |server, ctx, ()| server.campaign_snapshot(ctx, slug))
            .await
    }

    async fn tiles_batch(
        &self,
        slug: &str,
        request: TileBatchRequest,
    ) -> Result<TileBatchResponse, ApiError> {
        self.batches.lock().push(request.clone());
        self.call(request, |server, ctx, request| {
            server.tiles_batch(ctx, slug, request)
        })
        .await
    }

    async fn create_marker(&self, slug: &str, marker: NewMarker) -> Result<MapMarker, ApiError> {
        self.call(marker, |server, ctx, marker| {
            server.create_marker(ctx, slug, marker)
        })
        .await
    }

    async fn update_marker(
        &self,
        slug: &str,
        id: MarkerId,
        patch: MarkerPatch,
    ) -> Result<MapMarker, ApiError> {
        self.call(patch, |server, ctx, patch| {
            server.update_marker(ctx, slug, id, patch)
        })
        .await
    }

    async fn delete_marker(&self, slug: &str, id: MarkerId) -> Result<MarkerDeleted, ApiError> {
        self.call((), |server, ctx, ()| server.delete_marker(ctx, slug, id))
            .await
    }

    async fn start_session(&self, slug: &str) -> Result<StartSessionResponse, ApiError> {
        self.call((), |server, ctx, ()| server.start_session(ctx, slug))
            .await
    }

    async fn end_session(&self, slug: &str, id: SessionId) -> Result<GameSession, ApiError> {
        self.call((), |server, ctx, ()| server.end_session(ctx, slug, id))
            .await
    }

    async fn delete_session(
        &self,
        slug: &str,
        id: SessionId,
    ) -> Result<SessionDeleted, ApiError> {
        self.call((), |server, ctx, ()| server.delete_session(ctx, slug, id))
            .await
    }

    async fn player_move(
        &self,
        slug: &str,
        request: PlayerMoveRequest,
    ) -> Result<MovementResponse, ApiError> {
        self.call(request, |server, ctx, request| {
            server.player_move(ctx, slug, request)
        })
        .await
    }

    async fn dm_teleport(
        &self,
        slug: &str,
        request: TeleportRequest,
    ) -> Result<MovementResponse, ApiError> {
        self.call(request, |server, ctx, request| {
            server.dm_teleport(ctx, slug, request)
        })
        .await
    }

    async fn dm_path(
        &self,
        slug: &str,
        request: DmPathRequest,
    ) -> Result<MovementResponse, ApiError> {
        self.call(request, |server, ctx, request| {
            server.dm_path(ctx, slug, request)
        })
        .await
    }

    async fn adjust_time(
        &self,
        slug: &str,
        request: AdjustTimeRequest,
    ) -> Result<AdjustTimeResponse, ApiError> {
        self.call(request, |server, ctx, request| {
            server.adjust_time(ctx, slug, request)
        })
        .await
    }
}
