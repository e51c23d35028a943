use async_trait::async_trait;

use hexmap_shared::{
    AdjustTimeRequest, AdjustTimeResponse, ApiError, CampaignSnapshot, DmPathRequest,
    GameSession, MapMarker, MarkerDeleted, MarkerId, MarkerPatch, MovementResponse, NewMarker,
    PlayerMoveRequest, SessionDeleted, SessionId, StartSessionResponse, TeleportRequest,
    TileBatchRequest, TileBatchResponse,
};

/// The request/response half of a campaign connection. Implementations carry
/// the caller's identity themselves; `slug` only addresses the campaign.
#[async_trait]
pub trait CampaignApi: Send + Sync {
    async fn campaign_snapshot(&self, slug: &str) -> Result<CampaignSnapshot, ApiError>;

    async fn tiles_batch(
        &self,
        slug: &str,
        request: TileBatchRequest,
    ) -> Result<TileBatchResponse, ApiError>;

    async fn create_marker(&self, slug: &str, marker: NewMarker) -> Result<MapMarker, ApiError>;

    async fn update_marker(
        &self,
        slug: &str,
        id: MarkerId,
        patch: MarkerPatch,
    ) -> Result<MapMarker, ApiError>;

    async fn delete_marker(&self, slug: &str, id: MarkerId) -> Result<MarkerDeleted, ApiError>;

    async fn start_session(&self, slug: &str) -> Result<StartSessionResponse, ApiError>;

    async fn end_session(&self, slug: &str, id: SessionId) -> Result<GameSession, ApiError>;

    async fn delete_session(&self, slug: &str, id: SessionId)
        -> Result<SessionDeleted, ApiError>;

    async fn player_move(
        &self,
        slug: &str,
        request: PlayerMoveRequest,
    ) -> Result<MovementResponse, ApiError>;

    async fn dm_teleport(
        &self,
        slug: &str,
        request: TeleportRequest,
    ) -> Result<MovementResponse, ApiError>;

    async fn dm_path(
        &self,
        slug: &str,
        request: DmPathRequest,
    ) -> Result<MovementResponse, ApiError>;

    async fn adjust_time(
        &self,
        slug: &str,
        request: AdjustTimeRequest,
    ) -> Result<AdjustTimeResponse, ApiError>;
}
