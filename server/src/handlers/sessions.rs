use log::info;

use hexmap_shared::{
    ApiError, Audience, CampaignEvent, GameSession, Path, SessionDeleted, SessionId,
    SessionStarted, StartSessionResponse,
};

use crate::{MapServer, SessionContext};

impl MapServer {
    /// Opens the next numbered session together with its empty path. Fails
    /// with a conflict while another session is still active.
    pub fn start_session(
        &self,
        ctx: &SessionContext,
        slug: &str,
    ) -> Result<StartSessionResponse, ApiError> {
        let campaign_id = self.resolve_dm(ctx, slug, "start a session")?;
        let now = Self::now();

        let response = self.commit(
            campaign_id,
            |record| {
                if let Some(active) = record.active_session() {
                    return Err(ApiError::conflict(format!(
                        "'{}' is still active",
                        active.name
                    )));
                }

                let sequence_number = record.next_session_sequence();
                let session = GameSession {
                    id: self.store.next_session_id(),
                    campaign_id,
                    sequence_number,
                    name: format!("Session {}", sequence_number),
                    start_game_time: record.info.global_game_time,
                    end_game_time: None,
                    started_at: now,
                    ended_at: None,
                    is_active: true,
                    last_activity_at: now,
                };
                let path = Path::empty(self.store.next_path_id(), session.id);

                record.sessions.insert(session.id, session.clone());
                record.paths.insert(session.id, path.clone());

                Ok(StartSessionResponse { session, path })
            },
            |response| {
                let started = SessionStarted {
                    session: response.session.clone(),
                    path_id: Some(response.path.id),
                };
                vec![(CampaignEvent::SessionStarted(started), Audience::All)]
            },
        )?;

        info!(
            "Campaign {} started '{}'",
            campaign_id, response.session.name
        );

        Ok(response)
    }

    pub fn end_session(
        &self,
        ctx: &SessionContext,
        slug: &str,
        id: SessionId,
    ) -> Result<GameSession, ApiError> {
        let campaign_id = self.resolve_dm(ctx, slug, "end a session")?;
        let now = Self::now();

        let session = self.commit(
            campaign_id,
            |record| {
                let global_game_time = record.info.global_game_time;
                let session = record
                    .sessions
                    .get_mut(&id)
                    .ok_or_else(|| ApiError::not_found("Session", id))?;
                if !session.is_active {
                    return Err(ApiError::conflict(format!(
                        "'{}' has already ended",
                        session.name
                    )));
                }

                session.is_active = false;
                session.end_game_time = Some(global_game_time);
                session.ended_at = Some(now);
                session.last_activity_at = now;
                Ok(session.clone())
            },
            |session| vec![(CampaignEvent::SessionEnded(session.clone()), Audience::All)],
        )?;

        info!("Campaign {} ended '{}'", campaign_id, session.name);

        Ok(session)
    }

    /// Removes a session and its path. Active and ended sessions alike.
    pub fn delete_session(
        &self,
        ctx: &SessionContext,
        slug: &str,
        id: SessionId,
    ) -> Result<SessionDeleted, ApiError> {
        let campaign_id = self.resolve_dm(ctx, slug, "delete a session")?;

        self.commit(
            campaign_id,
            |record| {
                record
                    .sessions
                    .remove(&id)
                    .ok_or_else(|| ApiError::not_found("Session", id))?;
                record.paths.remove(&id);
                Ok(())
            },
            |_| vec![(CampaignEvent::SessionDeleted(SessionDeleted { id }), Audience::All)],
        )?;

        Ok(SessionDeleted { id })
    }
}
