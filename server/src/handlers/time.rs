use log::info;

use hexmap_shared::{
    game_time_eq, normalize_text, AdjustTimeRequest, AdjustTimeResponse, ApiError, Audience,
    AuditKind, CampaignEvent, GameDays, TimeAuditEntry, TimeUpdated, GAME_TIME_EPSILON,
};

use crate::{server::Outgoing, MapServer, SessionContext};

impl MapServer {
    /// Moves the campaign clock by a manual delta, leaving an audit entry
    pub fn adjust_time(
        &self,
        ctx: &SessionContext,
        slug: &str,
        request: AdjustTimeRequest,
    ) -> Result<AdjustTimeResponse, ApiError> {
        let campaign_id = self.resolve_dm(ctx, slug, "adjust game time")?;

        if !request.delta.is_finite() {
            return Err(ApiError::validation("time delta must be a number"));
        }
        if request.delta == 0.0 {
            return Err(ApiError::validation("time delta cannot be zero"));
        }
        let now = Self::now();

        let response = self.commit(
            campaign_id,
            |record| {
                let current = record.info.global_game_time;
                if let Some(expected) = request.expected_game_time {
                    if !game_time_eq(expected, current) {
                        return Err(ApiError::conflict(format!(
                            "game time is {} but the request expected {}",
                            current, expected
                        )));
                    }
                }

                let next = current + request.delta;
                if next < 0.0 {
                    return Err(ApiError::validation("cannot adjust time to a negative value"));
                }
                if let Some(active) = record.active_session_id() {
                    let last_step = record.paths.get(&active).and_then(|path| path.last_game_time());
                    if let Some(last_step) = last_step {
                        if next + GAME_TIME_EPSILON < last_step {
                            return Err(ApiError::validation(format!(
                                "cannot rewind time before the last recorded step at {}",
                                last_step
                            )));
                        }
                    }
                    if let Some(session) = record.sessions.get_mut(&active) {
                        session.last_activity_at = now;
                    }
                }

                let audit_entry = TimeAuditEntry {
                    id: self.store.next_audit_id(),
                    timestamp: now,
                    kind: AuditKind::DmAdjust,
                    amount_days: request.delta,
                    actor_role: ctx.role,
                    notes: normalize_text(request.notes.as_deref()),
                };
                record.info.global_game_time = next;
                record.audit_log.push(audit_entry.clone());

                Ok(AdjustTimeResponse {
                    success: true,
                    global_game_time: next,
                    audit_entry,
                })
            },
            |response| time_fan_out(response.global_game_time, &response.audit_entry),
        )?;

        info!(
            "Campaign {} time adjusted by {} to {}",
            campaign_id, request.delta, response.global_game_time
        );

        Ok(response)
    }
}

/// `time:updated` carries the audit entry for the DM only
pub(super) fn time_fan_out(global_game_time: GameDays, entry: &TimeAuditEntry) -> Vec<Outgoing> {
    let update = TimeUpdated {
        global_game_time,
        audit_entry: Some(entry.clone()),
    };
    vec![
        (
            CampaignEvent::TimeUpdated(update.without_audit()),
            Audience::Player,
        ),
        (CampaignEvent::TimeUpdated(update), Audience::Dm),
    ]
}
