use log::debug;

use hexmap_shared::{
    normalize_text, ApiError, Audience, CampaignEvent, MapMarker, MarkerDeleted, MarkerId,
    MarkerKind, MarkerPatch, NewMarker, Role,
};

use crate::{
    server::{ensure_on_grid, Outgoing},
    MapServer, SessionContext,
};

impl MapServer {
    pub fn create_marker(
        &self,
        ctx: &SessionContext,
        slug: &str,
        new_marker: NewMarker,
    ) -> Result<MapMarker, ApiError> {
        let campaign_id = self.resolve(ctx, slug)?;

        if ctx.role == Role::Player && new_marker.kind != MarkerKind::Note {
            return Err(ApiError::authorization("players may only create notes"));
        }

        let title = normalize_text(new_marker.title.as_deref());
        if new_marker.kind == MarkerKind::Poi && title.is_none() {
            return Err(ApiError::validation("a point of interest needs a title"));
        }
        let visible_to_players = match new_marker.kind {
            MarkerKind::Note => true,
            MarkerKind::Poi => new_marker.visible_to_players.unwrap_or(true),
        };
        let coords = new_marker.coords();
        let now = Self::now();

        let marker = self.commit(
            campaign_id,
            |record| {
                ensure_on_grid(record, coords)?;
                if record.marker_at(coords).is_some() {
                    return Err(ApiError::conflict(format!(
                        "a marker already exists at {}",
                        coords
                    )));
                }

                let marker = MapMarker {
                    id: self.store.next_marker_id(),
                    x: coords.x,
                    y: coords.y,
                    kind: new_marker.kind,
                    title,
                    content: normalize_text(new_marker.content.as_deref()),
                    author_role: ctx.role,
                    visible_to_players,
                    image_path: normalize_text(new_marker.image_path.as_deref()),
                    created_at: now,
                    updated_at: now,
                };
                record.markers.insert(marker.id, marker.clone());
                Ok(marker)
            },
            |marker| {
                vec![(
                    CampaignEvent::MarkerCreated(marker.clone()),
                    marker_audience(marker),
                )]
            },
        )?;

        Ok(marker)
    }

    /// Patches a marker. When the patch flips player visibility, players see
    /// the marker appear or disappear while the DM sees an update.
    pub fn update_marker(
        &self,
        ctx: &SessionContext,
        slug: &str,
        id: MarkerId,
        patch: MarkerPatch,
    ) -> Result<MapMarker, ApiError> {
        let campaign_id = self.resolve(ctx, slug)?;

        if patch.is_empty() {
            return Err(ApiError::validation("marker update changes nothing"));
        }
        if ctx.role == Role::Player && patch.kind == Some(MarkerKind::Poi) {
            return Err(ApiError::authorization(
                "players may not turn markers into points of interest",
            ));
        }
        let now = Self::now();

        let (before, after) = self.commit(
            campaign_id,
            |record| {
                let marker = record
                    .markers
                    .get_mut(&id)
                    .ok_or_else(|| ApiError::not_found("Marker", id))?;
                if ctx.role == Role::Player && marker.author_role != Role::Player {
                    return Err(ApiError::authorization(
                        "players may only edit their own markers",
                    ));
                }

                let before = marker.clone();
                marker.apply_patch(&patch, now);
                if marker.kind == MarkerKind::Poi && marker.title.is_none() {
                    return Err(ApiError::validation("a point of interest needs a title"));
                }
                Ok((before, marker.clone()))
            },
            |(before, after)| visibility_fan_out(before, after),
        )?;

        Ok(after)
    }

    pub fn delete_marker(
        &self,
        ctx: &SessionContext,
        slug: &str,
        id: MarkerId,
    ) -> Result<MarkerDeleted, ApiError> {
        let campaign_id = self.resolve(ctx, slug)?;

        let removed = self.commit(
            campaign_id,
            |record| {
                let marker = record
                    .markers
                    .get(&id)
                    .ok_or_else(|| ApiError::not_found("Marker", id))?;
                if ctx.role == Role::Player && marker.author_role != Role::Player {
                    return Err(ApiError::authorization(
                        "players may only delete their own markers",
                    ));
                }
                record
                    .markers
                    .remove(&id)
                    .ok_or_else(|| ApiError::not_found("Marker", id))
            },
            |removed| {
                vec![(
                    CampaignEvent::MarkerDeleted(MarkerDeleted::of(removed)),
                    marker_audience(removed),
                )]
            },
        )?;

        Ok(MarkerDeleted::of(&removed))
    }
}

fn marker_audience(marker: &MapMarker) -> Audience {
    if marker.is_player_visible() {
        Audience::All
    } else {
        Audience::Dm
    }
}

fn visibility_fan_out(before: &MapMarker, after: &MapMarker) -> Vec<Outgoing> {
    let updated = CampaignEvent::MarkerUpdated(after.clone());

    match (before.is_player_visible(), after.is_player_visible()) {
        (true, true) => vec![(updated, Audience::All)],
        (false, false) => vec![(updated, Audience::Dm)],
        (true, false) => {
            debug!("Marker {} hidden from players", after.id);
            vec![
                (updated, Audience::Dm),
                (
                    CampaignEvent::MarkerDeleted(MarkerDeleted::of(after)),
                    Audience::Player,
                ),
            ]
        }
        (false, true) => {
            debug!("Marker {} revealed to players", after.id);
            vec![
                (updated, Audience::Dm),
                (CampaignEvent::MarkerCreated(after.clone()), Audience::Player),
            ]
        }
    }
}
