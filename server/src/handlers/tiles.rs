use std::collections::BTreeSet;

use log::debug;

use hexmap_shared::{
    ApiError, Audience, BatchCounts, CampaignEvent, RevealedTile, TileBatchKind,
    TileBatchRequest, TileBatchResponse, TileCoordinate, ToggledTile,
};

use crate::{
    server::{ensure_on_grid, Outgoing},
    MapServer, SessionContext,
};

impl MapServer {
    /// Applies one batched tile mutation.
    ///
    /// Counts in the response are rows actually affected: revealing a tile
    /// that already has a row, hiding an always-revealed tile and toggling a
    /// tile to the flag it already has all leave the store untouched.
    pub fn tiles_batch(
        &self,
        ctx: &SessionContext,
        slug: &str,
        request: TileBatchRequest,
    ) -> Result<TileBatchResponse, ApiError> {
        let campaign_id = self.resolve_dm(ctx, slug, "change tile visibility")?;

        if request.tiles.is_empty() {
            return Err(ApiError::validation("tile batch is empty"));
        }
        if request.tiles.len() > self.config.max_batch_tiles {
            return Err(ApiError::validation(format!(
                "tile batch of {} exceeds the limit of {}",
                request.tiles.len(),
                self.config.max_batch_tiles
            )));
        }
        let toggle_to = match (request.kind, request.always_revealed) {
            (TileBatchKind::ToggleAlwaysRevealed, None) => {
                return Err(ApiError::validation(
                    "toggle-always-revealed requires alwaysRevealed",
                ))
            }
            (_, flag) => flag.unwrap_or(false),
        };

        let tiles: BTreeSet<TileCoordinate> = request.tiles.iter().copied().collect();
        let now = Self::now();

        let response = self.commit(
            campaign_id,
            |record| {
                for coords in &tiles {
                    ensure_on_grid(record, *coords)?;
                }

                let mut response = TileBatchResponse {
                    success: true,
                    operation: request.kind,
                    processed: tiles.len(),
                    result: BatchCounts::Hide { hidden: 0 },
                    revealed_tiles: Vec::new(),
                    hidden_tiles: Vec::new(),
                    toggled_tiles: Vec::new(),
                };

                match request.kind {
                    TileBatchKind::Reveal => {
                        let mut existing = 0;
                        for coords in &tiles {
                            if record.tiles.contains_key(coords) {
                                existing += 1;
                                continue;
                            }
                            let tile = RevealedTile::new(*coords, toggle_to, now);
                            record.tiles.insert(*coords, tile.clone());
                            response.revealed_tiles.push(tile);
                        }
                        response.result = BatchCounts::Reveal {
                            revealed: response.revealed_tiles.len(),
                            existing,
                        };
                    }
                    TileBatchKind::Hide => {
                        for coords in &tiles {
                            let removable = record
                                .tiles
                                .get(coords)
                                .is_some_and(|tile| !tile.always_revealed);
                            if removable {
                                record.tiles.remove(coords);
                                response.hidden_tiles.push(*coords);
                            }
                        }
                        response.result = BatchCounts::Hide {
                            hidden: response.hidden_tiles.len(),
                        };
                    }
                    TileBatchKind::ToggleAlwaysRevealed => {
                        let (mut updated, mut inserted) = (0, 0);
                        for coords in &tiles {
                            match record.tiles.get_mut(coords) {
                                Some(tile) if tile.always_revealed != toggle_to => {
                                    tile.always_revealed = toggle_to;
                                    updated += 1;
                                }
                                Some(_) => continue,
                                None if toggle_to => {
                                    record
                                        .tiles
                                        .insert(*coords, RevealedTile::new(*coords, true, now));
                                    inserted += 1;
                                }
                                None => continue,
                            }
                            response.toggled_tiles.push(ToggledTile {
                                x: coords.x,
                                y: coords.y,
                                always_revealed: toggle_to,
                            });
                        }
                        response.result = BatchCounts::Toggle { updated, inserted };
                    }
                }

                Ok(response)
            },
            batch_fan_out,
        )?;

        debug!(
            "Tile batch '{}' on campaign {}: {:?}",
            request.kind.as_str(),
            campaign_id,
            response.result
        );

        Ok(response)
    }
}

/// Every batch kind reaches all roles, and only when a row changed
fn batch_fan_out(response: &TileBatchResponse) -> Vec<Outgoing> {
    let event = if !response.revealed_tiles.is_empty() {
        CampaignEvent::TilesRevealed(response.revealed_tiles.clone())
    } else if !response.hidden_tiles.is_empty() {
        CampaignEvent::TilesHidden(response.hidden_tiles.clone())
    } else if !response.toggled_tiles.is_empty() {
        CampaignEvent::TilesToggled(response.toggled_tiles.clone())
    } else {
        return Vec::new();
    };
    vec![(event, Audience::All)]
}
