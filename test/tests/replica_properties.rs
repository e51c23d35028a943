/// PROPERTY-BASED TESTS: replica merge and batching invariants
///
/// 1. No tile is ever in both revealed sets
/// 2. Applying any tile event twice leaves the same state as applying it once
/// 3. Whatever a DM does to tiles, once flushed the replica matches the server,
///    even when some flushes are refused on the way

use std::collections::BTreeSet;

use chrono::Utc;
use log::debug;
use proptest::prelude::*;

use hexmap_client::LocalReplica;
use hexmap_shared::{CampaignEvent, RevealedTile, Role, TileCoordinate, ToggledTile};
use hexmap_test::{coords, init_logging, TestClient, TestServer};

#[derive(Clone, Debug)]
enum TileEvent {
    Revealed(u8, bool),
    Hidden(u8),
    Toggled(u8, bool),
}

#[derive(Clone, Debug)]
enum TileOp {
    Reveal(u8, bool),
    Hide(u8),
    Toggle(u8, bool),
    ToggleOffThenHide(u8),
}

#[derive(Clone, Debug)]
struct Round {
    ops: Vec<TileOp>,
    offline: bool,
}

// six tiles keep collisions frequent
fn tile(index: u8) -> TileCoordinate {
    coords(i32::from(index % 3), i32::from(index / 3))
}

fn tile_event_strategy() -> impl Strategy<Value = TileEvent> {
    prop_oneof![
        (0u8..6, any::<bool>()).prop_map(|(index, always)| TileEvent::Revealed(index, always)),
        (0u8..6).prop_map(TileEvent::Hidden),
        (0u8..6, any::<bool>()).prop_map(|(index, always)| TileEvent::Toggled(index, always)),
    ]
}

fn tile_op_strategy() -> impl Strategy<Value = TileOp> {
    prop_oneof![
        (0u8..6, any::<bool>()).prop_map(|(index, always)| TileOp::Reveal(index, always)),
        (0u8..6).prop_map(TileOp::Hide),
        (0u8..6, any::<bool>()).prop_map(|(index, always)| TileOp::Toggle(index, always)),
        (0u8..6).prop_map(TileOp::ToggleOffThenHide),
    ]
}

fn round_strategy() -> impl Strategy<Value = Round> {
    (
        prop::collection::vec(tile_op_strategy(), 0..12),
        prop::bool::weighted(0.3),
    )
        .prop_map(|(ops, offline)| Round { ops, offline })
}

fn to_campaign_event(event: &TileEvent) -> CampaignEvent {
    match *event {
        TileEvent::Revealed(index, always) => CampaignEvent::TilesRevealed(vec![
            RevealedTile::new(tile(index), always, Utc::now()),
        ]),
        TileEvent::Hidden(index) => CampaignEvent::TilesHidden(vec![tile(index)]),
        TileEvent::Toggled(index, always) => {
            let coords = tile(index);
            CampaignEvent::TilesToggled(vec![ToggledTile {
                x: coords.x,
                y: coords.y,
                always_revealed: always,
            }])
        }
    }
}

type TileSets = (BTreeSet<TileCoordinate>, BTreeSet<TileCoordinate>);

fn tile_sets(replica: &LocalReplica) -> TileSets {
    (
        replica.revealed_tiles().copied().collect(),
        replica.always_revealed_tiles().copied().collect(),
    )
}

proptest! {
    /// Test that a tile is never both revealed and always revealed
    #[test]
    fn prop_tile_states_stay_exclusive(events in prop::collection::vec(tile_event_strategy(), 0..40)) {
        let mut replica = LocalReplica::new(Role::Dm);
        for event in &events {
            replica.apply(&to_campaign_event(event));
            let (revealed, always) = tile_sets(&replica);
            prop_assert!(revealed.is_disjoint(&always));
        }
    }

    /// Test that a repeated event changes nothing the first one didn't
    #[test]
    fn prop_events_are_idempotent(events in prop::collection::vec(tile_event_strategy(), 0..40)) {
        let mut once = LocalReplica::new(Role::Player);
        let mut twice = LocalReplica::new(Role::Player);

        for event in &events {
            let event = to_campaign_event(event);
            once.apply(&event);
            twice.apply(&event);
            let repeat = twice.apply(&event);
            prop_assert!(repeat.is_empty());
        }

        prop_assert_eq!(tile_sets(&once), tile_sets(&twice));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Test that flushed batches leave the DM's replica equal to the server
    #[test]
    fn prop_flushed_batches_match_the_server(
        rounds in prop::collection::vec(round_strategy(), 1..5)
    ) {
        init_logging();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        runtime.block_on(async {
            let server = TestServer::new();
            let dm = TestClient::connect(&server, Role::Dm).await;

            for round in &rounds {
                for op in &round.ops {
                    match *op {
                        TileOp::Reveal(index, always) => {
                            dm.tiles().reveal_tiles(&[tile(index)], always);
                        }
                        TileOp::Hide(index) => {
                            dm.tiles().hide_tile(tile(index));
                        }
                        TileOp::Toggle(index, always) => {
                            dm.tiles().toggle_always_revealed(&[tile(index)], always);
                        }
                        TileOp::ToggleOffThenHide(index) => {
                            dm.tiles().toggle_always_revealed(&[tile(index)], false);
                            dm.tiles().hide_tile(tile(index));
                        }
                    }
                }
                dm.api().set_offline(round.offline);
                let flushed = dm.tiles().flush().await;
                if !round.offline {
                    flushed.unwrap();
                }
                dm.pump();
            }

            dm.api().set_offline(false);
            dm.tiles().flush().await.unwrap();
            dm.pump();

            let stored: TileSets = server
                .server()
                .campaign_snapshot(&server.context(Role::Dm), server.slug())
                .unwrap()
                .revealed_tiles
                .iter()
                .fold(TileSets::default(), |(mut revealed, mut always), row| {
                    if row.always_revealed {
                        always.insert(row.coords());
                    } else {
                        revealed.insert(row.coords());
                    }
                    (revealed, always)
                });
            debug!(
                "{} batch requests for {} rounds",
                dm.api().loopback().batch_requests().len(),
                rounds.len()
            );

            assert_eq!(dm.with_replica(tile_sets), stored);
            assert!(!dm.tiles().has_pending());
        });
    }
}
