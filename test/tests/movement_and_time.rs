use hexmap_client::ClientError;
use hexmap_shared::{ApiError, AuditKind, PathStep, Role};
use hexmap_test::{coords, init_logging, TestClient, TestServer};

#[tokio::test(start_paused = true)]
async fn test_stale_time_adjust_is_rejected_and_rolled_back() {
    init_logging();
    let server = TestServer::with_party(coords(0, 0), 10.0);
    let first_dm = TestClient::connect(&server, Role::Dm).await;
    let second_dm = TestClient::connect(&server, Role::Dm).await;

    second_dm
        .client()
        .adjust_time(1.0, Some("long rest".to_string()))
        .await
        .expect("second dm adjusts");

    // the first DM still shows day 10
    let error = match first_dm.client().adjust_time(2.0, None).await {
        Err(ClientError::Api(error)) => error,
        other => panic!("stale adjust should be rejected, got {:?}", other),
    };
    assert!(error.requires_resync());
    assert_eq!(first_dm.with_replica(|replica| replica.game_time()), 10.0);

    first_dm.pump();
    first_dm.with_replica(|replica| {
        assert_eq!(replica.game_time(), 11.0);
        let audit = replica.audit_log().expect("dm audit");
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].notes.as_deref(), Some("long rest"));
    });

    first_dm
        .client()
        .adjust_time(2.0, None)
        .await
        .expect("adjust after catching up");
    assert_eq!(first_dm.with_replica(|replica| replica.game_time()), 13.0);
}

#[tokio::test(start_paused = true)]
async fn test_time_cannot_rewind_past_the_last_step() {
    init_logging();
    let server = TestServer::with_party(coords(0, 0), 0.0);
    let dm = TestClient::connect(&server, Role::Dm).await;
    dm.client().start_session().await.expect("session");
    dm.client()
        .teleport(coords(1, 0), 3.0)
        .await
        .expect("teleport");

    let rewind = dm.client().adjust_time(-2.0, None).await;
    assert!(matches!(
        rewind,
        Err(ClientError::Api(ApiError::Validation { .. }))
    ));
    assert_eq!(dm.with_replica(|replica| replica.game_time()), 3.0);

    let below_zero = TestServer::new();
    let dm = TestClient::connect(&below_zero, Role::Dm).await;
    assert!(dm.client().adjust_time(-1.0, None).await.is_err());
    assert_eq!(dm.with_replica(|replica| replica.game_time()), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_stale_teleport_is_rejected_and_rolled_back() {
    init_logging();
    let server = TestServer::with_party(coords(2, 2), 0.0);
    let dm = TestClient::connect(&server, Role::Dm).await;
    let player = TestClient::connect(&server, Role::Player).await;
    dm.client().start_session().await.expect("session");
    player.pump();

    player
        .client()
        .player_move(coords(2, 3))
        .await
        .expect("player move");

    let result = dm.client().teleport(coords(8, 8), 1.0).await;
    assert!(matches!(
        result,
        Err(ClientError::Api(ApiError::Conflict { .. }))
    ));
    assert_eq!(
        dm.with_replica(|replica| replica.party_position()),
        Some(coords(2, 2))
    );

    dm.pump();
    assert_eq!(
        dm.with_replica(|replica| replica.party_position()),
        Some(coords(2, 3))
    );
    dm.client()
        .teleport(coords(8, 8), 1.0)
        .await
        .expect("teleport from the fresh position");
}

#[tokio::test(start_paused = true)]
async fn test_player_move_costs_the_configured_time() {
    init_logging();
    let server = TestServer::with_party(coords(4, 4), 1.0);
    let dm = TestClient::connect(&server, Role::Dm).await;
    let player = TestClient::connect(&server, Role::Player).await;
    dm.client().start_session().await.expect("session");
    player.pump();

    let moved = player
        .client()
        .player_move(coords(4, 5))
        .await
        .expect("player move");

    assert_eq!(moved.global_game_time, 1.5);
    assert_eq!(moved.audit_entry.kind, AuditKind::Movement);
    assert_eq!(moved.audit_entry.actor_role, Role::Player);
    assert!(matches!(moved.step, PathStep::PlayerMove { .. }));
    player.with_replica(|replica| {
        assert_eq!(replica.party_position(), Some(coords(4, 5)));
        assert_eq!(replica.game_time(), 1.5);
        assert!(replica.is_revealed(coords(4, 5)));
        assert!(replica.audit_log().is_none());
    });

    dm.pump();
    dm.with_replica(|replica| {
        assert_eq!(replica.current_path().map(|path| path.steps.len()), Some(1));
        assert_eq!(replica.audit_log().map(<[_]>::len), Some(1));
    });
}

#[tokio::test(start_paused = true)]
async fn test_moving_without_a_session_fails_cleanly() {
    init_logging();
    let server = TestServer::with_party(coords(1, 1), 0.0);
    let player = TestClient::connect(&server, Role::Player).await;

    let result = player.client().player_move(coords(1, 2)).await;
    assert!(matches!(
        result,
        Err(ClientError::Api(ApiError::Conflict { .. }))
    ));
    assert_eq!(
        player.with_replica(|replica| replica.party_position()),
        Some(coords(1, 1))
    );
}

#[tokio::test(start_paused = true)]
async fn test_dm_path_reveals_every_tile_on_the_way() {
    init_logging();
    let server = TestServer::with_party(coords(0, 0), 0.0);
    let dm = TestClient::connect(&server, Role::Dm).await;
    let player = TestClient::connect(&server, Role::Player).await;
    dm.client().start_session().await.expect("session");

    let route = [coords(0, 1), coords(1, 1), coords(1, 2)];
    let moved = dm.client().walk_path(&route, 1.25).await.expect("path");

    assert_eq!(moved.revealed_tiles.len(), 3);
    assert_eq!(moved.tiles, vec!["0-1", "1-1", "1-2"]);
    assert_eq!(moved.party_token_position, coords(1, 2));
    assert_eq!(moved.audit_entry.kind, AuditKind::DmPath);

    player.pump();
    player.with_replica(|replica| {
        for tile in route {
            assert!(replica.is_revealed(tile), "{} should be revealed", tile);
        }
        assert_eq!(replica.party_position(), Some(coords(1, 2)));
        assert_eq!(replica.game_time(), 1.25);
    });

    assert!(dm.client().walk_path(&[], 1.0).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_players_cannot_use_dm_controls() {
    init_logging();
    let server = TestServer::with_party(coords(0, 0), 0.0);
    let player = TestClient::connect(&server, Role::Player).await;

    assert!(matches!(
        player.client().teleport(coords(3, 3), 1.0).await,
        Err(ClientError::Capability { .. })
    ));
    assert!(matches!(
        player.client().adjust_time(1.0, None).await,
        Err(ClientError::Capability { .. })
    ));
    assert!(matches!(
        player.client().start_session().await,
        Err(ClientError::Api(ApiError::Authorization { .. }))
    ));
    assert_eq!(player.api().loopback().request_count(), 2);
}
