use hexmap_client::ClientConfig;
use hexmap_shared::{MarkerKind, NewMarker, TileCoordinate};

/// Routes `log` output through the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn coords(x: i32, y: i32) -> TileCoordinate {
    TileCoordinate::new(x, y)
}

pub fn new_note(x: i32, y: i32, content: &str) -> NewMarker {
    NewMarker {
        x,
        y,
        kind: MarkerKind::Note,
        title: None,
        content: Some(content.to_string()),
        visible_to_players: None,
        image_path: None,
    }
}

pub fn new_poi(x: i32, y: i32, title: &str, visible: bool) -> NewMarker {
    NewMarker {
        x,
        y,
        kind: MarkerKind::Poi,
        title: Some(title.to_string()),
        content: None,
        visible_to_players: Some(visible),
        image_path: None,
    }
}

/// Lets the batch timer fire and every request it spawned finish.
/// Only meaningful on a paused clock.
pub async fn settle() {
    tokio::time::sleep(ClientConfig::default().batch_delay * 4).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
