use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;

use hexmap_client::{
    CampaignApi, CampaignClient, ChangeSet, ClientConfig, LocalReplica, TileBatcher,
};
use hexmap_server::EventStream;
use hexmap_shared::{Frame, Role, TileCoordinate, TileState};

use crate::{FlakyApi, TestServer};

/// A connected client together with its push stream. Pushed frames sit in the
/// stream until [`pump`](Self::pump) is called.
pub struct TestClient {
    client: CampaignClient,
    api: FlakyApi,
    stream: Mutex<EventStream>,
}

impl TestClient {
    pub async fn connect(server: &TestServer, role: Role) -> Self {
        // subscribe first so nothing published during the snapshot is missed
        let stream = server.subscribe(role);
        let api = FlakyApi::new(server.api(role));
        let shared: Arc<dyn CampaignApi> = Arc::new(api.clone());
        let client = CampaignClient::connect(shared, server.slug(), role, ClientConfig::default())
            .await
            .expect("test client should connect");

        Self {
            client,
            api,
            stream: Mutex::new(stream),
        }
    }

    pub fn client(&self) -> &CampaignClient {
        &self.client
    }

    pub fn api(&self) -> &FlakyApi {
        &self.api
    }

    pub fn tiles(&self) -> &TileBatcher {
        self.client
            .tiles()
            .expect("only a DM test client has a tile batcher")
    }

    /// Applies every frame already waiting on the push stream, each one
    /// rendered to its text form and parsed back first
    pub fn pump(&self) -> ChangeSet {
        let mut changes = ChangeSet::new();
        let mut stream = self.stream.lock();
        while let Some(Some(frame)) = stream.next().now_or_never() {
            let frame = Frame::parse(&frame.to_sse()).expect("pushed frame should parse");
            changes.merge(
                self.client
                    .handle_frame(&frame)
                    .expect("pushed frame should apply"),
            );
        }
        changes
    }

    pub fn with_replica<T>(&self, f: impl FnOnce(&LocalReplica) -> T) -> T {
        let replica = self.client.replica();
        let replica = replica.lock();
        f(&replica)
    }

    pub fn tile_state(&self, coords: TileCoordinate) -> TileState {
        self.with_replica(|replica| replica.tile_state(coords))
    }
}
