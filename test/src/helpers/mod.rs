pub mod assertions;
pub mod fixtures;
pub mod flaky_api;
pub mod loopback_api;
pub mod test_client;

pub use fixtures::{coords, init_logging, new_note, new_poi, settle};
pub use flaky_api::{FlakyApi, ResponseGate};
pub use loopback_api::LoopbackApi;
pub use test_client::TestClient;
pub use test_server::{TestServer, TEST_SLUG};
