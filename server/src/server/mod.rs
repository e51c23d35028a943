mod map_server;
mod server_config;

pub(crate) use map_server::{ensure_on_grid, Outgoing};
pub use map_server::MapServer;
pub use server_config::ServerConfig;
