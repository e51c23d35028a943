use std::{default::Default, time::Duration};

use hexmap_shared::GameDays;

/// Contains Config properties which will be used by the Server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// How often an idle event stream emits a keep-alive frame
    pub heartbeat_interval: Duration,
    /// Frames queued per subscriber before further frames are dropped
    pub subscriber_buffer: usize,
    /// Game days consumed by one player move
    pub player_move_cost_days: GameDays,
    /// Upper bound on the number of tiles a single batch request may carry
    pub max_batch_tiles: usize,
    /// Number of sessions returned in a snapshot, newest first
    pub session_list_limit: usize,
    /// Number of audit entries returned in a DM snapshot, newest first
    pub audit_log_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(20),
            subscriber_buffer: 256,
            player_move_cost_days: 0.5,
            max_batch_tiles: 10_000,
            session_list_limit: 50,
            audit_log_limit: 100,
        }
    }
}
