use std::{default::Default, time::Duration};

/// Contains Config properties which will be used by a Client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// How long tile mutations are collected before one batch is sent.
    /// Every new mutation restarts the wait.
    pub batch_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            batch_delay: Duration::from_millis(50),
        }
    }
}
