//! Runtime configuration.

use std::time::Duration;

use crate::domain::RoomSettings;

/// Every tunable of the chat core, with production defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatConfig {
    /// Rendered fragments buffered per participant before it counts as too slow
    pub outbound_capacity: usize,
    /// Decoded frames buffered between a connection's reader and writer
    pub read_capacity: usize,
    /// Inbound queue and rate limiting of each room
    pub room: RoomSettings,
    /// Deadline for writing one fragment to a connection
    pub write_timeout: Duration,
    /// How long a graceful drain waits for connections to close
    pub shutdown_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 16,
            read_capacity: 20,
            room: RoomSettings::default(),
            write_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}
