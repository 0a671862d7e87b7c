//! Errors that end a single connection.

use std::time::Duration;

use thiserror::Error;

use crate::domain::RoomError;

#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The peer sent a frame that is not a chat form submission
    #[error("malformed frame: {0}")]
    Decode(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// The participant's outbound queue overflowed
    #[error("connection too slow to keep up with messages")]
    SlowConsumer,

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("connection task panicked")]
    Panicked,
}
