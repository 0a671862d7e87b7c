//! Domain errors.

use thiserror::Error;

/// Errors raised when building an [`OriginKey`](super::OriginKey)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginKeyError {
    #[error("origin key must not be empty")]
    Empty,
}

/// Errors raised by a room's rate limiter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// The limiter can never hand out a token
    #[error("rate limiter has zero burst capacity")]
    ZeroBurst,
}

/// Errors raised when talking to a room
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// The room's event loop has terminated and no longer accepts events
    #[error("room '{0}' is closed")]
    Closed(String),
}
