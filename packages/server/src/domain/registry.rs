//! Room registry trait.
//!
//! The registry is the only place rooms are created or destroyed. The domain
//! defines the interface; the infrastructure layer provides the storage.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Participant, Room, value_object::OriginKey};

/// Maps origin keys to their live rooms.
///
/// Invariant: a room is registered if and only if it has at least one member.
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    /// Put a participant into the room for `key`, creating the room on first
    /// arrival. The participant is named and announced by the room.
    async fn join(&self, key: &OriginKey, participant: Arc<Participant>) -> Arc<Room>;

    /// Take a participant out of the room for `key`, destroying the room when
    /// it becomes empty. Unknown keys are logged and ignored.
    async fn leave(&self, key: &OriginKey, participant: &Participant);

    /// Whether a room is registered for `key`
    async fn has_room(&self, key: &OriginKey) -> bool;

    /// Number of registered rooms
    async fn room_count(&self) -> usize;
}
