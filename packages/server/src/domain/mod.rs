//! Domain layer: participants, rooms and the registry abstraction.

pub mod error;
pub mod message;
pub mod nickname;
pub mod participant;
pub mod rate_limiter;
pub mod registry;
pub mod room;
pub mod value_object;

pub use error::{OriginKeyError, RateLimitError, RoomError};
pub use message::{Message, MessageKind};
pub use nickname::{NicknameSource, RandomNicknames};
pub use participant::{Delivery, Participant};
pub use rate_limiter::{RateLimit, TokenBucket};
pub use registry::RoomRegistry;
pub use room::{InboundSlot, Room, RoomSettings};
pub use value_object::{OriginKey, ParticipantId};
