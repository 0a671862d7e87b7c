//! UseCase layer: what a connection does to the chat core.

mod connect_participant;
mod disconnect_participant;
mod send_message;

pub use connect_participant::{ChatSession, ConnectParticipantUseCase};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use send_message::SendMessageUseCase;
