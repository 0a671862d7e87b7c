//! Data Transfer Objects (DTOs) for the chat application.
//!
//! - `websocket`: frames received over the WebSocket connection

pub mod websocket;
