//! Doorstep: anonymous drop-in chat rooms keyed by network origin.
//!
//! Every WebSocket connection becomes a participant in the room shared by all
//! connections coming from the same origin. Rooms are created on first
//! arrival, serialize their traffic through a single event loop, and vanish
//! when the last participant leaves.

// layers
pub mod domain;
pub mod infrastructure;
pub mod pipeline;
pub mod ui;
pub mod usecase;

pub mod config;
