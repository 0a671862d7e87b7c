//! Infrastructure layer: in-memory storage and wire formats.

pub mod dto;
pub mod registry;
