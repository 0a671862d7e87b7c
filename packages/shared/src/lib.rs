//! Utilities shared by the Doorstep binaries: logging setup and clocks.

pub mod logger;
pub mod time;
