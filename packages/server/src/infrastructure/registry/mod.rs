//! Room registry implementations.
//!
//! - `inmemory`: process-local map guarded by one lock

pub mod inmemory;

pub use inmemory::InMemoryRoomRegistry;
