//! WebSocket chat server implementation.

mod error;
mod handler;
mod server;
mod shutdown;
mod signal;
pub mod state;

pub use error::ConnectionError;
pub use handler::{origin_key, run_connection};
pub use server::Server;
pub use shutdown::ConnectionDrain;
