//! Request handlers.

mod connection;
mod http;
mod websocket;

pub use connection::run_connection;
pub use http::health_check;
pub use websocket::{connect_handler, origin_key};
