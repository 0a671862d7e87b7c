//! Doorstep chat server.
//!
//! Every WebSocket client is dropped into the room shared by everyone else
//! connecting from the same network origin.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin doorstep-server
//! cargo run --bin doorstep-server -- --host 0.0.0.0 --port 3000
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use doorstep_server::{
    config::ChatConfig,
    domain::{RandomNicknames, RoomSettings},
    infrastructure::registry::InMemoryRoomRegistry,
    ui::Server,
    usecase::{ConnectParticipantUseCase, DisconnectParticipantUseCase, SendMessageUseCase},
};
use doorstep_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "doorstep-server")]
#[command(about = "Anonymous chat rooms keyed by network origin", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Minimum spacing between messages processed by one room, in milliseconds
    #[arg(long, default_value = "100")]
    rate_interval_ms: u64,

    /// Messages a room may process back to back before spacing applies
    #[arg(long, default_value = "8", value_parser = clap::value_parser!(u32).range(1..))]
    rate_burst: u32,

    /// Rendered messages buffered per participant before it is disconnected
    #[arg(long, default_value = "16")]
    outbound_capacity: usize,

    /// Deadline for writing one message to a client, in seconds
    #[arg(long, default_value = "5")]
    write_timeout_secs: u64,

    /// How long shutdown waits for connections to close, in seconds
    #[arg(long, default_value = "30")]
    shutdown_timeout_secs: u64,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn chat_config(&self) -> ChatConfig {
        let defaults = ChatConfig::default();
        ChatConfig {
            outbound_capacity: self.outbound_capacity,
            room: RoomSettings {
                rate_interval: Duration::from_millis(self.rate_interval_ms),
                rate_burst: self.rate_burst,
                ..defaults.room
            },
            write_timeout: Duration::from_secs(self.write_timeout_secs),
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_secs),
            ..defaults
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = args.chat_config();

    // Initialize dependencies in order:
    // 1. Registry
    // 2. UseCases
    // 3. Server

    // 1. Create Registry (in-memory rooms)
    let clock = Arc::new(SystemClock);
    let registry = Arc::new(InMemoryRoomRegistry::new(
        config.room,
        Arc::new(RandomNicknames::from_entropy()),
        clock.clone(),
    ));

    // 2. Create UseCases
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        registry.clone(),
        config.outbound_capacity,
    ));
    let disconnect_participant_usecase =
        Arc::new(DisconnectParticipantUseCase::new(registry.clone()));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(clock));

    // 3. Create and run the server
    let server = Server::new(
        connect_participant_usecase,
        disconnect_participant_usecase,
        send_message_usecase,
        registry.clone(),
        config,
    );
    let result = server.run(args.host, args.port).await;

    // Rooms whose connections outlived the drain deadline
    registry.close_all().await;

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
