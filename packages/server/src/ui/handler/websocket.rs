//! WebSocket connection handlers.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ConnectInfo, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use futures_util::stream::StreamExt;

use crate::{
    domain::{OriginKey, OriginKeyError},
    ui::{error::ConnectionError, state::AppState},
};

use super::connection::run_connection;

const FORWARDED_FOR: &str = "x-forwarded-for";

pub async fn connect_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    if state.drain.is_draining() {
        tracing::warn!("Rejecting connection from {} during shutdown", peer);
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let key = match origin_key(&headers, peer) {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!("Cannot derive a room for {}: {}", peer, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let drain = state.drain.clone();
    Ok(ws.on_upgrade(move |socket| drain.track(handle_socket(socket, state, key))))
}

/// Derive the room key of a request.
///
/// The first `X-Forwarded-For` entry wins, so clients behind the same proxy
/// share a room with whoever the proxy reports. Otherwise the peer's IP is used.
pub fn origin_key(headers: &HeaderMap, peer: SocketAddr) -> Result<OriginKey, OriginKeyError> {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match forwarded {
        Some(addr) => OriginKey::new(addr),
        None => OriginKey::new(peer.ip().to_string()),
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, key: OriginKey) {
    let (sender, receiver) = socket.split();

    match run_connection(state, key.clone(), sender, receiver).await {
        Ok(()) => tracing::info!("Connection in room '{}' closed", key),
        Err(e @ ConnectionError::Panicked) => {
            tracing::error!("Connection in room '{}' aborted: {}", key, e)
        }
        Err(e) => tracing::warn!("Connection in room '{}' closed: {}", key, e),
    }
}
