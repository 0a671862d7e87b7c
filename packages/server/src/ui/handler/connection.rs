//! The duplex pump behind each chat connection.
//!
//! A reader task decodes inbound frames and hands them to the writer loop,
//! which owns the sink. The writer submits decoded text to the room, writes
//! rendered fragments out and closes the socket when the participant falls
//! behind, sends garbage or the server shuts down. However the pump ends, the
//! participant leaves its room afterwards.

use std::{fmt, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, close_code};
use futures_util::{FutureExt, Sink, SinkExt, Stream, StreamExt};
use tokio::{sync::mpsc, time::timeout};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::OriginKey,
    infrastructure::dto::websocket::InboundFrame,
    pipeline::render_room_header,
    ui::{error::ConnectionError, state::AppState},
    usecase::ChatSession,
};

const SLOW_CONSUMER_REASON: &str = "connection too slow to keep up with messages";
const MALFORMED_FRAME_REASON: &str = "unexpected error";
const SHUTDOWN_REASON: &str = "server shutting down";

#[derive(Debug)]
enum ReadEvent {
    Frame(String),
    Malformed(String),
    Broken(String),
    Closed,
}

/// Serve one connection in the room for `key` until it ends.
///
/// Joins the room, pumps frames both ways, then leaves the room. Leaving also
/// happens when the pump panics.
pub async fn run_connection<S, R, E>(
    state: Arc<AppState>,
    key: OriginKey,
    mut sink: S,
    stream: R,
) -> Result<(), ConnectionError>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: fmt::Display,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let session = state.connect_participant_usecase.execute(key.clone()).await;
    let participant = session.participant.clone();
    tracing::info!(
        "Participant {} joined room '{}' as '{}'",
        participant.id(),
        key,
        participant.display_name()
    );

    let outcome = AssertUnwindSafe(pump(&state, session, &mut sink, stream))
        .catch_unwind()
        .await;

    state
        .disconnect_participant_usecase
        .execute(&key, &participant)
        .await;

    outcome.unwrap_or_else(|_| Err(ConnectionError::Panicked))
}

async fn pump<S, R, E>(
    state: &AppState,
    session: ChatSession,
    sink: &mut S,
    stream: R,
) -> Result<(), ConnectionError>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: fmt::Display,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let ChatSession {
        key,
        participant,
        room,
        mut outbound,
        overload,
    } = session;
    let write_timeout = state.config.write_timeout;

    // Cancelled on shutdown, and when this pump returns so the reader stops too
    let cancel = state.drain.token().child_token();
    let _stop_reader = cancel.clone().drop_guard();

    let (read_tx, mut read_rx) = mpsc::channel(state.config.read_capacity.max(1));
    tokio::spawn(read_frames(stream, read_tx, cancel.clone()));

    let header = render_room_header(key.as_str());
    write_message(sink, Message::Text(header.into()), write_timeout).await?;

    loop {
        tokio::select! {
            _ = overload.cancelled() => {
                close(sink, close_code::POLICY, SLOW_CONSUMER_REASON, write_timeout).await;
                return Err(ConnectionError::SlowConsumer);
            }
            _ = cancel.cancelled() => {
                close(sink, close_code::AWAY, SHUTDOWN_REASON, write_timeout).await;
                return Ok(());
            }
            fragment = outbound.recv() => {
                let Some(fragment) = fragment else {
                    return Ok(());
                };
                let message = Message::Text(fragment.into());
                tokio::select! {
                    written = write_message(sink, message, write_timeout) => written?,
                    _ = overload.cancelled() => {}
                }
            }
            event = read_rx.recv() => match event {
                Some(ReadEvent::Frame(text)) => {
                    state
                        .send_message_usecase
                        .execute(&room, &participant, text)
                        .await?;
                }
                Some(ReadEvent::Malformed(reason)) => {
                    close(sink, close_code::POLICY, MALFORMED_FRAME_REASON, write_timeout).await;
                    return Err(ConnectionError::Decode(reason));
                }
                Some(ReadEvent::Broken(reason)) => return Err(ConnectionError::Transport(reason)),
                Some(ReadEvent::Closed) | None => return Ok(()),
            },
        }
    }
}

async fn read_frames<R, E>(
    mut stream: R,
    events: mpsc::Sender<ReadEvent>,
    cancel: CancellationToken,
) where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            next = stream.next() => next,
        };

        let event = match next {
            Some(Ok(Message::Text(text))) => decode(InboundFrame::from_text(text.as_str())),
            Some(Ok(Message::Binary(bytes))) => decode(InboundFrame::from_bytes(&bytes)),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => ReadEvent::Closed,
            Some(Err(e)) => ReadEvent::Broken(e.to_string()),
        };
        let last = !matches!(event, ReadEvent::Frame(_));

        tokio::select! {
            _ = cancel.cancelled() => return,
            sent = events.send(event) => {
                if sent.is_err() || last {
                    return;
                }
            }
        }
    }
}

fn decode(frame: Result<InboundFrame, serde_json::Error>) -> ReadEvent {
    match frame {
        Ok(frame) => ReadEvent::Frame(frame.message),
        Err(e) => ReadEvent::Malformed(e.to_string()),
    }
}

async fn write_message<S>(
    sink: &mut S,
    message: Message,
    limit: Duration,
) -> Result<(), ConnectionError>
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    match timeout(limit, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ConnectionError::Transport(e.to_string())),
        Err(_) => Err(ConnectionError::WriteTimeout(limit)),
    }
}

/// Best effort; the connection is going away either way.
async fn close<S>(sink: &mut S, code: u16, reason: &'static str, limit: Duration)
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    };
    if let Err(e) = write_message(sink, Message::Close(Some(frame)), limit).await {
        tracing::debug!("Failed to send close frame: {}", e);
    }
}
