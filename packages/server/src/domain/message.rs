//! Inbound room events.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::participant::Participant;

/// What a room event carries
#[derive(Debug, Clone)]
pub enum MessageKind {
    /// Raw text typed by a participant, with the name it was typed under
    Chat {
        sender: Arc<Participant>,
        author_name: String,
        text: String,
    },
    /// A server notice rendered when it was enqueued (join/leave), so the
    /// roster it embeds matches membership at that instant
    Rendered(String),
}

/// An event waiting in a room's inbound queue
#[derive(Debug, Clone)]
pub struct Message {
    pub kind: MessageKind,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// A chat event; the sender's current display name is captured now
    pub fn chat(sender: Arc<Participant>, text: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self {
            kind: MessageKind::Chat {
                author_name: sender.display_name(),
                sender,
                text: text.into(),
            },
            sent_at,
        }
    }

    pub fn rendered(html: String, sent_at: DateTime<Utc>) -> Self {
        Self {
            kind: MessageKind::Rendered(html),
            sent_at,
        }
    }
}
