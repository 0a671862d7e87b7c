//! HTML fragment rendering.
//!
//! Fragments are written for htmx's out-of-band swaps: each one names the
//! element it replaces or appends to.

use chrono::{DateTime, Utc};
use doorstep_shared::time::{format_clock_time, format_rfc3339};

use super::sanitize::escape_html;

/// Appended to the author's copy of a chat bubble; swapping in a fresh input
/// element clears what the author typed.
pub const CLEAR_INPUT_FIELD: &str = r#"<input name="message" id="message-input" type="text" />"#;

/// Styling of a system notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Join, leave and rename announcements (timestamped)
    Notification,
    /// Private error feedback (not timestamped)
    Error,
}

impl NoticeKind {
    fn css_class(self) -> &'static str {
        match self {
            Self::Notification => "notif",
            Self::Error => "error",
        }
    }
}

/// Render one chat message.
///
/// `name` and `text` must already be sanitized. The author's variant is laid
/// out on the other side of the log and clears the author's input field.
pub fn render_chat_bubble(
    name: &str,
    text: &str,
    sent_at: DateTime<Utc>,
    is_author: bool,
) -> String {
    let side = if is_author { "chat-end" } else { "chat-start" };
    let mut html = format!(
        r#"<div id="chat-log" hx-swap-oob="beforeend"><div class="chat {side}"><time class="text-xs opacity-50">{ts}</time> <span class="font-bold nickname">{name}</span><div class="chat-bubble">{text}</div></div></div>"#,
        ts = format_clock_time(sent_at),
    );
    if is_author {
        html.push_str(CLEAR_INPUT_FIELD);
    }
    html
}

/// Render the member list and its count header.
///
/// `names` must already be deduplicated and escaped.
pub fn render_roster<S: AsRef<str>>(names: &[S]) -> String {
    let mut html = String::from(r#"<div id="users-list">"#);
    for name in names {
        html.push_str("<p>");
        html.push_str(name.as_ref());
        html.push_str("</p>");
    }
    html.push_str("</div>");
    html.push_str(&format!(
        r#"<p id="users-header-p" class="bold">Users ({})</p>"#,
        names.len()
    ));
    html
}

/// Render a system notice appended to the message log.
///
/// `text` must already be safe HTML (sanitized names and fixed wording).
/// Only notifications carry a timestamp.
pub fn render_notice(text: &str, kind: NoticeKind, at: DateTime<Utc>) -> String {
    let ts = match kind {
        NoticeKind::Notification => format_rfc3339(at),
        NoticeKind::Error => String::new(),
    };
    format!(
        r#"<tbody id="message-table-tbody" hx-swap-oob="beforeend"><tr class="special-message"><td>{ts}</td><td></td><td class="{class}">{text}</td></tr></tbody>"#,
        class = kind.css_class(),
    )
}

/// Render the heading naming the room a connection landed in
pub fn render_room_header(origin_key: &str) -> String {
    format!(r#"<h2 id="ip-addr">{}</h2>"#, escape_html(origin_key))
}
