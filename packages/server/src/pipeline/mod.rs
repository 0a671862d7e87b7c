//! Message pipeline: pure functions turning raw user text into HTML fragments.
//!
//! Nothing here performs I/O or reads the clock; timestamps are passed in.

pub mod command;
pub mod render;
pub mod sanitize;

pub use command::{Command, parse_command};
pub use render::{
    CLEAR_INPUT_FIELD, NoticeKind, render_chat_bubble, render_notice, render_room_header,
    render_roster,
};
pub use sanitize::{
    MAX_DISPLAY_NAME_GRAPHEMES, MAX_MESSAGE_GRAPHEMES, escape_html, sanitize_display_name,
    sanitize_message_text,
};
