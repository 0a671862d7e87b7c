//! Sanitization of display names and chat text.

use std::{borrow::Cow, sync::LazyLock};

use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Longest display name, in user-perceived characters
pub const MAX_DISPLAY_NAME_GRAPHEMES: usize = 30;
/// Longest chat message, in user-perceived characters
pub const MAX_MESSAGE_GRAPHEMES: usize = 512;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\bhttps?://(?:[^\s()<>]+|\(([^\s()<>]+|(\([^\s()<>]+\)))*\))+(?:\(([^\s()<>]+|(\([^\s()<>]+\)))*\)|[^\s`!()\[\]{};:'".,<>?«»“”‘’])"#,
    )
    .expect("URL pattern is a valid regex")
});

/// Sanitize a requested display name.
///
/// Repairs invalid UTF-8, trims, applies NFC normalization so look-alike
/// names compare equal, truncates by grapheme cluster and HTML-escapes.
pub fn sanitize_display_name(raw: impl AsRef<[u8]>) -> String {
    let repaired = String::from_utf8_lossy(raw.as_ref());
    let normalized: String = repaired.trim().nfc().collect();
    escape_html(&truncate_graphemes(&normalized, MAX_DISPLAY_NAME_GRAPHEMES))
}

/// Sanitize chat text and turn bare URLs into links.
///
/// Only `http` and `https` URLs are linked; anything else stays plain text.
/// Links open in a new browsing context without referrer or opener.
pub fn sanitize_message_text(raw: impl AsRef<[u8]>) -> String {
    let repaired = String::from_utf8_lossy(raw.as_ref());
    let truncated = truncate_graphemes(repaired.trim(), MAX_MESSAGE_GRAPHEMES);
    let escaped = escape_html(&truncated);
    URL_PATTERN
        .replace_all(&escaped, |caps: &Captures<'_>| {
            let url = &caps[0];
            format!(r#"<a href="{url}" target="_blank" rel="noopener noreferrer">{url}</a>"#)
        })
        .into_owned()
}

/// Escape the characters that are significant in HTML text and attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn truncate_graphemes(text: &str, max: usize) -> Cow<'_, str> {
    match text.grapheme_indices(true).nth(max) {
        Some((end, _)) => Cow::Borrowed(&text[..end]),
        None => Cow::Borrowed(text),
    }
}
