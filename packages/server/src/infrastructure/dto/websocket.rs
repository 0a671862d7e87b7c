//! WebSocket frame DTOs.

use std::collections::HashMap;

use serde::Deserialize;

/// Frame sent by the page when the user submits the chat form.
///
/// htmx's WebSocket extension serializes the form fields and adds the request
/// headers under `HEADERS`. Only `message` is used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundFrame {
    pub message: String,
    #[serde(default, rename = "HEADERS", alias = "headers")]
    pub headers: HashMap<String, serde_json::Value>,
}

impl InboundFrame {
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
