//! Content codec: wire `data` strings ↔ in-memory clipboard payloads.
//!
//! Dispatches purely on the declared kind. Text passes through unchanged;
//! images travel as standard base64 and are held as raw bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::protocol::{ClipboardReply, ContentKind, SetBody};

/// Largest request body accepted on SET (base64 inflates images by ~4/3).
pub const MAX_BODY_SIZE: usize = 32 * 1024 * 1024;

/// Codec error type.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed request body: {0}")]
    Body(#[from] serde_json::Error),
    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Clipboard payload as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipContent {
    Text(String),
    Image(Vec<u8>),
}

impl ClipContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            ClipContent::Text(_) => ContentKind::Text,
            ClipContent::Image(_) => ContentKind::Image,
        }
    }

    /// Raw bytes as handed to the OS clipboard.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ClipContent::Text(text) => text.as_bytes(),
            ClipContent::Image(bytes) => bytes,
        }
    }

    /// Build content from bytes read off the OS clipboard.
    ///
    /// Text that is not valid UTF-8 is decoded lossily rather than dropped,
    /// so every change event maps to exactly one payload.
    pub fn from_raw(kind: ContentKind, raw: Vec<u8>) -> Self {
        match kind {
            ContentKind::Text => match String::from_utf8(raw) {
                Ok(text) => ClipContent::Text(text),
                Err(e) => ClipContent::Text(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            },
            ContentKind::Image => ClipContent::Image(raw),
        }
    }

    /// Short human-readable description for notifications and logs.
    pub fn preview(&self, max_chars: usize) -> String {
        match self {
            ClipContent::Text(text) => {
                let mut chars = text.chars();
                let head: String = chars.by_ref().take(max_chars).collect();
                if chars.next().is_some() {
                    format!("{head}…")
                } else {
                    head
                }
            }
            ClipContent::Image(_) => "[Image]".to_string(),
        }
    }
}

impl Default for ClipContent {
    fn default() -> Self {
        ClipContent::Text(String::new())
    }
}

/// Decode a wire `data` string for the declared kind.
pub fn decode(kind: ContentKind, data: String) -> Result<ClipContent, CodecError> {
    match kind {
        ContentKind::Text => Ok(ClipContent::Text(data)),
        ContentKind::Image => Ok(ClipContent::Image(BASE64.decode(data.trim())?)),
    }
}

/// Parse a SET body (`{"data": ...}`) and decode it for the declared kind.
pub fn decode_body(kind: ContentKind, body: &[u8]) -> Result<ClipContent, CodecError> {
    let body: SetBody = serde_json::from_slice(body)?;
    decode(kind, body.data)
}

/// Encode content and its version into the GET / POLL reply shape.
pub fn encode(content: &ClipContent, version: i64) -> ClipboardReply {
    let data = match content {
        ClipContent::Text(text) => text.clone(),
        ClipContent::Image(bytes) => BASE64.encode(bytes),
    };
    ClipboardReply {
        kind: content.kind(),
        data,
        version,
    }
}
