//! HTTP wire types for the GET / SET / POLL endpoints.
//!
//! All bodies are JSON. Clipboard content is carried as a `type` tag plus a
//! string `data` field; images are base64 on the wire (see [`super::codec`]).

use serde::{Deserialize, Serialize};

// -- Header names --

/// Caller's version stamp. Required on SET and POLL.
pub const HEADER_VERSION: &str = "x-version";
/// Declared content kind of a SET body.
pub const HEADER_CONTENT_TYPE: &str = "x-content-type";
/// URL-escaped display name of the calling device.
pub const HEADER_CLIENT_NAME: &str = "x-client-name";
/// Optional shared secret.
pub const HEADER_PASSWORD: &str = "x-password";

/// Identity used when `X-Client-Name` is missing or undecodable.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Clipboard content kinds supported by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Image,
}

impl ContentKind {
    pub const ALL: [ContentKind; 2] = [ContentKind::Text, ContentKind::Image];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
        }
    }

    /// Parse an `X-Content-Type` header value. Case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("text") {
            Some(ContentKind::Text)
        } else if raw.eq_ignore_ascii_case("image") {
            Some(ContentKind::Image)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clipboard content in wire form, as returned by GET.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClipboardReply {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub data: String,
    pub version: i64,
}

/// SET request body.
#[derive(Debug, Clone, Deserialize)]
pub struct SetBody {
    pub data: String,
}

/// POLL outcome tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Ok,
    Conflict,
}

/// POLL response. Content fields are flattened in only when the caller
/// is behind.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PollReply {
    pub status: PollStatus,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub content: Option<ClipboardReply>,
}

impl PollReply {
    pub fn ok() -> Self {
        Self {
            status: PollStatus::Ok,
            content: None,
        }
    }

    pub fn conflict() -> Self {
        Self {
            status: PollStatus::Conflict,
            content: None,
        }
    }

    pub fn behind(content: ClipboardReply) -> Self {
        Self {
            status: PollStatus::Ok,
            content: Some(content),
        }
    }
}

/// Error body for every rejected request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorReply {
    /// Machine-readable reason, e.g. `missing_version`.
    pub error: String,
    pub message: String,
}
