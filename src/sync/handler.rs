//! GET / SET / POLL request handling.
//!
//! Transport-agnostic: each operation takes already-extracted header
//! values and returns a reply plus an optional [`Notification`] for the
//! caller to deliver. Nothing here knows about HTTP status codes.

use std::sync::Arc;

use super::registry::DeviceRegistry;
use super::state::{ClipboardState, ClipboardStore, Snapshot};
use crate::resolver::ResolverError;
use crate::wire::codec::{self, ClipContent, CodecError};
use crate::wire::protocol::{ClipboardReply, ContentKind, PollReply};

/// Notification body length limit, in characters.
const PREVIEW_CHARS: usize = 120;

/// Request-scoped failures. None of them mutate the store or the registry.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("X-Version header is required")]
    MissingVersion,
    #[error("X-Version must be an integer, got {0:?}")]
    InvalidVersion(String),
    #[error("unsupported content type {0:?} (expected text or image)")]
    UnsupportedKind(String),
    #[error("{0}")]
    DecodeError(#[from] CodecError),
    #[error("password mismatch")]
    AuthRejected,
    #[error("clipboard write failed: {0}")]
    ClipboardWrite(#[from] ResolverError),
}

impl RequestError {
    /// Machine-readable reason carried in the error body.
    pub fn reason(&self) -> &'static str {
        match self {
            RequestError::MissingVersion => "missing_version",
            RequestError::InvalidVersion(_) => "invalid_version",
            RequestError::UnsupportedKind(_) => "unsupported_kind",
            RequestError::DecodeError(_) => "decode_error",
            RequestError::AuthRejected => "auth_rejected",
            RequestError::ClipboardWrite(_) => "clipboard_write_failed",
        }
    }
}

/// A desktop notification the transport should deliver, best-effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Content was handed out to `client`.
    fn outbound(client: &str, content: &ClipContent) -> Self {
        Self {
            title: format!("To [{client}]"),
            body: content.preview(PREVIEW_CHARS),
        }
    }

    /// Content was received from `client`.
    fn inbound(client: &str, content: &ClipContent) -> Self {
        Self {
            title: format!("From [{client}]"),
            body: content.preview(PREVIEW_CHARS),
        }
    }
}

/// Parse a version header. Blank counts as missing.
pub fn parse_version(raw: Option<&str>) -> Result<i64, RequestError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let raw = raw.ok_or(RequestError::MissingVersion)?;
    raw.parse::<i64>()
        .map_err(|_| RequestError::InvalidVersion(raw.to_string()))
}

/// Parse a declared content kind header.
pub fn parse_kind(raw: Option<&str>) -> Result<ContentKind, RequestError> {
    let raw = raw.unwrap_or_default();
    ContentKind::parse(raw).ok_or_else(|| RequestError::UnsupportedKind(raw.to_string()))
}

/// Result of reconciling a remote version against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollDecision {
    /// Remote and local versions are equal.
    InSync,
    /// Remote is behind; it gets the current content.
    Behind(Snapshot),
    /// Remote is ahead on first contact; its version was adopted locally.
    Adopted(i64),
    /// Remote is ahead during an ongoing session; it must SET explicitly.
    Conflict,
}

/// POLL decision table, evaluated and applied inside one critical section.
pub fn decide_poll(state: &mut ClipboardState, remote: i64, first_contact: bool) -> PollDecision {
    let local = state.version();
    if remote == local {
        PollDecision::InSync
    } else if remote < local {
        PollDecision::Behind(state.snapshot())
    } else if first_contact {
        state.adopt_version(remote);
        PollDecision::Adopted(remote)
    } else {
        PollDecision::Conflict
    }
}

/// The reconciliation engine shared by all request tasks.
pub struct SyncEngine {
    store: Arc<ClipboardStore>,
    registry: DeviceRegistry,
}

impl SyncEngine {
    pub fn new(store: Arc<ClipboardStore>, registry: DeviceRegistry) -> Self {
        Self { store, registry }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.store.snapshot().await
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// GET: current content and version.
    pub async fn get(&self, client: &str) -> (ClipboardReply, Notification) {
        let snapshot = self.store.snapshot().await;
        tracing::info!(
            client,
            kind = %snapshot.content.kind(),
            version = snapshot.version,
            "clipboard fetched"
        );
        let note = Notification::outbound(client, &snapshot.content);
        (codec::encode(&snapshot.content, snapshot.version), note)
    }

    /// SET: validate, decode, then write through to the OS clipboard.
    ///
    /// Validation order: version, kind, body. All rejections happen before
    /// any mutation.
    pub async fn set(
        &self,
        client: &str,
        version: Option<&str>,
        kind: Option<&str>,
        body: &[u8],
    ) -> Result<Notification, RequestError> {
        let requested = parse_version(version)?;
        let kind = parse_kind(kind)?;
        let content = codec::decode_body(kind, body)?;

        let note = Notification::inbound(client, &content);
        let stored = self.store.set_remote(content, requested).await?;
        tracing::info!(client, %kind, version = stored, "clipboard set by remote");
        Ok(note)
    }

    /// POLL: reconcile the caller's version with ours.
    ///
    /// The device is stamped as seen whichever branch fires; the first-contact
    /// verdict uses the stamp from its previous poll.
    pub async fn poll(
        &self,
        client: &str,
        version: Option<&str>,
    ) -> Result<(PollReply, Option<Notification>), RequestError> {
        let remote = parse_version(version)?;
        let first_contact = self.registry.check_in(client);
        let decision = self
            .store
            .with_state(|state| decide_poll(state, remote, first_contact))
            .await;

        let outcome = match decision {
            PollDecision::InSync => {
                tracing::debug!(client, version = remote, "poll in sync");
                (PollReply::ok(), None)
            }
            PollDecision::Behind(snapshot) => {
                tracing::info!(client, remote, local = snapshot.version, "poll behind");
                let note = Notification::outbound(client, &snapshot.content);
                (
                    PollReply::behind(codec::encode(&snapshot.content, snapshot.version)),
                    Some(note),
                )
            }
            PollDecision::Adopted(version) => {
                tracing::info!(client, version, "first contact, adopted remote version");
                (PollReply::ok(), None)
            }
            PollDecision::Conflict => {
                tracing::info!(client, remote, "poll conflict");
                (PollReply::conflict(), None)
            }
        };
        Ok(outcome)
    }
}
