//! ClipboardProvider trait — system clipboard write/watch abstraction.

use futures::stream::BoxStream;

use super::ResolverError;
use crate::wire::protocol::ContentKind;

/// Change events for one content kind: raw bytes of the new clipboard
/// content, one item per observed change.
///
/// The stream is lazy, never ends on its own, and cannot be restarted.
pub type ClipboardEvents = BoxStream<'static, Vec<u8>>;

/// Writes and watches the system clipboard.
///
/// `Send + Sync` is required because the provider is shared between HTTP
/// request tasks and the watcher loops.
#[async_trait::async_trait]
pub trait ClipboardProvider: Send + Sync {
    /// Replace the system clipboard content with `data` of the given kind.
    async fn write(&self, kind: ContentKind, data: &[u8]) -> Result<(), ResolverError>;

    /// Start watching for changes of the given kind, from any actor
    /// (including this process's own writes).
    fn watch(&self, kind: ContentKind) -> ClipboardEvents;
}
