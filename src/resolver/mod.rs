//! Resolver abstraction — pluggable platform adapters.
//!
//! Extracts all platform-specific behavior (clipboard access, desktop
//! notifications) behind traits. The sync engine only ever talks to these
//! traits; adapters are composed once at startup.

pub mod clipboard;
pub mod notify;
pub mod x11;

use std::sync::Arc;
use std::time::Duration;

pub use clipboard::{ClipboardEvents, ClipboardProvider};
pub use notify::Notifier;

/// Errors returned by resolver adapters.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// Clipboard operation failed (e.g. xclip not found, pipe error).
    #[error("clipboard: {0}")]
    Clipboard(String),

    /// Notification delivery failed (e.g. notify-send missing, no session bus).
    #[error("notify: {0}")]
    Notify(String),
}

/// A composed set of platform adapters.
///
/// Constructed at startup and handed to the sync engine. Only one adapter
/// per sub-interface is active at runtime.
pub struct ResolverSet {
    /// Reads, writes and watches the system clipboard.
    pub clipboard: Arc<dyn ClipboardProvider>,

    /// Shows transient desktop notifications.
    pub notifier: Arc<dyn Notifier>,
}

impl ResolverSet {
    /// X11 desktop: `xclip` for the clipboard, `notify-send` for notifications.
    pub fn x11(poll_interval: Duration) -> Self {
        Self {
            clipboard: Arc::new(x11::XclipProvider::new(poll_interval)),
            notifier: Arc::new(notify::NotifySend),
        }
    }
}
