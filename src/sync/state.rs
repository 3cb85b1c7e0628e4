//! Clipboard state — current content, version stamp, pending echoes.
//!
//! [`ClipboardState`] methods are pure state transitions with no I/O.
//! [`ClipboardStore`] wraps the state in one async mutex shared by the HTTP
//! handlers and both watcher loops. Every read and write is linearizable
//! under that lock.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::clock::Clock;
use crate::resolver::{ClipboardProvider, ResolverError};
use crate::wire::codec::ClipContent;
use crate::wire::protocol::ContentKind;

/// Version sentinel meaning "stamp with the current time". Never stored.
pub const VERSION_NOW: i64 = 0;

/// Resolve a caller-supplied version against the sentinel.
pub fn resolve_version(requested: i64, now: i64) -> i64 {
    if requested == VERSION_NOW {
        now
    } else {
        requested
    }
}

/// Consistent copy of the clipboard state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub content: ClipContent,
    pub version: i64,
}

/// Pending echoes of our own clipboard writes, oldest first.
///
/// One arm is pushed right before this process writes the OS clipboard and
/// swallows exactly one change event carrying that content. Overlapping
/// writes queue, so a second SET never cancels the first suppression.
///
/// A change event of some kind that matches no arm means the clipboard of
/// that kind has moved past our writes: every arm of that kind is dropped,
/// so an unobserved write can never swallow a later genuine change.
#[derive(Debug, Default)]
pub struct EchoQueue {
    pending: VecDeque<ClipContent>,
}

impl EchoQueue {
    /// Arm for one upcoming change event carrying `content`. Returns the
    /// number of arms now pending.
    pub fn arm(&mut self, content: ClipContent) -> usize {
        self.pending.push_back(content);
        self.pending.len()
    }

    /// Withdraw the most recent arm, for a write that never happened.
    pub fn withdraw(&mut self) -> Option<ClipContent> {
        self.pending.pop_back()
    }

    /// Match a change event against the pending arms.
    ///
    /// On a match the matching arm and every older arm of the same kind are
    /// consumed (the OS may coalesce back-to-back writes into one event).
    /// Returns the consumed kind, or `None` for a genuine change.
    pub fn consume(&mut self, observed: &ClipContent) -> Option<ContentKind> {
        let kind = observed.kind();
        let matched = self.pending.iter().position(|armed| armed == observed);
        let mut index = 0;
        self.pending.retain(|armed| {
            let keep = armed.kind() != kind || matched.is_some_and(|m| index > m);
            index += 1;
            keep
        });
        matched.map(|_| kind)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Outcome of feeding one watcher event into the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observed {
    /// The event was our own write; its pending arm was consumed.
    Suppressed(ContentKind),
    /// A genuine local change, stamped with this version.
    Applied(i64),
}

/// Process-lifetime clipboard state.
#[derive(Debug, Default)]
pub struct ClipboardState {
    content: ClipContent,
    version: i64,
    echoes: EchoQueue,
}

impl ClipboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: ClipContent, version: i64) -> Self {
        Self {
            content,
            version,
            echoes: EchoQueue::default(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            content: self.content.clone(),
            version: self.version,
        }
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn content(&self) -> &ClipContent {
        &self.content
    }

    #[cfg(test)]
    pub fn echo_armed(&self) -> bool {
        !self.echoes.is_empty()
    }

    /// Record a genuine local clipboard change. Always stamps `now`.
    pub fn set_local(&mut self, content: ClipContent, now: i64) -> i64 {
        self.content = content;
        self.version = now;
        self.version
    }

    /// Watcher path: swallow the event if it is the echo of one of our own
    /// writes, otherwise apply it as a local change.
    pub fn apply_change(&mut self, content: ClipContent, now: i64) -> Observed {
        match self.echoes.consume(&content) {
            Some(origin) => Observed::Suppressed(origin),
            None => Observed::Applied(self.set_local(content, now)),
        }
    }

    pub fn arm_echo(&mut self, content: ClipContent) -> usize {
        self.echoes.arm(content)
    }

    pub fn disarm_echo(&mut self) -> Option<ClipContent> {
        self.echoes.withdraw()
    }

    /// Commit content pushed by a remote SET with an already-resolved version.
    pub fn commit_remote(&mut self, content: ClipContent, version: i64) {
        self.content = content;
        self.version = version;
    }

    /// Rewrite only the version, leaving content untouched.
    pub fn adopt_version(&mut self, version: i64) {
        self.version = version;
    }
}

/// Shared, lock-guarded clipboard state plus the OS clipboard it mirrors.
pub struct ClipboardStore {
    state: Mutex<ClipboardState>,
    clipboard: Arc<dyn ClipboardProvider>,
    clock: Arc<dyn Clock>,
}

impl ClipboardStore {
    pub fn new(
        state: ClipboardState,
        clipboard: Arc<dyn ClipboardProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state: Mutex::new(state),
            clipboard,
            clock,
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.snapshot()
    }

    /// Feed one watcher event through the pending echoes.
    pub async fn observe_change(&self, content: ClipContent) -> Observed {
        let now = self.clock.now();
        self.state.lock().await.apply_change(content, now)
    }

    /// Apply content pushed by a remote SET and write it through to the OS
    /// clipboard. Returns the stored version.
    ///
    /// Arm, write and commit happen under one lock acquisition, so the
    /// watcher can only see the resulting change event once the arm is in
    /// place. If the store already holds identical content no write is
    /// issued (the write would be redundant) and only
    /// the version is updated. On write failure the arm is withdrawn and the
    /// state is left untouched.
    pub async fn set_remote(
        &self,
        content: ClipContent,
        requested: i64,
    ) -> Result<i64, ResolverError> {
        let mut state = self.state.lock().await;
        let version = resolve_version(requested, self.clock.now());

        if *state.content() == content {
            tracing::debug!(version, "remote content unchanged, skipping clipboard write");
            state.adopt_version(version);
            return Ok(version);
        }

        let kind = content.kind();
        let pending = state.arm_echo(content.clone());
        if pending > 1 {
            tracing::debug!(%kind, pending, "previous clipboard write not yet observed");
        }

        if let Err(e) = self.clipboard.write(kind, content.as_bytes()).await {
            state.disarm_echo();
            return Err(e);
        }

        state.commit_remote(content, version);
        Ok(version)
    }

    /// Run `f` inside the critical section.
    pub async fn with_state<R>(&self, f: impl FnOnce(&mut ClipboardState) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut state)
    }
}
