//! In-memory collaborators for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use futures::StreamExt;
use futures::channel::mpsc;

use super::clock::Clock;
use crate::resolver::{ClipboardEvents, ClipboardProvider, Notifier, ResolverError};
use crate::wire::protocol::ContentKind;

/// Clock that only moves when told to.
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Clipboard that records writes and lets tests inject change events.
///
/// With echo enabled, every successful write is also delivered to the
/// watcher of that kind, the way a real OS clipboard reports our own writes.
/// A sampling clipboard additionally reports nothing when the new bytes equal
/// what it already holds, like the xclip watcher.
pub struct FakeClipboard {
    writes: Mutex<Vec<(ContentKind, Vec<u8>)>>,
    fail: AtomicBool,
    echo: bool,
    sampling: bool,
    current: Mutex<HashMap<ContentKind, Vec<u8>>>,
    senders: HashMap<ContentKind, mpsc::UnboundedSender<Vec<u8>>>,
    receivers: Mutex<HashMap<ContentKind, mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl FakeClipboard {
    pub fn new() -> Self {
        Self::build(false, false)
    }

    pub fn with_echo() -> Self {
        Self::build(true, false)
    }

    pub fn sampling() -> Self {
        Self::build(true, true)
    }

    fn build(echo: bool, sampling: bool) -> Self {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for kind in ContentKind::ALL {
            let (tx, rx) = mpsc::unbounded();
            senders.insert(kind, tx);
            receivers.insert(kind, rx);
        }
        Self {
            writes: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            echo,
            sampling,
            current: Mutex::new(HashMap::new()),
            senders,
            receivers: Mutex::new(receivers),
        }
    }

    /// Put content on the clipboard without reporting a change, as if it was
    /// there before watching started.
    pub fn seed(&self, kind: ContentKind, data: &[u8]) {
        self.current.lock().unwrap().insert(kind, data.to_vec());
    }

    /// Simulate a change made by another application.
    pub fn push(&self, kind: ContentKind, data: &[u8]) {
        let previous = self.current.lock().unwrap().insert(kind, data.to_vec());
        if self.sampling && previous.as_deref() == Some(data) {
            return;
        }
        let _ = self.senders[&kind].unbounded_send(data.to_vec());
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<(ContentKind, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ClipboardProvider for FakeClipboard {
    async fn write(&self, kind: ContentKind, data: &[u8]) -> Result<(), ResolverError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ResolverError::Clipboard("fake write failure".into()));
        }
        self.writes.lock().unwrap().push((kind, data.to_vec()));
        if self.echo {
            self.push(kind, data);
        }
        Ok(())
    }

    fn watch(&self, kind: ContentKind) -> ClipboardEvents {
        match self.receivers.lock().unwrap().remove(&kind) {
            Some(rx) => rx.boxed(),
            None => futures::stream::pending().boxed(),
        }
    }
}

/// Notifier that records every notification.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(true),
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), ResolverError> {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(ResolverError::Notify("fake notify failure".into()));
        }
        Ok(())
    }
}
