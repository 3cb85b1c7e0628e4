//! Clipboard change watchers — one loop per content kind.
//!
//! Each loop consumes its kind's change-event stream and feeds every event
//! through the store's pending echoes: our own writes are swallowed, genuine
//! local changes are stamped with the current time. The loops share
//! nothing but the store's lock and a cancellation token.

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::state::{ClipboardStore, Observed};
use crate::resolver::{ClipboardEvents, ClipboardProvider};
use crate::wire::codec::ClipContent;
use crate::wire::protocol::ContentKind;

/// Spawn one watcher task per content kind.
pub fn spawn_watchers(
    store: Arc<ClipboardStore>,
    clipboard: &Arc<dyn ClipboardProvider>,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    ContentKind::ALL
        .into_iter()
        .map(|kind| {
            let events = clipboard.watch(kind);
            tokio::spawn(watch(store.clone(), kind, events, cancel.clone()))
        })
        .collect()
}

/// Run one watcher loop until cancelled or the event stream ends.
pub async fn watch(
    store: Arc<ClipboardStore>,
    kind: ContentKind,
    mut events: ClipboardEvents,
    cancel: CancellationToken,
) {
    tracing::debug!(%kind, "watcher started");
    loop {
        let raw = tokio::select! {
            _ = cancel.cancelled() => break,
            next = events.next() => match next {
                Some(raw) => raw,
                None => {
                    tracing::warn!(%kind, "clipboard change stream ended");
                    break;
                }
            },
        };

        let content = ClipContent::from_raw(kind, raw);
        match store.observe_change(content).await {
            Observed::Suppressed(origin) => {
                tracing::debug!(%kind, %origin, "own clipboard write ignored");
            }
            Observed::Applied(version) => {
                tracing::info!(%kind, version, "local clipboard change");
            }
        }
    }
    tracing::debug!(%kind, "watcher stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sync::state::{ClipboardState, Snapshot};
    use crate::sync::testing::{FakeClipboard, ManualClock};

    fn text(s: &str) -> ClipContent {
        ClipContent::Text(s.into())
    }

    /// Poll the store until `pred` holds or a second has passed.
    async fn wait_for(store: &ClipboardStore, pred: impl Fn(&Snapshot) -> bool) -> Snapshot {
        for _ in 0..100 {
            let snap = store.snapshot().await;
            if pred(&snap) {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        store.snapshot().await
    }

    fn setup(fake: FakeClipboard) -> (Arc<FakeClipboard>, Arc<ClipboardStore>, CancellationToken) {
        let fake = Arc::new(fake);
        let store = Arc::new(ClipboardStore::new(
            ClipboardState::with_content(text("hello"), 1000),
            fake.clone(),
            Arc::new(ManualClock::new(5000)),
        ));
        (fake, store, CancellationToken::new())
    }

    #[tokio::test]
    async fn local_text_change_is_stamped() {
        let (fake, store, cancel) = setup(FakeClipboard::new());
        let provider: Arc<dyn ClipboardProvider> = fake.clone();
        let tasks = spawn_watchers(store.clone(), &provider, &cancel);

        fake.push(ContentKind::Text, b"copied");
        let snap = wait_for(&store, |s| s.version == 5000).await;
        assert_eq!(snap, Snapshot { content: text("copied"), version: 5000 });

        cancel.cancel();
        for t in tasks {
            t.await.unwrap();
        }
    }

    #[tokio::test]
    async fn local_image_change_is_stamped() {
        let (fake, store, cancel) = setup(FakeClipboard::new());
        let provider: Arc<dyn ClipboardProvider> = fake.clone();
        let _tasks = spawn_watchers(store.clone(), &provider, &cancel);

        fake.push(ContentKind::Image, &[9, 9, 9]);
        let snap = wait_for(&store, |s| s.version == 5000).await;
        assert_eq!(snap.content, ClipContent::Image(vec![9, 9, 9]));
        cancel.cancel();
    }

    #[tokio::test]
    async fn remote_write_echo_is_swallowed() {
        let (fake, store, cancel) = setup(FakeClipboard::with_echo());
        let provider: Arc<dyn ClipboardProvider> = fake.clone();
        let _tasks = spawn_watchers(store.clone(), &provider, &cancel);

        store.set_remote(text("x"), 100).await.unwrap();
        // Queued behind the echo: a genuine change. If the echo had been
        // applied as local, this event would have consumed the arm instead.
        fake.push(ContentKind::Text, b"y");

        let snap = wait_for(&store, |s| s.content == text("y")).await;
        assert_eq!(snap, Snapshot { content: text("y"), version: 5000 });
        assert!(!store.with_state(|s| s.echo_armed()).await);
        cancel.cancel();
    }

    #[tokio::test]
    async fn echo_alone_keeps_remote_version() {
        let (fake, store, cancel) = setup(FakeClipboard::with_echo());
        let provider: Arc<dyn ClipboardProvider> = fake.clone();
        let _tasks = spawn_watchers(store.clone(), &provider, &cancel);

        store.set_remote(text("x"), 100).await.unwrap();
        // Wait for the watcher to consume the arm.
        for _ in 0..100 {
            if !store.with_state(|s| s.echo_armed()).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            store.snapshot().await,
            Snapshot { content: text("x"), version: 100 }
        );
        cancel.cancel();
    }

    #[tokio::test]
    async fn queued_echoes_keep_last_remote_version() {
        let (fake, store, cancel) = setup(FakeClipboard::with_echo());
        store.set_remote(text("x"), 100).await.unwrap();
        store.set_remote(text("y"), 200).await.unwrap();

        let provider: Arc<dyn ClipboardProvider> = fake.clone();
        let _tasks = spawn_watchers(store.clone(), &provider, &cancel);
        for _ in 0..100 {
            if !store.with_state(|s| s.echo_armed()).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            store.snapshot().await,
            Snapshot { content: text("y"), version: 200 }
        );
        cancel.cancel();
    }

    #[tokio::test]
    async fn cancellation_stops_loops() {
        let (fake, store, cancel) = setup(FakeClipboard::new());
        let provider: Arc<dyn ClipboardProvider> = fake.clone();
        let tasks = spawn_watchers(store, &provider, &cancel);
        cancel.cancel();
        for t in tasks {
            tokio::time::timeout(Duration::from_secs(1), t)
                .await
                .expect("watcher did not stop")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn ended_stream_stops_loop() {
        let (_fake, store, cancel) = setup(FakeClipboard::new());
        let events: ClipboardEvents = futures::stream::iter(vec![b"last".to_vec()]).boxed();
        watch(store.clone(), ContentKind::Text, events, cancel).await;
        assert_eq!(store.snapshot().await.content, text("last"));
    }
}
