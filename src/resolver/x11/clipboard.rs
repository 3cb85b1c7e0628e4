//! X11 clipboard provider — write and watch via `xclip`.
//!
//! `xclip` has no change notification, so watching is done by sampling the
//! selection for one target at a fixed interval and emitting whenever the
//! bytes differ from the previous sample.

use std::process::Stdio;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::MissedTickBehavior;

use crate::resolver::{ClipboardEvents, ClipboardProvider, ResolverError};
use crate::wire::protocol::ContentKind;

/// X11 implementation of `ClipboardProvider` via `xclip`.
pub struct XclipProvider {
    poll_interval: Duration,
}

impl XclipProvider {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

/// Selection target requested from xclip for each kind.
fn target_for(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Text => "UTF8_STRING",
        ContentKind::Image => "image/png",
    }
}

#[async_trait::async_trait]
impl ClipboardProvider for XclipProvider {
    async fn write(&self, kind: ContentKind, data: &[u8]) -> Result<(), ResolverError> {
        let mut child = Command::new("xclip")
            .args(["-selection", "clipboard", "-t", target_for(kind), "-i"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ResolverError::Clipboard(format!("failed to spawn xclip: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(data)
                .await
                .map_err(|e| ResolverError::Clipboard(format!("failed to write to xclip: {e}")))?;
            // Drop stdin to close the pipe so xclip can finish.
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ResolverError::Clipboard(format!("failed to wait for xclip: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(ResolverError::Clipboard(format!(
                "xclip exited with status {status}"
            )))
        }
    }

    fn watch(&self, kind: ContentKind) -> ClipboardEvents {
        let target = target_for(kind);
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        futures::stream::unfold(
            (ChangeDetector::default(), ticker),
            move |(mut detector, mut ticker)| async move {
                loop {
                    ticker.tick().await;
                    if let Some(data) = detector.observe(read_target(target).await) {
                        return Some((data, (detector, ticker)));
                    }
                }
            },
        )
        .boxed()
    }
}

/// Read the clipboard selection for one target.
///
/// `None` when the selection is empty or does not offer the target.
async fn read_target(target: &str) -> Option<Vec<u8>> {
    let output = Command::new("xclip")
        .args(["-selection", "clipboard", "-o", "-t", target])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => Some(output.stdout),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, target, "xclip -o failed");
            None
        }
    }
}

/// Turns a series of clipboard samples into change events.
///
/// The first sample only primes the baseline, so content that was on the
/// clipboard before watching started is never reported. After that, a
/// sample is reported when it is present and differs from the previous one.
#[derive(Debug, Default)]
struct ChangeDetector {
    last: Option<Vec<u8>>,
    primed: bool,
}

impl ChangeDetector {
    fn observe(&mut self, current: Option<Vec<u8>>) -> Option<Vec<u8>> {
        if !self.primed {
            self.primed = true;
            self.last = current;
            return None;
        }
        if current == self.last {
            return None;
        }
        self.last.clone_from(&current);
        current
    }
}
