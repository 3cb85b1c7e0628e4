//! Notifier trait and the `notify-send` adapter.

use std::process::Stdio;

use tokio::process::Command;

use super::ResolverError;

/// Shows a transient desktop notification.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str) -> Result<(), ResolverError>;
}

/// Freedesktop notifications via the `notify-send` binary.
pub struct NotifySend;

#[async_trait::async_trait]
impl Notifier for NotifySend {
    async fn notify(&self, title: &str, body: &str) -> Result<(), ResolverError> {
        let status = Command::new("notify-send")
            .args(["--app-name=clipsyncd", "--", title, body])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| ResolverError::Notify(format!("failed to spawn notify-send: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(ResolverError::Notify(format!(
                "notify-send exited with status {status}"
            )))
        }
    }
}
