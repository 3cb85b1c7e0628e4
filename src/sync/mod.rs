//! Sync server — versioned clipboard store, change watchers, HTTP endpoint.
//!
//! The desktop side of a two-endpoint clipboard shared over LAN polling.
//! One [`state::ClipboardStore`] is the single source of truth; it is
//! mutated by the two watcher loops (local changes) and by SET requests
//! (remote changes), and read by GET and POLL. Nothing is global: the
//! store, device registry and collaborators are built here and handed to
//! the router and watchers.
//!
//! All state is in-memory only and lost on exit.

pub mod clock;
pub mod handler;
pub mod http;
pub mod registry;
pub mod state;
pub mod watcher;

#[cfg(test)]
pub mod testing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use clock::{Clock, SystemClock};
use handler::SyncEngine;
use http::AppState;
use registry::DeviceRegistry;
use state::{ClipboardState, ClipboardStore};

use crate::resolver::ResolverSet;

/// How long in-flight requests may drain after shutdown is requested.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Server settings, resolved from the command line.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    /// `None` disables the `X-Password` check.
    pub password: Option<String>,
    pub notify: bool,
    pub liveness_window: Duration,
}

/// Server startup/runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the sync server until SIGTERM or SIGINT.
///
/// # Errors
///
/// Returns `ServeError` if the listener cannot be bound (fatal at startup),
/// signal handlers cannot be installed, or the server fails while running.
///
/// On shutdown both watcher loops stop, and the HTTP server is given
/// [`SHUTDOWN_GRACE`] to drain before it is aborted.
pub async fn run(config: ServeConfig, resolvers: ResolverSet) -> Result<(), ServeError> {
    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| ServeError::BindFailed {
            addr: config.bind,
            source,
        })?;
    tracing::info!(addr = %listener.local_addr()?, "sync server listening");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(ClipboardStore::new(
        ClipboardState::new(),
        resolvers.clipboard.clone(),
        clock.clone(),
    ));
    let registry = DeviceRegistry::new(config.liveness_window, clock);
    let app = Arc::new(AppState {
        engine: SyncEngine::new(store.clone(), registry),
        notifier: resolvers.notifier,
        notify: config.notify,
        password: config.password,
    });

    let cancel = CancellationToken::new();
    let watchers = watcher::spawn_watchers(store, &resolvers.clipboard, &cancel);
    let mut server = tokio::spawn(serve(listener, app.clone(), cancel.clone()));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
        joined = &mut server => {
            cancel.cancel();
            joined??;
            tracing::warn!("server exited unexpectedly");
            return Ok(());
        }
    }

    cancel.cancel();
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
        Ok(joined) => joined??,
        Err(_) => {
            server.abort();
            tracing::warn!(grace = ?SHUTDOWN_GRACE, "drain timed out, connections closed");
        }
    }
    for w in watchers {
        let _ = w.await;
    }

    let registry = app.engine.registry();
    for device in registry.devices() {
        tracing::debug!(
            client = %device.client_id,
            last_seen_at = device.last_seen_at,
            live = !registry.is_first_contact(&device.client_id),
            "known device"
        );
    }
    let snapshot = app.engine.snapshot().await;
    tracing::info!(
        kind = %snapshot.content.kind(),
        version = snapshot.version,
        "sync server stopped"
    );
    Ok(())
}

/// Serve the sync endpoints on `listener` until `cancel` fires, then drain.
pub async fn serve(
    listener: TcpListener,
    app: Arc<AppState>,
    cancel: CancellationToken,
) -> Result<(), ServeError> {
    axum::serve(listener, http::router(app))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    Ok(())
}
