//! Device registry — last-seen time per polling client.
//!
//! Consulted only by POLL to tell a first contact (no record, or silent
//! for longer than the liveness window) from an ongoing session. Records
//! are never removed; a stale record is just treated as absent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::clock::Clock;

/// Default liveness window.
pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(120);

/// One known device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub client_id: String,
    /// Unix seconds of the most recent POLL.
    pub last_seen_at: i64,
}

/// Client identity → last-seen registry.
///
/// The map lock is held only for the map access itself, so concurrent
/// polls from distinct identities never interfere.
pub struct DeviceRegistry {
    devices: Mutex<HashMap<String, i64>>,
    window_secs: i64,
    clock: Arc<dyn Clock>,
}

impl DeviceRegistry {
    pub fn new(liveness_window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
            window_secs: i64::try_from(liveness_window.as_secs()).unwrap_or(i64::MAX),
            clock,
        }
    }

    /// Classify a POLL from `client_id` and stamp it as seen now.
    ///
    /// Returns whether the poll is a first contact, judged against the
    /// previous stamp. Check and stamp happen under one guard, so of two
    /// concurrent polls from a new identity only one is a first contact.
    pub fn check_in(&self, client_id: &str) -> bool {
        let now = self.clock.now();
        let mut devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        let first_contact = self.expired(devices.get(client_id).copied(), now);
        match devices.get_mut(client_id) {
            Some(last_seen) => *last_seen = now,
            None => {
                tracing::info!(client = client_id, "new device");
                devices.insert(client_id.to_string(), now);
            }
        }
        first_contact
    }

    /// True if `client_id` was never seen, or was last seen longer ago than
    /// the liveness window. A timed-out device is indistinguishable from a
    /// brand-new one.
    pub fn is_first_contact(&self, client_id: &str) -> bool {
        let now = self.clock.now();
        let devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        self.expired(devices.get(client_id).copied(), now)
    }

    fn expired(&self, last_seen: Option<i64>, now: i64) -> bool {
        match last_seen {
            Some(last_seen) => now.saturating_sub(last_seen) > self.window_secs,
            None => true,
        }
    }

    /// All known devices, including stale ones.
    pub fn devices(&self) -> Vec<DeviceRecord> {
        let devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        devices
            .iter()
            .map(|(client_id, &last_seen_at)| DeviceRecord {
                client_id: client_id.clone(),
                last_seen_at,
            })
            .collect()
    }
}
