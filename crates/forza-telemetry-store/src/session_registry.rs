//! Tracks the currently active session id.
//!
//! Reads (the consumer loop's per-packet enrichment) and writes (the
//! control API's start/stop handlers) both go through a short-lived lock,
//! so neither side ever blocks the other for longer than a pointer
//! assignment.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{SessionStore, StoreError};
use forza_telemetry_wire::TelemetryPacket;

/// The active session id, backed by a [`SessionStore`] for creation.
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    current: Mutex<Option<i64>>,
}

impl SessionRegistry {
    /// Creates a registry with no active session.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            current: Mutex::new(None),
        }
    }

    /// Creates a new session and makes it the active one.
    ///
    /// On failure the previously active session id, if any, is left
    /// untouched.
    pub async fn create(
        &self,
        car_ordinal: i32,
        track_id: &str,
        tuning_config_id: Option<i32>,
    ) -> Result<i64, StoreError> {
        let id = self
            .store
            .create_session(car_ordinal, track_id, tuning_config_id)
            .await?;
        *self.current.lock() = Some(id);
        Ok(id)
    }

    /// Clears the active session id.
    pub fn clear(&self) {
        *self.current.lock() = None;
    }

    /// Returns the active session id, if any.
    pub fn current(&self) -> Option<i64> {
        *self.current.lock()
    }

    /// Returns a copy of `packet` with `session_id` set to the active
    /// session, if one is set. With no active session the packet is
    /// returned unchanged.
    pub fn enrich(&self, mut packet: TelemetryPacket) -> TelemetryPacket {
        if let Some(id) = self.current() {
            packet.session_id = Some(id);
        }
        packet
    }
}
