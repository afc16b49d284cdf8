//! In-memory [`BatchSink`]/[`SessionStore`] stand-ins.
//!
//! Let the consumer loop, save executor, and control API all be exercised
//! in integration tests without a real Postgres instance.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use forza_telemetry_wire::TelemetryPacket;
use parking_lot::Mutex;

use crate::{BatchSink, SessionStore, StoreError};

/// Records every batch it is given, in order, behind a shared lock.
#[derive(Clone, Default)]
pub struct InMemoryBatchSink {
    batches: Arc<Mutex<Vec<Vec<TelemetryPacket>>>>,
}

impl InMemoryBatchSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of every batch saved so far, in save order.
    pub fn saved_batches(&self) -> Vec<Vec<TelemetryPacket>> {
        self.batches.lock().clone()
    }

    /// Total packets saved across all batches.
    pub fn saved_packet_count(&self) -> usize {
        self.batches.lock().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl BatchSink for InMemoryBatchSink {
    async fn save_batch(&self, batch: &[TelemetryPacket]) -> Result<(), StoreError> {
        self.batches.lock().push(batch.to_vec());
        Ok(())
    }
}

/// A [`BatchSink`] that fails every call, for exercising the save
/// executor's retry and drop path.
#[derive(Clone, Default)]
pub struct AlwaysFailingBatchSink;

#[async_trait]
impl BatchSink for AlwaysFailingBatchSink {
    async fn save_batch(&self, _batch: &[TelemetryPacket]) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("test double always fails".to_string()))
    }
}

/// Hands out sequential in-memory session ids starting at 1.
#[derive(Default)]
pub struct InMemorySessionStore {
    next_id: AtomicI64,
}

impl InMemorySessionStore {
    /// Creates a store whose first created session has id 1.
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(
        &self,
        _car_ordinal: i32,
        _track_id: &str,
        _tuning_config_id: Option<i32>,
    ) -> Result<i64, StoreError> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}
