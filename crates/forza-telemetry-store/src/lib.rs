//! Postgres-backed persistence for the telemetry ingestion pipeline.
//!
//! Two narrow async traits, [`BatchSink`] and [`SessionStore`], are the
//! seam the rest of the pipeline depends on; [`postgres`] provides the real
//! implementations over a shared [`sqlx::PgPool`], and [`test_double`]
//! provides in-memory stand-ins so the consumer loop and control API can be
//! exercised without a real database.

#![warn(missing_docs, rust_2018_idioms)]

mod columns;
pub mod postgres;
pub mod session_registry;

#[cfg(any(test, feature = "test-util"))]
pub mod test_double;

pub use postgres::{connect, migrate, PgBatchSink, PgSessionStore};
pub use session_registry::SessionRegistry;

use async_trait::async_trait;
use forza_telemetry_wire::TelemetryPacket;

/// Errors raised by the store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or the operation exceeded its
    /// timeout.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A query executed but failed.
    #[error("store query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

/// Bulk-writes batches of telemetry packets.
///
/// Implementations are stateless across calls: nothing about one
/// `save_batch` call depends on a previous one, so failures are retried by
/// resubmitting the same batch rather than by carrying over any state.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Persists a batch. An empty batch is a no-op.
    async fn save_batch(&self, batch: &[TelemetryPacket]) -> Result<(), StoreError>;
}

/// Creates and looks up sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a new session row and returns its id.
    async fn create_session(
        &self,
        car_ordinal: i32,
        track_id: &str,
        tuning_config_id: Option<i32>,
    ) -> Result<i64, StoreError>;
}
