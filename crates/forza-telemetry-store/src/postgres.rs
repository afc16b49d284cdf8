//! `sqlx`-backed implementations of [`crate::BatchSink`] and
//! [`crate::SessionStore`].

use std::time::Duration;

use async_trait::async_trait;
use forza_telemetry_wire::TelemetryPacket;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::columns::{write_row, COLUMN_LIST};
use crate::{BatchSink, SessionStore, StoreError};

/// Per-batch save timeout, per the fixed 10s budget.
const SAVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens a connection pool against `database_url`.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))
}

/// Runs the embedded schema migrations against `pool`.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))
}

/// Bulk-writes batches into `telemetry_packets` via Postgres's native
/// `COPY ... FROM STDIN` path.
pub struct PgBatchSink {
    pool: PgPool,
}

impl PgBatchSink {
    /// Builds a sink over an already-connected pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchSink for PgBatchSink {
    async fn save_batch(&self, batch: &[TelemetryPacket]) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut payload = String::new();
        for packet in batch {
            write_row(&mut payload, packet);
        }

        let copy_stmt = format!("COPY telemetry_packets ({COLUMN_LIST}) FROM STDIN");
        let pool = self.pool.clone();

        tokio::time::timeout(SAVE_TIMEOUT, async move {
            let mut copy = pool.copy_in_raw(&copy_stmt).await?;
            copy.send(payload.into_bytes()).await?;
            copy.finish().await?;
            Ok::<(), sqlx::Error>(())
        })
        .await
        .map_err(|_| StoreError::Unavailable("batch save timed out".to_string()))??;

        Ok(())
    }
}

/// Creates single session rows outside the bulk path.
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Builds a store over an already-connected pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create_session(
        &self,
        car_ordinal: i32,
        track_id: &str,
        tuning_config_id: Option<i32>,
    ) -> Result<i64, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO sessions (car_ordinal, track_id, tuning_config_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(car_ordinal)
        .bind(track_id)
        .bind(tuning_config_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}
