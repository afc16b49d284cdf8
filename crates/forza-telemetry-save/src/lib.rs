//! Background save executor.
//!
//! Each flushed batch becomes a detached save task registered in an
//! in-flight set. [`tokio::task::JoinSet`] is the in-flight set: it removes
//! a task the moment [`tokio::task::JoinSet::join_next`] observes its
//! completion, so no separate deregistration bookkeeping is needed. The
//! executor is owned exclusively by the consumer loop; it is not meant to
//! be shared across tasks.

#![warn(missing_docs, rust_2018_idioms)]

use std::sync::Arc;
use std::time::Duration;

use forza_telemetry_store::BatchSink;
use forza_telemetry_wire::TelemetryPacket;
use tokio::task::JoinSet;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_millis(500),
    Duration::from_millis(1_000),
    Duration::from_millis(1_500),
];

/// Spawns and tracks in-flight batch save tasks, retrying each batch on
/// failure before dropping it.
pub struct SaveExecutor {
    sink: Arc<dyn BatchSink>,
    tasks: JoinSet<()>,
}

impl SaveExecutor {
    /// Creates an executor that saves through the given sink.
    pub fn new(sink: Arc<dyn BatchSink>) -> Self {
        Self {
            sink,
            tasks: JoinSet::new(),
        }
    }

    /// Hands a flushed batch to a new save task.
    pub fn submit(&mut self, batch: Vec<TelemetryPacket>) {
        let sink = Arc::clone(&self.sink);
        let batch_len = batch.len();
        self.tasks.spawn(async move {
            save_with_retry(sink.as_ref(), batch).await;
        });
        tracing::debug!(batch_len, in_flight = self.tasks.len(), "batch submitted to save executor");
    }

    /// Joins every currently-registered save task.
    ///
    /// Used during shutdown to make sure no batch is left saving in the
    /// background past the point the process exits.
    pub async fn await_inflight(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(join_err) = result {
                tracing::error!(error = %join_err, "save task panicked");
            }
        }
    }

    /// Number of save tasks currently registered.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }
}

async fn save_with_retry(sink: &dyn BatchSink, batch: Vec<TelemetryPacket>) {
    let mut last_error = None;
    for attempt in 1..=MAX_ATTEMPTS {
        match sink.save_batch(&batch).await {
            Ok(()) => return,
            Err(err) => {
                tracing::warn!(attempt, error = %err, "batch save attempt failed");
                last_error = Some(err);
                tokio::time::sleep(RETRY_DELAYS[(attempt - 1) as usize]).await;
            }
        }
    }
    tracing::error!(
        dropped = batch.len(),
        attempts = MAX_ATTEMPTS,
        error = ?last_error,
        "batch save exhausted retries, dropping batch"
    );
}
