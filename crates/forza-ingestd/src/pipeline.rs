//! The decode → race-monitor → enrich → buffer → save chain.
//!
//! [`Pipeline`] owns every task between "a datagram arrived" and "a batch is
//! durably saved or exhausted its retries", but nothing about where
//! datagrams come from or where the control API listens. [`crate::receiver`]
//! and [`crate::supervisor`] supply those around it in production; tests
//! drive `datagram_tx` directly and never need a socket or a database.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use forza_telemetry_batch::{BatchBuffer, FlushScheduler};
use forza_telemetry_race::{RaceEvent, RaceStateMonitor};
use forza_telemetry_save::SaveExecutor;
use forza_telemetry_store::{BatchSink, SessionRegistry, SessionStore};
use forza_telemetry_wire::{decode, TelemetryPacket};

/// A running pipeline: consumer loop, flush ticker, and save executor.
pub struct Pipeline {
    /// Feeds raw datagrams into the consumer loop.
    pub datagram_tx: mpsc::Sender<Vec<u8>>,
    /// The session registry shared with the control API.
    pub registry: Arc<SessionRegistry>,
    buffer: Arc<BatchBuffer>,
    flush_tx: mpsc::UnboundedSender<Vec<TelemetryPacket>>,
    consumer_handle: JoinHandle<()>,
    ticker_stop: broadcast::Sender<()>,
    ticker_handle: JoinHandle<()>,
    save_handle: JoinHandle<()>,
}

impl Pipeline {
    /// Starts the consumer loop, flush ticker, and save executor.
    ///
    /// `queue_capacity` bounds the datagram channel; datagrams that arrive
    /// while it is full are the caller's problem to drop (see
    /// [`crate::receiver`]), not this pipeline's.
    pub fn start(
        queue_capacity: usize,
        buffer_size: usize,
        flush_interval: Duration,
        sink: Arc<dyn BatchSink>,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        let (datagram_tx, datagram_rx) = mpsc::channel(queue_capacity);
        let (flush_tx, flush_rx) = mpsc::unbounded_channel();
        let (ticker_stop, ticker_stop_rx) = broadcast::channel(1);

        let registry = Arc::new(SessionRegistry::new(session_store));
        let buffer = Arc::new(BatchBuffer::new(buffer_size, flush_interval));
        let executor = SaveExecutor::new(sink);

        let consumer_handle = tokio::spawn(consumer_loop(
            datagram_rx,
            Arc::clone(&buffer),
            Arc::clone(&registry),
            flush_tx.clone(),
        ));

        let ticker_handle = {
            let flush_tx = flush_tx.clone();
            FlushScheduler::spawn(
                Arc::clone(&buffer),
                move |batch| {
                    let _ = flush_tx.send(batch);
                },
                ticker_stop_rx,
            )
        };

        let save_handle = tokio::spawn(save_loop(flush_rx, executor));

        Self {
            datagram_tx,
            registry,
            buffer,
            flush_tx,
            consumer_handle,
            ticker_stop,
            ticker_handle,
            save_handle,
        }
    }

    /// Runs the shutdown sequence: stop accepting new datagrams, drain the
    /// in-flight channel up to `drain_timeout`, cancel the consumer and
    /// ticker, force a final flush, then wait for every in-flight save.
    pub async fn shutdown(self, drain_timeout: Duration) {
        drop(self.datagram_tx);

        let mut consumer_handle = self.consumer_handle;
        match tokio::time::timeout(drain_timeout, &mut consumer_handle).await {
            Ok(Ok(())) => {}
            Ok(Err(join_err)) => tracing::error!(error = %join_err, "consumer task panicked"),
            Err(_) => {
                consumer_handle.abort();
                tracing::warn!("drain timed out, remaining datagrams dropped");
            }
        }

        let _ = self.ticker_stop.send(());
        if let Err(join_err) = self.ticker_handle.await {
            if !join_err.is_cancelled() {
                tracing::error!(error = %join_err, "flush ticker task panicked");
            }
        }

        if let Some(batch) = self.buffer.flush_now() {
            let _ = self.flush_tx.send(batch);
        }
        drop(self.flush_tx);

        if let Err(join_err) = self.save_handle.await {
            tracing::error!(error = %join_err, "save task panicked");
        }
    }
}

async fn consumer_loop(
    mut datagram_rx: mpsc::Receiver<Vec<u8>>,
    buffer: Arc<BatchBuffer>,
    registry: Arc<SessionRegistry>,
    flush_tx: mpsc::UnboundedSender<Vec<TelemetryPacket>>,
) {
    let mut monitor = RaceStateMonitor::new();
    while let Some(datagram) = datagram_rx.recv().await {
        let packet = match decode(&datagram) {
            Ok(packet) => packet,
            Err(err) => {
                tracing::warn!(error = %err, "dropping unusable datagram");
                continue;
            }
        };

        let event = monitor.observe(&packet);
        let enriched = registry.enrich(packet);

        if let Some(batch) = buffer.push(enriched) {
            tracing::debug!(batch_len = batch.len(), "size-triggered flush");
            let _ = flush_tx.send(batch);
        }

        if let Some(RaceEvent::Ended { current_race_time }) = event {
            tracing::info!(current_race_time, "race ended, flushing buffer");
            if let Some(batch) = buffer.flush_now() {
                let _ = flush_tx.send(batch);
            }
        }
    }
    tracing::debug!("consumer loop stopped, datagram channel closed");
}

async fn save_loop(
    mut flush_rx: mpsc::UnboundedReceiver<Vec<TelemetryPacket>>,
    mut executor: SaveExecutor,
) {
    while let Some(batch) = flush_rx.recv().await {
        executor.submit(batch);
    }
    executor.await_inflight().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use forza_telemetry_store::test_double::{InMemoryBatchSink, InMemorySessionStore};
    use forza_telemetry_wire::CAR_DASH_LEN;

    fn datagram(is_race_on: i32) -> Vec<u8> {
        let mut data = vec![0u8; CAR_DASH_LEN];
        data[0..4].copy_from_slice(&is_race_on.to_le_bytes());
        data
    }

    #[tokio::test]
    async fn malformed_datagrams_are_dropped_without_stopping_the_pipeline() {
        let sink = Arc::new(InMemoryBatchSink::new());
        let pipeline = Pipeline::start(
            16,
            2,
            Duration::from_secs(100),
            sink.clone(),
            Arc::new(InMemorySessionStore::new()),
        );

        pipeline.datagram_tx.send(vec![0u8; 7]).await.unwrap();
        pipeline.datagram_tx.send(datagram(1)).await.unwrap();
        pipeline.datagram_tx.send(datagram(1)).await.unwrap();

        // the two valid packets reach the size threshold and flush
        tokio::time::sleep(Duration::from_millis(50)).await;
        pipeline.shutdown(Duration::from_secs(1)).await;

        assert_eq!(sink.saved_packet_count(), 2);
    }

    #[tokio::test]
    async fn race_end_forces_a_flush_below_the_size_threshold() {
        let sink = Arc::new(InMemoryBatchSink::new());
        let pipeline = Pipeline::start(
            16,
            100,
            Duration::from_secs(100),
            sink.clone(),
            Arc::new(InMemorySessionStore::new()),
        );

        pipeline.datagram_tx.send(datagram(1)).await.unwrap();
        pipeline.datagram_tx.send(datagram(1)).await.unwrap();
        pipeline.datagram_tx.send(datagram(0)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        pipeline.shutdown(Duration::from_secs(1)).await;

        assert_eq!(sink.saved_packet_count(), 2);
    }

    #[tokio::test]
    async fn shutdown_flushes_a_partial_buffer() {
        let sink = Arc::new(InMemoryBatchSink::new());
        let pipeline = Pipeline::start(
            16,
            100,
            Duration::from_secs(100),
            sink.clone(),
            Arc::new(InMemorySessionStore::new()),
        );

        pipeline.datagram_tx.send(datagram(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        pipeline.shutdown(Duration::from_secs(1)).await;

        assert_eq!(sink.saved_packet_count(), 1);
    }

    #[tokio::test]
    async fn session_id_is_stamped_onto_packets_once_a_session_is_active() {
        let sink = Arc::new(InMemoryBatchSink::new());
        let pipeline = Pipeline::start(
            16,
            1,
            Duration::from_secs(100),
            sink.clone(),
            Arc::new(InMemorySessionStore::new()),
        );

        pipeline.registry.create(1, "laguna-seca", None).await.unwrap();
        pipeline.datagram_tx.send(datagram(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        pipeline.shutdown(Duration::from_secs(1)).await;

        let batches = sink.saved_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].session_id, Some(1));
    }
}
