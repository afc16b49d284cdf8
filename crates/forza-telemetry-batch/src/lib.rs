//! Mutex-guarded batch buffer and the ticker that schedules its flushes.
//!
//! A single active vector is owned behind a lock; a flush is the atomic
//! "lock, take, stamp, unlock" sequence described for the pipeline's batch
//! buffer. The active buffer is never handed out by reference: every flush
//! path returns an owned `Vec` so the lock is held only long enough to swap
//! it out.

#![warn(missing_docs, rust_2018_idioms)]

use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use forza_telemetry_wire::TelemetryPacket;
use parking_lot::Mutex;

struct BufferState {
    buf: Vec<TelemetryPacket>,
    last_flush: Instant,
}

/// Accumulates race-on telemetry packets and hands out full batches.
pub struct BatchBuffer {
    state: Mutex<BufferState>,
    buffer_size: usize,
    flush_interval: Duration,
}

impl BatchBuffer {
    /// Creates an empty buffer with the given size threshold and flush
    /// interval.
    pub fn new(buffer_size: usize, flush_interval: Duration) -> Self {
        Self {
            state: Mutex::new(BufferState {
                buf: Vec::with_capacity(buffer_size),
                last_flush: Instant::now(),
            }),
            buffer_size,
            flush_interval,
        }
    }

    /// Appends a packet if it is part of an active race, then checks the
    /// size trigger.
    ///
    /// Packets with `is_race_on == 0` are dropped silently: they are not
    /// part of any race's dataset. Returns the swapped-out batch if this
    /// push brought the buffer to the size threshold.
    pub fn push(&self, packet: TelemetryPacket) -> Option<Vec<TelemetryPacket>> {
        if packet.is_race_on != 1 {
            return None;
        }
        let mut state = self.state.lock();
        state.buf.push(packet);
        if state.buf.len() >= self.buffer_size {
            Some(swap_out_locked(&mut state, self.buffer_size))
        } else {
            None
        }
    }

    /// Swaps the buffer out if the flush interval has elapsed since the
    /// last flush and the buffer is non-empty.
    ///
    /// Intended to be called from a 100ms-resolution ticker; an empty
    /// buffer never triggers a flush regardless of elapsed time.
    pub fn try_flush_due(&self, now: Instant) -> Option<Vec<TelemetryPacket>> {
        let mut state = self.state.lock();
        if state.buf.is_empty() {
            return None;
        }
        if now.duration_since(state.last_flush) >= self.flush_interval {
            Some(swap_out_locked(&mut state, self.buffer_size))
        } else {
            None
        }
    }

    /// Unconditionally swaps the buffer out, if non-empty.
    ///
    /// Used for the race-ended transition trigger, which flushes
    /// regardless of size or elapsed time.
    pub fn flush_now(&self) -> Option<Vec<TelemetryPacket>> {
        let mut state = self.state.lock();
        if state.buf.is_empty() {
            None
        } else {
            Some(swap_out_locked(&mut state, self.buffer_size))
        }
    }
}

fn swap_out_locked(state: &mut BufferState, capacity: usize) -> Vec<TelemetryPacket> {
    let batch = mem::replace(&mut state.buf, Vec::with_capacity(capacity));
    state.last_flush = Instant::now();
    batch
}

/// Runs the 100ms-resolution ticker that checks the time-based flush
/// trigger and hands any due batch to a caller-supplied sink.
pub struct FlushScheduler;

impl FlushScheduler {
    /// Spawns the ticker task. The task stops when `shutdown` fires.
    pub fn spawn<F>(
        buffer: Arc<BatchBuffer>,
        mut on_flush: F,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()>
    where
        F: FnMut(Vec<TelemetryPacket>) + Send + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(100));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Some(batch) = buffer.try_flush_due(Instant::now()) {
                            tracing::debug!(batch_len = batch.len(), "time-triggered flush");
                            on_flush(batch);
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("flush scheduler stopping");
                        break;
                    }
                }
            }
        })
    }
}
