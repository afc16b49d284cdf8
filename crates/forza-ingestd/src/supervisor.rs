//! Startup and shutdown orchestration.
//!
//! Owns the store connection, the UDP socket, the control API server, and
//! the [`Pipeline`] that ties them together, and drives both in the order
//! laid out for the service: connect the store before binding the socket,
//! and stop accepting datagrams before tearing anything else down.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use forza_telemetry_config::Config;
use forza_telemetry_errors::IngestError;
use forza_telemetry_store::{connect, migrate, BatchSink, PgBatchSink, PgSessionStore, SessionStore};

use crate::pipeline::Pipeline;
use crate::receiver;

/// A fixed pool size; the daemon has no concurrent query workload heavy
/// enough to warrant making this configurable yet.
const POOL_MAX_CONNECTIONS: u32 = 10;

/// Drives one run of the daemon from a validated [`Config`].
pub struct Supervisor {
    config: Config,
}

impl Supervisor {
    /// Builds a supervisor over the given configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs the daemon to completion: connects the store, binds the UDP
    /// socket, starts every long-lived task, waits for a shutdown signal,
    /// and tears everything down in order.
    pub async fn run(self) -> Result<(), IngestError> {
        let pool = connect(&self.config.database_url(), POOL_MAX_CONNECTIONS)
            .await
            .map_err(|err| IngestError::StoreConnectFailed(err.to_string()))?;
        migrate(&pool)
            .await
            .map_err(|err| IngestError::StoreConnectFailed(err.to_string()))?;

        let sink: Arc<dyn BatchSink> = Arc::new(PgBatchSink::new(pool.clone()));
        let session_store: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool.clone()));

        let socket = receiver::bind(&self.config.network_host, self.config.network_port).await?;

        let pipeline = Pipeline::start(
            self.config.queue_capacity,
            self.config.buffer_size,
            Duration::from_secs_f64(self.config.flush_interval_sec),
            sink,
            session_store,
        );

        let receiver_handle = receiver::spawn(socket, pipeline.datagram_tx.clone());

        let api_addr: SocketAddr = ([0, 0, 0, 0], self.config.control_api_port).into();
        let api_listener = tokio::net::TcpListener::bind(api_addr)
            .await
            .map_err(|err| IngestError::BindFailed(err.to_string()))?;
        let api_router = forza_telemetry_api::router(Arc::clone(&pipeline.registry));
        let api_handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(api_listener, api_router).await {
                tracing::error!(error = %err, "control api server error");
            }
        });

        tracing::info!(
            network_port = self.config.network_port,
            control_api_port = self.config.control_api_port,
            "forza-ingestd ready"
        );

        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received, draining");

        receiver_handle.abort();
        pipeline
            .shutdown(Duration::from_secs_f64(self.config.drain_timeout_sec))
            .await;

        api_handle.abort();
        pool.close().await;

        tracing::info!("shutdown complete");
        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to register SIGHUP handler");

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        _ = sigint.recv() => tracing::info!("received SIGINT"),
        _ = sighup.recv() => tracing::info!("received SIGHUP"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "error waiting for ctrl_c");
    }
}
