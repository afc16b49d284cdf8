//! The real UDP datagram source.
//!
//! Everything downstream of a datagram lives in [`crate::pipeline`]; this
//! module only owns the socket and the drop-tail policy for a full channel.

use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use forza_telemetry_errors::IngestError;

/// Larger than the largest known Data Out datagram (324 bytes), with room
/// to spare for future padded variants.
const MAX_DATAGRAM_SIZE: usize = 1024;

/// How often a sustained drop run is allowed to log a warning.
const DROP_WARN_INTERVAL: Duration = Duration::from_secs(1);

/// Binds the UDP socket datagrams are received on.
pub async fn bind(host: &str, port: u16) -> Result<UdpSocket, IngestError> {
    UdpSocket::bind((host, port))
        .await
        .map_err(|err| IngestError::BindFailed(err.to_string()))
}

/// Spawns the receive loop. The task runs until aborted by the caller; it
/// never exits on its own.
pub fn spawn(socket: UdpSocket, tx: mpsc::Sender<Vec<u8>>) -> JoinHandle<()> {
    tokio::spawn(receive_loop(socket, tx))
}

async fn receive_loop(socket: UdpSocket, tx: mpsc::Sender<Vec<u8>>) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    let mut dropped_since_warn: u64 = 0;
    let mut last_warn = Instant::now() - DROP_WARN_INTERVAL;

    loop {
        let (len, _addr) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(error = %err, "transient socket error");
                continue;
            }
        };

        match tx.try_send(buf[..len].to_vec()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                dropped_since_warn += 1;
                if last_warn.elapsed() >= DROP_WARN_INTERVAL {
                    tracing::warn!(dropped_since_warn, "queue full, dropping datagrams");
                    dropped_since_warn = 0;
                    last_warn = Instant::now();
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("datagram channel closed, receive loop stopping");
                break;
            }
        }
    }
}
