//! Centralized error types for the ingestion pipeline.
//!
//! Every fallible operation in the pipeline eventually surfaces as an
//! [`IngestError`]. Per-layer crates define their own narrow error types
//! (`DecodeError`, `StoreError`, ...) and this crate only wraps them with
//! `#[from]`, so call sites keep using their precise error type right up
//! until they cross a component boundary.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, rust_2018_idioms)]

/// Top-level error type for the ingestion pipeline.
///
/// Disposition for each variant matches the table in the specification's
/// error handling section: fatal variants carry an [`IngestError::exit_code`],
/// everything else is handled in place by its component (counted, logged,
/// retried) and never reaches `main`.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// UDP socket bind failed at startup.
    #[error("failed to bind UDP socket: {0}")]
    BindFailed(String),

    /// Could not establish the store connection pool at startup.
    #[error("failed to connect to store: {0}")]
    StoreConnectFailed(String),

    /// Configuration failed validation at startup.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A datagram had a length the decoder does not recognize.
    #[error("unsupported packet length: {0}")]
    UnsupportedLength(usize),

    /// A datagram had a recognized length but failed to unpack.
    #[error("malformed packet: {0}")]
    Malformed(String),

    /// The bounded channel was full; the datagram was dropped.
    #[error("channel full, datagram dropped")]
    ChannelFull,

    /// A transient I/O error on the receive socket.
    #[error("socket error: {0}")]
    SocketError(#[source] std::io::Error),

    /// A batch save exhausted its retry budget.
    #[error("save failed after {attempts} attempts, {dropped} packets dropped: {source}")]
    SaveFailed {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Number of packets in the batch that were lost.
        dropped: usize,
        /// The underlying store error from the final attempt.
        #[source]
        source: Box<IngestError>,
    },

    /// Session creation failed; the previous session id is preserved.
    #[error("session create failed: {0}")]
    SessionCreateFailed(String),

    /// The shutdown drain did not complete within the configured timeout.
    #[error("drain timed out, remaining datagrams dropped")]
    DrainTimeout,

    /// A long-lived task panicked.
    #[error("task panicked: {0}")]
    TaskPanic(String),
}

impl IngestError {
    /// The process exit code for startup-fatal variants, if any.
    ///
    /// Returns `None` for every variant that is handled in place by its
    /// component rather than aborting the process.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            IngestError::ConfigInvalid(_) => Some(1),
            IngestError::StoreConnectFailed(_) => Some(2),
            IngestError::BindFailed(_) => Some(3),
            _ => None,
        }
    }

    /// Whether this error should abort the supervisor's startup sequence.
    pub fn is_fatal(&self) -> bool {
        self.exit_code().is_some()
    }
}

/// A specialized `Result` type for ingestion-pipeline operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Redact a config value if its key looks sensitive.
///
/// Matches the spec's `password`, `dsn`, `token`, `secret` key list,
/// case-insensitively, against the tail of a dotted/underscored key path.
pub fn redact_if_sensitive(key: &str, value: &str) -> String {
    const SENSITIVE: [&str; 4] = ["password", "dsn", "token", "secret"];
    let lower = key.to_ascii_lowercase();
    if SENSITIVE.iter().any(|s| lower.ends_with(s)) {
        "***".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_variants_carry_exit_codes() {
        assert_eq!(IngestError::ConfigInvalid("x".into()).exit_code(), Some(1));
        assert_eq!(
            IngestError::StoreConnectFailed("x".into()).exit_code(),
            Some(2)
        );
        assert_eq!(IngestError::BindFailed("x".into()).exit_code(), Some(3));
    }

    #[test]
    fn per_packet_variants_are_not_fatal() {
        assert!(!IngestError::UnsupportedLength(99).is_fatal());
        assert!(!IngestError::Malformed("x".into()).is_fatal());
        assert!(!IngestError::ChannelFull.is_fatal());
        assert!(!IngestError::DrainTimeout.is_fatal());
    }

    #[test]
    fn redacts_sensitive_keys() {
        assert_eq!(redact_if_sensitive("db.password", "hunter2"), "***");
        assert_eq!(redact_if_sensitive("DB_TOKEN", "abc"), "***");
        assert_eq!(redact_if_sensitive("network.host", "0.0.0.0"), "0.0.0.0");
    }

    #[test]
    fn save_failed_display_mentions_dropped_count() {
        let err = IngestError::SaveFailed {
            attempts: 3,
            dropped: 60,
            source: Box::new(IngestError::Malformed("boom".into())),
        };
        assert!(err.to_string().contains("60 packets dropped"));
    }
}
