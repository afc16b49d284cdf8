//! The UDP telemetry ingestion daemon.
//!
//! [`pipeline`] wires the decode → race-monitor → enrich → buffer → save
//! chain independently of where datagrams come from; [`receiver`] is the
//! real UDP source; [`supervisor`] owns both plus the control API and drives
//! the startup/shutdown sequence.

#![warn(missing_docs, rust_2018_idioms)]

pub mod pipeline;
pub mod receiver;
pub mod supervisor;

pub use pipeline::Pipeline;
pub use supervisor::Supervisor;
