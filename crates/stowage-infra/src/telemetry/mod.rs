//! Tracing initialization
//!
//! Installs a global `tracing` subscriber filtered by `RUST_LOG`, writing either human-readable
//! lines or JSON objects.

mod init_basic;

pub use init_basic::{init_telemetry, LogFormat, DEFAULT_FILTER};
