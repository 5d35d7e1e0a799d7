//! Stowage Infrastructure
//!
//! Process-level plumbing shared by binaries: tracing subscriber setup.

pub mod telemetry;

pub use telemetry::{init_telemetry, LogFormat};
