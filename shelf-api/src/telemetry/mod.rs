//! Shelf Telemetry - Logging Infrastructure
//!
//! Structured `tracing` output configured from the environment.

pub mod tracer;

pub use tracer::{init_tracing, LogFormat, TelemetryConfig};
