//! Telemetry initialization
//!
//! Installs the global tracing subscriber. Filtering follows `RUST_LOG`, with
//! `linkvault=debug` when unset.

mod init_basic;

pub use init_basic::{default_filter, init_telemetry, shutdown_telemetry, TelemetryFormat};
