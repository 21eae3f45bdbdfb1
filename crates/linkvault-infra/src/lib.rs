//! Linkvault Infrastructure Library
//!
//! Shared process-level setup for Linkvault binaries:
//! - Telemetry initialization (tracing subscriber with env filter, text or JSON output)

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, TelemetryFormat};
