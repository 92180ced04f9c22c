//! Telemetry module for logging and metrics.
//!
//! Provides:
//! - Logging configuration and initialization
//! - Counters for capture pipeline statistics

mod logging;
mod metrics;

pub use logging::{init_logging, LogConfig};
pub use metrics::{CaptureMetrics, Counter};
