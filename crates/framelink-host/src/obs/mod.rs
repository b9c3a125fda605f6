//! Lightweight in-process dispatcher metrics.
//!
//! Counters are stored as atomics and rendered in Prometheus text format on
//! demand.

pub mod metrics;

pub use metrics::{CounterVec, GaugeVec, HostMetrics};
