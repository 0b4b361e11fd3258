//! Telemetry for event loops.
//!
//! Counters and a handoff latency histogram, compiled to a no-op stub when
//! the `telemetry` feature is off.

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub use metrics::{Metrics, MetricsSnapshot};

// Stub implementation when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub mod metrics {
    use std::time::Duration;

    #[derive(Debug, Clone, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self { Self }
        pub fn record_submit(&self) {}
        pub fn record_rejected(&self) {}
        pub fn record_completed(&self, _: Duration) {}
        pub fn record_failed(&self, _: Duration) {}
        pub fn record_callback_failure(&self) {}
        pub fn snapshot(&self) -> MetricsSnapshot { MetricsSnapshot::default() }
    }

    #[derive(Debug, Clone, Default)]
    pub struct MetricsSnapshot {
        pub uptime: Duration,
        pub tasks_submitted: u64,
        pub tasks_completed: u64,
        pub tasks_failed: u64,
        pub callback_failures: u64,
        pub rejected: u64,
        pub avg_latency_ns: u64,
        pub p50_latency_ns: u64,
        pub p99_latency_ns: u64,
        pub max_latency_ns: u64,
    }

    impl MetricsSnapshot {
        pub fn tasks_delivered(&self) -> u64 { self.tasks_completed + self.tasks_failed }
        pub fn tasks_per_second(&self) -> f64 { 0.0 }
    }
}

#[cfg(not(feature = "telemetry"))]
pub use metrics::{Metrics, MetricsSnapshot};
