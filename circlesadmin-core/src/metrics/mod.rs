//! Metrics for admin operations
//!
//! Recorded through the `metrics` facade; nothing is exported unless the host
//! process installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

pub const OPERATIONS_TOTAL: &str = "circlesadmin.operations.total";
pub const OPERATION_DURATION_MS: &str = "circlesadmin.operation.duration_ms";

/// Initialize metrics with descriptions
pub fn init_metrics() {
    describe_counter!(OPERATIONS_TOTAL, "Admin operations by operation and outcome");
    describe_histogram!(OPERATION_DURATION_MS, "Admin operation duration in milliseconds");
}

/// Record one finished admin operation
pub fn record_operation(operation: &'static str, success: bool) {
    let outcome = if success { "ok" } else { "error" };
    counter!(OPERATIONS_TOTAL, "operation" => operation, "outcome" => outcome).increment(1);
}

/// Timer for measuring operation duration
pub struct Timer {
    operation: &'static str,
    start: Instant,
}

impl Timer {
    pub fn start(operation: &'static str) -> Self {
        Self { operation, start: Instant::now() }
    }

    /// Stop the timer and record the duration and outcome
    pub fn finish(self, success: bool) {
        let elapsed = self.start.elapsed();
        histogram!(OPERATION_DURATION_MS, "operation" => self.operation)
            .record(elapsed.as_secs_f64() * 1000.0);
        record_operation(self.operation, success);
    }
}
