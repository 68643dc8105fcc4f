//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::ContractError;

/// Counters for a single dispatcher, shared by all concurrent invocations
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Files handed to the dispatcher
    received: AtomicU64,
    /// Processor returned a result
    succeeded: AtomicU64,
    /// Any error (includes rejected and timed out)
    failed: AtomicU64,
    /// `InvalidInput` errors: bad file names from the dispatcher, unsafe paths from processors
    rejected: AtomicU64,
    /// Deadline exceeded
    timed_out: AtomicU64,
    /// Bytes consumed from incoming streams
    bytes_read: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn inc_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn inc_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    pub fn add_bytes_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Count a failed invocation by error kind
    pub fn record_failure(&self, error: &ContractError) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        match error {
            ContractError::InvalidInput { .. } => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
            }
            ContractError::Timeout { .. } => {
                self.timed_out.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            rejected: self.rejected(),
            timed_out: self.timed_out(),
            bytes_read: self.bytes_read(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub rejected: u64,
    pub timed_out: u64,
    pub bytes_read: u64,
}
