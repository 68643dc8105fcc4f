//! Host run statistics.

use std::time::Duration;

use observability::DispatchStatsAggregator;

/// Outcome of a single file
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Blob name reported to the dispatcher
    pub name: String,
    /// Processor result or error message
    pub message: String,
    pub success: bool,
}

/// Statistics from a host run
#[derive(Debug, Clone, Default)]
pub struct HostStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Per-file outcomes, in completion order
    pub outcomes: Vec<FileOutcome>,

    /// Dispatch metrics aggregator
    pub dispatch_metrics: DispatchStatsAggregator,
}

impl HostStats {
    pub fn succeeded(&self) -> u64 {
        self.dispatch_metrics.succeeded
    }

    pub fn failed(&self) -> u64 {
        self.dispatch_metrics.failed()
    }

    /// Files per second throughput
    pub fn files_per_sec(&self) -> f64 {
        let total = self.succeeded() + self.failed();
        if self.duration.as_secs_f64() > 0.0 {
            total as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Dispatch Statistics ===\n");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Files/s: {:.2}", self.files_per_sec());

        for outcome in &self.outcomes {
            let mark = if outcome.success { "✓" } else { "✗" };
            println!("  {} {}: {}", mark, outcome.name, outcome.message);
        }

        println!("\n{}", self.dispatch_metrics.summary());
    }
}
