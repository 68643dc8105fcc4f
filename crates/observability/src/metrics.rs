//! 分发指标收集模块
//!
//! 通过 `metrics` facade 记录每次分发的结果，并在内存中聚合延迟统计。

use std::collections::HashMap;

use metrics::{counter, histogram};

/// 记录文件到达
pub fn record_file_received(processor: &str) {
    counter!(
        "ingest_files_received_total",
        "processor" => processor.to_string()
    )
    .increment(1);
}

/// 记录分发结果
///
/// `outcome` 取值: `success` / `invalid_input` / `processor_failure` / `timeout` / ...
pub fn record_dispatch_outcome(processor: &str, outcome: &str) {
    counter!(
        "ingest_dispatch_total",
        "processor" => processor.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录单次分发耗时
pub fn record_dispatch_latency_ms(processor: &str, latency_ms: f64) {
    histogram!(
        "ingest_dispatch_latency_ms",
        "processor" => processor.to_string()
    )
    .record(latency_ms);
}

/// 记录从输入流读取的字节数
pub fn record_bytes_read(processor: &str, bytes: u64) {
    counter!(
        "ingest_bytes_read_total",
        "processor" => processor.to_string()
    )
    .increment(bytes);
}

/// 分发指标聚合器
///
/// 在内存中聚合指标，便于输出运行摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// 成功次数
    pub succeeded: u64,

    /// 失败次数 (按错误类型)
    pub failures: HashMap<String, u64>,

    /// 读取字节总数
    pub bytes_read: u64,

    /// 延迟统计 (毫秒)
    pub latency_stats: RunningStats,
}

impl DispatchStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功
    pub fn record_success(&mut self, latency_ms: f64, bytes_read: u64) {
        self.succeeded += 1;
        self.bytes_read += bytes_read;
        self.latency_stats.push(latency_ms);
    }

    /// 记录一次失败
    pub fn record_failure(&mut self, kind: &str, latency_ms: f64) {
        *self.failures.entry(kind.to_string()).or_insert(0) += 1;
        self.latency_stats.push(latency_ms);
    }

    /// 失败总数
    pub fn failed(&self) -> u64 {
        self.failures.values().sum()
    }

    /// 生成摘要报告
    pub fn summary(&self) -> DispatchSummary {
        let total = self.succeeded + self.failed();
        DispatchSummary {
            total,
            succeeded: self.succeeded,
            failed: self.failed(),
            failure_rate: if total > 0 {
                self.failed() as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            bytes_read: self.bytes_read,
            latency_ms: StatsSummary::from(&self.latency_stats),
            failures_by_kind: self.failures.clone(),
        }
    }
}

/// 分发摘要
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub failure_rate: f64,
    pub bytes_read: u64,
    pub latency_ms: StatsSummary,
    pub failures_by_kind: HashMap<String, u64>,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Files: {}", self.total)?;
        writeln!(f, "Succeeded: {}", self.succeeded)?;
        writeln!(
            f,
            "Failed: {} ({:.2}%)",
            self.failed, self.failure_rate
        )?;
        writeln!(f, "Bytes read: {}", self.bytes_read)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.failures_by_kind.is_empty() {
            writeln!(f, "Failures by kind:")?;
            let mut kinds: Vec<_> = self.failures_by_kind.iter().collect();
            kinds.sort();
            for (kind, count) in kinds {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
