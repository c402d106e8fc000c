//! Publish metrics
//!
//! Exported through the `metrics` facade and aggregated in memory for
//! end-of-run summaries.

use std::collections::HashMap;
use std::time::Duration;

use dispatcher::MetricsSnapshot;
use metrics::{counter, gauge, histogram};

/// Result of one publish call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublishOutcome {
    Delivered,
    /// At least one handler failed
    Failed,
    /// The payload never reached a handler
    EncodeFailed,
}

impl PublishOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::EncodeFailed => "encode_failed",
        }
    }
}

/// Record one publish call
///
/// `failures` is the number of handler failures the call aggregated.
pub fn record_publish(source: &str, outcome: PublishOutcome, failures: usize, latency: Duration) {
    counter!(
        "mqueue_publish_total",
        "source" => source.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    if failures > 0 {
        counter!("mqueue_handler_failures_total", "source" => source.to_string())
            .increment(failures as u64);
    }

    histogram!("mqueue_publish_latency_ms", "source" => source.to_string())
        .record(latency.as_secs_f64() * 1000.0);
}

/// Export one leaf handler's counters
pub fn record_handler_snapshot(handler: &str, snapshot: &MetricsSnapshot) {
    gauge!("mqueue_handler_in_flight", "handler" => handler.to_string())
        .set(snapshot.in_flight as f64);
    gauge!("mqueue_handler_delivered", "handler" => handler.to_string())
        .set(snapshot.delivered_count as f64);
    gauge!("mqueue_handler_failed", "handler" => handler.to_string())
        .set(snapshot.failure_count as f64);
    gauge!("mqueue_handler_last_latency_us", "handler" => handler.to_string())
        .set(snapshot.last_latency_us as f64);
}

/// In-memory publish statistics
#[derive(Debug, Clone, Default)]
pub struct PublishStatsAggregator {
    pub total: u64,
    pub delivered: u64,
    pub failed: u64,
    pub encode_failed: u64,

    /// Handler failures across all calls
    pub handler_failures: u64,

    /// Publish latency in milliseconds
    pub latency_stats: RunningStats,

    /// Failures per handler name
    pub failures_by_handler: HashMap<String, u64>,
}

impl PublishStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one publish call into the statistics
    pub fn update<'a>(
        &mut self,
        outcome: PublishOutcome,
        latency: Duration,
        failed_handlers: impl IntoIterator<Item = &'a str>,
    ) {
        self.total += 1;
        match outcome {
            PublishOutcome::Delivered => self.delivered += 1,
            PublishOutcome::Failed => self.failed += 1,
            PublishOutcome::EncodeFailed => self.encode_failed += 1,
        }

        for handler in failed_handlers {
            self.handler_failures += 1;
            *self
                .failures_by_handler
                .entry(handler.to_string())
                .or_insert(0) += 1;
        }

        self.latency_stats.push(latency.as_secs_f64() * 1000.0);
    }

    pub fn summary(&self) -> PublishSummary {
        PublishSummary {
            total: self.total,
            delivered: self.delivered,
            failed: self.failed,
            encode_failed: self.encode_failed,
            handler_failures: self.handler_failures,
            success_rate: if self.total > 0 {
                self.delivered as f64 / self.total as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            failures_by_handler: self.failures_by_handler.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Printable publish statistics
#[derive(Debug, Clone, Default)]
pub struct PublishSummary {
    pub total: u64,
    pub delivered: u64,
    pub failed: u64,
    pub encode_failed: u64,
    pub handler_failures: u64,
    pub success_rate: f64,
    pub latency_ms: StatsSummary,
    pub failures_by_handler: HashMap<String, u64>,
}

impl std::fmt::Display for PublishSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Publish Summary ===")?;
        writeln!(f, "Total publishes: {}", self.total)?;
        writeln!(
            f,
            "Delivered: {} ({:.2}%)",
            self.delivered, self.success_rate
        )?;
        writeln!(f, "Failed: {}", self.failed)?;
        if self.encode_failed > 0 {
            writeln!(f, "Encode failures: {}", self.encode_failed)?;
        }
        writeln!(f, "Handler failures: {}", self.handler_failures)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.failures_by_handler.is_empty() {
            let mut handlers: Vec<_> = self.failures_by_handler.iter().collect();
            handlers.sort();
            writeln!(f, "Failures by handler:")?;
            for (handler, count) in handlers {
                writeln!(f, "  {handler}: {count}")?;
            }
        }

        Ok(())
    }
}

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

/// Online mean and variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
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

    /// Sample variance
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = PublishStatsAggregator::new();

        aggregator.update(PublishOutcome::Delivered, Duration::from_millis(2), []);
        aggregator.update(
            PublishOutcome::Failed,
            Duration::from_millis(4),
            ["queue:q", "bus:b"],
        );
        aggregator.update(PublishOutcome::Failed, Duration::from_millis(6), ["bus:b"]);

        assert_eq!(aggregator.total, 3);
        assert_eq!(aggregator.delivered, 1);
        assert_eq!(aggregator.failed, 2);
        assert_eq!(aggregator.handler_failures, 3);
        assert_eq!(aggregator.failures_by_handler.get("bus:b"), Some(&2));
        assert!((aggregator.latency_stats.mean() - 4.0).abs() < 1e-9);

        aggregator.reset();
        assert_eq!(aggregator.total, 0);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = PublishStatsAggregator::new();
        for _ in 0..3 {
            aggregator.update(PublishOutcome::Delivered, Duration::from_millis(1), []);
        }
        aggregator.update(PublishOutcome::Failed, Duration::from_millis(1), ["queue:q"]);

        let output = aggregator.summary().to_string();
        assert!(output.contains("Total publishes: 4"), "got: {output}");
        assert!(output.contains("75.00%"), "got: {output}");
        assert!(output.contains("queue:q: 1"), "got: {output}");
    }

    #[test]
    fn test_empty_summary() {
        let summary = PublishStatsAggregator::new().summary();
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.latency_ms.to_string(), "N/A");
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_publish("svc", PublishOutcome::Delivered, 0, Duration::from_millis(1));
        record_handler_snapshot("queue:q", &MetricsSnapshot::default());
    }
}
