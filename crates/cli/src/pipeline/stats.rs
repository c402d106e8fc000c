//! Publish run statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::{record_publish, PublishOutcome, PublishStatsAggregator};
use publisher::PublishError;

/// Statistics from a publish run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Broker kind the handlers were backed by
    pub broker: &'static str,

    /// Total duration of the run
    pub duration: Duration,

    pub publish: PublishStatsAggregator,

    /// Final counters per leaf handler
    pub handlers: Vec<(String, MetricsSnapshot)>,

    /// Messages held by the in-memory broker, if used
    pub broker_messages: Option<usize>,
}

impl RunStats {
    pub fn new(broker: &'static str) -> Self {
        Self {
            broker,
            ..Default::default()
        }
    }

    /// Fold one publish result into the statistics and export it
    pub fn observe(&mut self, source: &str, result: &Result<(), PublishError>, latency: Duration) {
        let (outcome, failed_handlers): (_, Vec<&str>) = match result {
            Ok(()) => (PublishOutcome::Delivered, Vec::new()),
            Err(PublishError::Encode(_)) => (PublishOutcome::EncodeFailed, Vec::new()),
            Err(PublishError::Delivery(e)) => (
                PublishOutcome::Failed,
                e.constituents()
                    .into_iter()
                    .map(|c| c.handler().unwrap_or("unknown"))
                    .collect(),
            ),
        };

        record_publish(source, outcome, failed_handlers.len(), latency);
        self.publish.update(outcome, latency, failed_handlers);
    }

    /// Publishes that did not fully succeed
    pub fn failed(&self) -> u64 {
        self.publish.failed + self.publish.encode_failed
    }

    /// Publishes per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.publish.total as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!();
        println!("Overview");
        println!("   Broker: {}", self.broker);
        println!("   Duration: {:.3}s", self.duration.as_secs_f64());
        println!("   Throughput: {:.2}/s", self.throughput());
        if let Some(messages) = self.broker_messages {
            println!("   Broker messages: {messages}");
        }

        print!("\n{}", self.publish.summary());

        if !self.handlers.is_empty() {
            println!("\nHandlers");
            for (name, m) in &self.handlers {
                println!(
                    "   {name}: delivered={}, failed={}, last_latency={}us",
                    m.delivered_count, m.failure_count, m.last_latency_us
                );
            }
        }

        println!();
    }
}
