//! Handler metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use contracts::{DeliveryContext, DeliveryError, DeliveryHandler, Record};

/// Metrics for a single handler
#[derive(Debug, Default)]
pub struct HandlerMetrics {
    /// Deliveries currently running
    in_flight: AtomicUsize,
    /// Total successful deliveries
    delivered_count: AtomicU64,
    /// Total failed deliveries
    failure_count: AtomicU64,
    /// Duration of the most recent delivery (microseconds)
    last_latency_us: AtomicU64,
}

impl HandlerMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered_count.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn last_latency_us(&self) -> u64 {
        self.last_latency_us.load(Ordering::Relaxed)
    }

    fn begin(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self, success: bool, latency_us: u64) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        self.last_latency_us.store(latency_us, Ordering::Relaxed);
        if success {
            self.delivered_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            in_flight: self.in_flight(),
            delivered_count: self.delivered_count(),
            failure_count: self.failure_count(),
            last_latency_us: self.last_latency_us(),
        }
    }
}

/// Snapshot of handler metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub in_flight: usize,
    pub delivered_count: u64,
    pub failure_count: u64,
    pub last_latency_us: u64,
}

/// Wraps a handler and counts its outcomes
pub struct Metered<H> {
    inner: H,
    metrics: Arc<HandlerMetrics>,
}

impl<H: DeliveryHandler> Metered<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            metrics: Arc::new(HandlerMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<HandlerMetrics> {
        &self.metrics
    }
}

#[async_trait]
impl<H: DeliveryHandler> DeliveryHandler for Metered<H> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn deliver(&self, ctx: &DeliveryContext, record: &Record) -> Result<(), DeliveryError> {
        self.metrics.begin();
        let started = Instant::now();
        let result = self.inner.deliver(ctx, record).await;
        let latency_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.metrics.finish(result.is_ok(), latency_us);
        result
    }
}
