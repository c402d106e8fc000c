//! Publish run - builds the handler tree and publishes a batch of records.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use contracts::{DeliveryContext, EventMetadata, PublisherConfig};
use dispatcher::{Broker, HandlerFactory};
use observability::record_handler_snapshot;
use publisher::{PublishInput, Publisher};

use super::RunStats;

/// Publish run configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub config: PublisherConfig,

    /// Payload of every record
    pub payload: Value,

    pub event: Option<String>,

    /// Number of records to publish
    pub count: u64,

    /// Per-publish deadline (None = no deadline)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// One batch of publishes against a freshly built handler tree
pub struct PublishRun {
    config: RunConfig,
}

impl PublishRun {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Publish `count` records, continuing past failures
    pub async fn run(self) -> Result<RunStats> {
        let start_time = Instant::now();
        let RunConfig {
            config,
            payload,
            event,
            count,
            timeout,
            metrics_port,
        } = self.config;

        if let Some(port) = metrics_port {
            observability::init_metrics_only(port)?;
        }

        let broker = Broker::connect(&config.broker)
            .await
            .context("Failed to connect broker")?;
        let tree = HandlerFactory::from_broker(&broker)
            .build(&config.handler)
            .context("Failed to build handler tree")?;
        let publisher = Publisher::from_identity(&config.identity, Arc::clone(tree.root()));

        info!(
            source = publisher.source(),
            broker = broker.kind(),
            handler = tree.root().name(),
            count,
            "Publishing"
        );

        let mut stats = RunStats::new(broker.kind());
        for seq in 0..count {
            let ctx = match timeout {
                Some(timeout) => DeliveryContext::with_timeout(timeout),
                None => DeliveryContext::background(),
            };
            let mut input = PublishInput::new(payload.clone()).with_metadata(EventMetadata {
                sequence_id: Some(seq.to_string()),
                ..Default::default()
            });
            if let Some(event) = &event {
                input = input.with_event(event.clone());
            }

            let started = Instant::now();
            let result = publisher.publish_with(&ctx, input).await;
            let latency = started.elapsed();

            if let Err(e) = &result {
                warn!(seq, error = %e, "Publish failed");
            }
            stats.observe(publisher.source(), &result, latency);
        }

        for (name, snapshot) in tree.metrics() {
            record_handler_snapshot(&name, &snapshot);
            stats.handlers.push((name, snapshot));
        }
        stats.broker_messages = broker.as_memory().map(|memory| memory.len());
        stats.duration = start_time.elapsed();

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BrokerConfig, ConfigVersion, HandlerConfig, IdentityConfig};
    use serde_json::json;

    fn run_config(handler: HandlerConfig, count: u64) -> RunConfig {
        RunConfig {
            config: PublisherConfig {
                version: ConfigVersion::V1,
                identity: IdentityConfig {
                    source: "svc".into(),
                    service: None,
                    squad: None,
                    domain: None,
                },
                broker: BrokerConfig::Memory,
                handler,
            },
            payload: json!({"key": "value"}),
            event: Some("loan_create".into()),
            count,
            timeout: None,
            metrics_port: None,
        }
    }

    #[tokio::test]
    async fn test_run_publishes_count_records() {
        let handler = HandlerConfig::FanOut {
            handlers: vec![
                HandlerConfig::Queue {
                    queue_url: "q".into(),
                },
                HandlerConfig::Bus {
                    bus_name: "b".into(),
                },
            ],
        };

        let stats = PublishRun::new(run_config(handler, 3)).run().await.unwrap();

        assert_eq!(stats.publish.total, 3);
        assert_eq!(stats.publish.delivered, 3);
        assert_eq!(stats.broker_messages, Some(6));
        assert_eq!(stats.handlers.len(), 2);
        assert!(stats.handlers.iter().all(|(_, m)| m.delivered_count == 3));
    }

    #[tokio::test]
    async fn test_run_with_local_json_handler() {
        let handler = HandlerConfig::Json {
            name: Some("local".into()),
            path: Some("discard".into()),
        };

        let stats = PublishRun::new(run_config(handler, 2)).run().await.unwrap();

        assert_eq!(stats.publish.delivered, 2);
        assert_eq!(stats.failed(), 0);
        assert_eq!(stats.broker_messages, Some(0));
        assert_eq!(stats.handlers[0].0, "local");
    }
}
