//! # Integration Tests
//!
//! Cross-crate end-to-end tests.
//!
//! Covers:
//! - config file -> broker -> handler tree -> publisher
//! - wire formats seen by queue / bus / stream backends
//! - failure aggregation through nested composers
//! - swapping the process-wide default publisher

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{DeliveryContext, EventMetadata, PublisherConfig};
    use dispatcher::{Broker, HandlerFactory, HandlerTree, MemoryBroker};
    use publisher::{PublishError, PublishInput, Publisher};
    use serde_json::{json, Value};

    const FAN_OUT_TOML: &str = r#"
[identity]
service = "loan-service"
squad = "lending"
domain = "credit"

[handler]
type = "fan_out"

[[handler.handlers]]
type = "queue"
queue_url = "https://queue.local/loans"

[[handler.handlers]]
type = "sequence"

[[handler.handlers.handlers]]
type = "bus"
bus_name = "loan-events"

[[handler.handlers.handlers]]
type = "stream"
stream_name = "loan-stream"
"#;

    async fn build(config: &PublisherConfig) -> (Broker, HandlerTree, Publisher) {
        let broker = Broker::connect(&config.broker).await.unwrap();
        let tree = HandlerFactory::from_broker(&broker)
            .build(&config.handler)
            .unwrap();
        let publisher = Publisher::from_identity(&config.identity, Arc::clone(tree.root()));
        (broker, tree, publisher)
    }

    fn memory(broker: &Broker) -> &Arc<MemoryBroker> {
        broker.as_memory().unwrap()
    }

    /// TOML config -> memory broker -> every backend sees its wire format
    #[tokio::test]
    async fn test_e2e_config_to_backends() {
        let config = ConfigLoader::load_from_str(FAN_OUT_TOML, ConfigFormat::Toml).unwrap();
        let (broker, tree, publisher) = build(&config).await;

        let input = PublishInput::new(json!({"loan_id": 42}))
            .with_event("loan_create")
            .with_metadata(EventMetadata {
                idempotency_key: Some("idem-1".to_string()),
                tenant_id: Some("tenant-a".to_string()),
                ..Default::default()
            });
        publisher
            .publish_with(&DeliveryContext::background(), input)
            .await
            .unwrap();

        let broker = memory(&broker);
        assert_eq!(broker.len(), 3);

        // Queue: full record followed by a newline
        let bodies = broker.queue_messages("https://queue.local/loans");
        assert_eq!(bodies.len(), 1);
        assert!(bodies[0].ends_with('\n'));
        let record: Value = serde_json::from_str(bodies[0].trim_end()).unwrap();
        assert_eq!(record["source"], "loan-service");
        assert_eq!(record["event"], "loan_create");
        assert_eq!(record["domain"], "credit");
        assert_eq!(record["idempotency_key"], "idem-1");
        assert_eq!(record["tenant_id"], "tenant-a");
        assert_eq!(record["data"], json!({"loan_id": 42}));

        // Bus: the same record as entry detail
        let entries = broker.bus_entries("loan-events");
        assert_eq!(entries.len(), 1);
        let detail: Value = serde_json::from_str(&entries[0].detail).unwrap();
        assert_eq!(detail, record);

        // Stream: payload only, keyed by idempotency key
        let records = broker.stream_records("loan-stream");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "idem-1");
        let payload: Value = serde_json::from_slice(&records[0].1).unwrap();
        assert_eq!(payload, json!({"loan_id": 42}));

        assert!(tree
            .metrics()
            .iter()
            .all(|(_, m)| m.delivered_count == 1 && m.failure_count == 0));
    }

    /// Failures in two branches come back together; the healthy leaf still delivers
    #[tokio::test]
    async fn test_e2e_aggregates_nested_failures() {
        let config = ConfigLoader::load_from_str(FAN_OUT_TOML, ConfigFormat::Toml).unwrap();
        let (broker, tree, publisher) = build(&config).await;
        memory(&broker).fail_target("https://queue.local/loans", "queue throttled");
        memory(&broker).fail_target("loan-stream", "stream unavailable");

        let err = publisher
            .publish(&DeliveryContext::background(), &json!({"loan_id": 7}))
            .await
            .unwrap_err();

        let PublishError::Delivery(delivery) = &err else {
            panic!("expected delivery error, got {err:?}");
        };
        assert_eq!(delivery.failure_count(), 2);

        let handlers: Vec<_> = delivery
            .constituents()
            .into_iter()
            .filter_map(|e| e.handler())
            .collect();
        assert_eq!(
            handlers,
            vec!["queue:https://queue.local/loans", "stream:loan-stream"]
        );

        let message = err.to_string();
        assert!(message.contains("queue throttled"), "got: {message}");
        assert!(message.contains("stream unavailable"), "got: {message}");

        assert_eq!(memory(&broker).bus_entries("loan-events").len(), 1);
        let failures: u64 = tree.metrics().iter().map(|(_, m)| m.failure_count).sum();
        assert_eq!(failures, 2);
    }

    /// Every publish produces a fresh idempotency key
    #[tokio::test]
    async fn test_e2e_unique_keys_per_publish() {
        let config = ConfigLoader::load_from_str(FAN_OUT_TOML, ConfigFormat::Toml).unwrap();
        let (broker, _tree, publisher) = build(&config).await;
        let ctx = DeliveryContext::background();

        for i in 0..5 {
            publisher.publish(&ctx, &json!({"i": i})).await.unwrap();
        }

        let mut keys: Vec<_> = memory(&broker)
            .stream_records("loan-stream")
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys.len(), 5);
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 5);
    }

    /// Sequence with a local JSON file: failures do not stop later handlers
    #[tokio::test]
    async fn test_e2e_sequence_with_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let before = dir.path().join("before.jsonl");
        let after = dir.path().join("nested").join("after.jsonl");
        let content = format!(
            r#"
[identity]
source = "svc"

[handler]
type = "sequence"

[[handler.handlers]]
type = "json"
name = "before"
path = "{}"

[[handler.handlers]]
type = "queue"
queue_url = "broken"

[[handler.handlers]]
type = "json"
name = "after"
path = "{}"
"#,
            before.display(),
            after.display()
        );

        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let (broker, _tree, publisher) = build(&config).await;
        memory(&broker).fail_target("broken", "rejected");

        let err = publisher
            .publish(&DeliveryContext::background(), &json!({"n": 1}))
            .await
            .unwrap_err();
        assert_eq!(err.as_delivery().unwrap().failure_count(), 1);

        for path in [&before, &after] {
            let written = std::fs::read_to_string(path).unwrap();
            let line: Value = serde_json::from_str(written.trim_end()).unwrap();
            assert_eq!(line["data"], json!({"n": 1}));
        }
    }

    /// UDP broker delivers JSON envelopes to a real socket
    #[tokio::test]
    async fn test_e2e_udp_broker() {
        let receiver = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap();
        let content = format!(
            r#"
[identity]
source = "svc"

[broker]
kind = "udp"
addr = "{addr}"

[handler]
type = "queue"
queue_url = "q"
"#
        );

        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let (broker, _tree, publisher) = build(&config).await;
        assert_eq!(broker.kind(), "udp");

        publisher
            .publish_event(&DeliveryContext::background(), "ping", &json!({"n": 1}))
            .await
            .unwrap();

        let mut buf = vec![0u8; 65536];
        let len = tokio::time::timeout(Duration::from_secs(5), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();

        let envelope: Value = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(envelope["kind"], "queue");
        assert_eq!(envelope["target"], "q");
        let body = envelope["body"].as_str().unwrap();
        let record: Value = serde_json::from_str(body.trim_end()).unwrap();
        assert_eq!(record["event"], "ping");
    }

    /// Run statistics fold aggregate failures per handler
    #[tokio::test]
    async fn test_e2e_stats_from_aggregate() {
        use observability::{PublishOutcome, PublishStatsAggregator};

        let config = ConfigLoader::load_from_str(FAN_OUT_TOML, ConfigFormat::Toml).unwrap();
        let (broker, _tree, publisher) = build(&config).await;
        memory(&broker).fail_target("loan-events", "bus down");

        let mut stats = PublishStatsAggregator::new();
        for _ in 0..3 {
            let result = publisher
                .publish(&DeliveryContext::background(), &json!({}))
                .await;
            match &result {
                Ok(()) => stats.update(PublishOutcome::Delivered, Duration::ZERO, []),
                Err(e) => {
                    let delivery = e.as_delivery().unwrap();
                    let handlers = delivery.constituents().into_iter().filter_map(|c| c.handler());
                    stats.update(PublishOutcome::Failed, Duration::ZERO, handlers);
                }
            }
        }

        assert_eq!(stats.failed, 3);
        assert_eq!(stats.failures_by_handler.get("bus:loan-events"), Some(&3));
    }
}

#[cfg(test)]
mod default_publisher_tests {
    use std::sync::Arc;

    use contracts::HandlerConfig;
    use dispatcher::{HandlerFactory, MemoryBroker};
    use publisher::Publisher;
    use serde_json::json;

    /// The only test in this crate touching the process-wide default
    #[tokio::test]
    async fn test_default_swap_routes_free_functions() {
        let initial = publisher::default_publisher();
        assert_eq!(initial.source(), publisher::NO_NAME);
        publisher::publish(&json!({"dropped": true})).await.unwrap();

        let broker = Arc::new(MemoryBroker::new());
        let tree = HandlerFactory::with_broker(Arc::clone(&broker))
            .build(&HandlerConfig::Queue {
                queue_url: "default-q".to_string(),
            })
            .unwrap();
        let configured = Arc::new(Publisher::new("configured", tree.into_root()));

        let previous = publisher::replace_default(Arc::clone(&configured));
        assert!(Arc::ptr_eq(&previous, &initial));

        publisher::publish(&json!({"n": 1})).await.unwrap();
        publisher::publish_context(&publisher::DeliveryContext::background(), &json!({"n": 2}))
            .await
            .unwrap();
        assert_eq!(broker.queue_messages("default-q").len(), 2);

        publisher::set_default(previous);
        publisher::publish(&json!({"n": 3})).await.unwrap();
        assert_eq!(broker.queue_messages("default-q").len(), 2);
    }
}
