//! RecordBuilder - turns caller input into a normalized [`Record`]
//!
//! Pure apart from the injected clock and id generator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use contracts::{EventMetadata, Record};

/// Source of record timestamps
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Source of idempotency keys
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Caller input for one publish call
#[derive(Debug, Clone, Default)]
pub struct PublishInput {
    /// Event name, e.g. `loan_create`
    pub event: Option<String>,
    pub metadata: EventMetadata,
    pub data: Value,
}

impl PublishInput {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Builds records with a fresh timestamp and idempotency key
#[derive(Clone)]
pub struct RecordBuilder {
    clock: Clock,
    new_id: IdGenerator,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self {
            clock: Arc::new(Utc::now),
            new_id: Arc::new(|| uuid::Uuid::new_v4().to_string()),
        }
    }
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the idempotency key source
    pub fn with_id_generator(mut self, new_id: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.new_id = Arc::new(new_id);
        self
    }

    /// Build a record for `source`
    ///
    /// Non-empty caller metadata wins over generated values. Without a caller
    /// trace id, the id of the current tracing span is used. Span ids are
    /// local to this process and reused once a span closes, so callers that
    /// need a trace id valid across services must pass `trace_id` in the
    /// metadata.
    pub fn build(&self, source: &str, domain: Option<&str>, input: PublishInput) -> Record {
        let mut draft = Record::builder(source, input.data)
            .time((self.clock)())
            .idempotency_key((self.new_id)());

        if let Some(trace_id) = current_trace_id() {
            draft = draft.trace_id(trace_id);
        }
        if let Some(event) = input.event {
            draft = draft.event(event);
        }
        if let Some(domain) = domain {
            draft = draft.domain(domain);
        }

        draft.metadata(&input.metadata).build()
    }
}

fn current_trace_id() -> Option<String> {
    tracing::Span::current()
        .id()
        .map(|id| id.into_u64().to_string())
}

impl std::fmt::Debug for RecordBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordBuilder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed() -> RecordBuilder {
        RecordBuilder::new()
            .with_clock(|| Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap())
            .with_id_generator(|| "fixed-id".to_string())
    }

    #[test]
    fn test_build_uses_injected_clock_and_id() {
        let record = fixed().build("svc", None, PublishInput::new(json!({"a": "1"})));

        assert_eq!(record.source(), "svc");
        assert_eq!(record.idempotency_key(), "fixed-id");
        assert_eq!(
            record.time(),
            Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
        );
        assert_eq!(record.data(), &json!({"a": "1"}));
        assert_eq!(record.domain(), None);
    }

    #[test]
    fn test_default_generates_unique_keys() {
        let builder = RecordBuilder::new();
        let a = builder.build("svc", None, PublishInput::default());
        let b = builder.build("svc", None, PublishInput::default());

        assert!(!a.idempotency_key().is_empty());
        assert_ne!(a.idempotency_key(), b.idempotency_key());
        assert!(uuid::Uuid::parse_str(a.idempotency_key()).is_ok());
    }

    #[test]
    fn test_caller_metadata_wins() {
        let input = PublishInput::new(json!(null))
            .with_event("loan_create")
            .with_metadata(EventMetadata {
                idempotency_key: Some("caller".to_string()),
                trace_id: Some("trace-1".to_string()),
                sequence_id: Some("7".to_string()),
                ..Default::default()
            });

        let record = fixed().build("svc", Some("lending"), input);

        assert_eq!(record.idempotency_key(), "caller");
        assert_eq!(record.trace_id(), Some("trace-1"));
        assert_eq!(record.sequence_id(), Some("7"));
        assert_eq!(record.event(), Some("loan_create"));
        assert_eq!(record.domain(), Some("lending"));
    }

    #[test]
    fn test_empty_caller_key_replaced() {
        let input = PublishInput::new(json!({})).with_metadata(EventMetadata {
            idempotency_key: Some(String::new()),
            ..Default::default()
        });

        let record = fixed().build("svc", None, input);
        assert_eq!(record.idempotency_key(), "fixed-id");

        let record = RecordBuilder::new()
            .with_id_generator(String::new)
            .build("svc", None, PublishInput::default());
        assert!(uuid::Uuid::parse_str(record.idempotency_key()).is_ok());
    }

    #[test]
    fn test_trace_id_from_current_span() {
        let subscriber = tracing_subscriber::registry();
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("request");
            let _guard = span.enter();
            let expected = span.id().unwrap().into_u64().to_string();

            let record = fixed().build("svc", None, PublishInput::default());
            assert_eq!(record.trace_id(), Some(expected.as_str()));
        });
    }

    #[test]
    fn test_no_trace_id_outside_span() {
        let record = fixed().build("svc", None, PublishInput::default());
        assert_eq!(record.trace_id(), None);
    }
}
