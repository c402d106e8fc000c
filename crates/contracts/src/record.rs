//! Record - the normalized unit of delivery
//!
//! A record is immutable once built. The payload sits behind an `Arc`, so
//! handing the same record to many handlers never copies it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized event record handed to delivery handlers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Logical origin identifier
    source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    destination: Option<String>,

    /// Construction time (UTC)
    time: DateTime<Utc>,

    /// Event name, e.g. `loan_create`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,

    #[serde(default = "new_idempotency_key")]
    idempotency_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    sequence_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tenant_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_classification: Option<String>,

    /// Opaque payload
    #[serde(default)]
    data: Arc<Value>,
}

/// Fresh random idempotency key (UUID v4)
pub fn new_idempotency_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Record {
    /// Start building a record for `source` carrying `data`
    ///
    /// The idempotency key is generated on [`RecordDraft::build`] unless a
    /// non-empty one is set first.
    pub fn builder(source: impl Into<String>, data: impl Into<Arc<Value>>) -> RecordDraft {
        RecordDraft {
            record: Record {
                source: source.into(),
                destination: None,
                time: Utc::now(),
                event: None,
                domain: None,
                trace_id: None,
                idempotency_key: String::new(),
                sequence_id: None,
                tenant_id: None,
                data_classification: None,
                data: data.into(),
            },
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }

    pub fn sequence_id(&self) -> Option<&str> {
        self.sequence_id.as_deref()
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn data_classification(&self) -> Option<&str> {
        self.data_classification.as_deref()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

/// Caller-supplied optional metadata
///
/// Fields that are set to a non-empty value take precedence over generated
/// values. Empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_classification: Option<String>,
}

/// In-progress record; consumed by [`RecordDraft::build`]
#[derive(Debug)]
pub struct RecordDraft {
    record: Record,
}

impl RecordDraft {
    /// Set construction time (normalized to UTC by type)
    pub fn time(mut self, time: DateTime<Utc>) -> Self {
        self.record.time = time;
        self
    }

    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.record.idempotency_key = key.into();
        self
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.record.event = Some(event.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.record.domain = Some(domain.into());
        self
    }

    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.record.trace_id = Some(trace_id.into());
        self
    }

    /// Apply every non-empty field set in `metadata`
    pub fn metadata(mut self, metadata: &EventMetadata) -> Self {
        let r = &mut self.record;
        if let Some(v) = non_empty(&metadata.destination) {
            r.destination = Some(v);
        }
        if let Some(v) = non_empty(&metadata.trace_id) {
            r.trace_id = Some(v);
        }
        if let Some(v) = non_empty(&metadata.idempotency_key) {
            r.idempotency_key = v;
        }
        if let Some(v) = non_empty(&metadata.sequence_id) {
            r.sequence_id = Some(v);
        }
        if let Some(v) = non_empty(&metadata.tenant_id) {
            r.tenant_id = Some(v);
        }
        if let Some(v) = non_empty(&metadata.data_classification) {
            r.data_classification = Some(v);
        }
        self
    }

    /// Finish the record, generating an idempotency key if none was set
    pub fn build(mut self) -> Record {
        if self.record.idempotency_key.is_empty() {
            self.record.idempotency_key = new_idempotency_key();
        }
        self.record
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(str::to_string)
}
