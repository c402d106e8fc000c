//! LogHandler - logs record summary via tracing

use async_trait::async_trait;
use tracing::info;

use contracts::{DeliveryContext, DeliveryError, DeliveryHandler, Record};

/// Handler that logs record summaries for debugging
pub struct LogHandler {
    name: String,
}

impl LogHandler {
    /// Create a new LogHandler with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_record_summary(&self, record: &Record) {
        info!(
            handler = %self.name,
            source = record.source(),
            event = record.event(),
            idempotency_key = record.idempotency_key(),
            trace_id = record.trace_id(),
            time = %record.time(),
            "Record published"
        );
    }
}

#[async_trait]
impl DeliveryHandler for LogHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, ctx: &DeliveryContext, record: &Record) -> Result<(), DeliveryError> {
        ctx.check(&self.name)?;
        self.log_record_summary(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_handler_deliver() {
        let handler = LogHandler::new("test_log");
        let record = Record::builder("svc", json!({"a": 1}))
            .event("loan_create")
            .build();

        let result = handler
            .deliver(&DeliveryContext::background(), &record)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_log_handler_name() {
        let handler = LogHandler::new("my_logger");
        assert_eq!(handler.name(), "my_logger");
    }
}
