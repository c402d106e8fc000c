//! QueueHandler - sends records to a durable queue

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use contracts::{DeliveryContext, DeliveryError, DeliveryHandler, Record};

use crate::transport::QueueClient;

/// Handler that enqueues the JSON-encoded record
pub struct QueueHandler<C: ?Sized> {
    name: String,
    queue_url: String,
    client: Arc<C>,
}

impl<C: QueueClient + ?Sized> QueueHandler<C> {
    pub fn new(queue_url: impl Into<String>, client: Arc<C>) -> Self {
        let queue_url = queue_url.into();
        Self {
            name: format!("queue:{queue_url}"),
            queue_url,
            client,
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    /// Message body: the record JSON terminated by a newline
    fn encode(&self, record: &Record) -> Result<String, DeliveryError> {
        let mut body =
            serde_json::to_string(record).map_err(|e| DeliveryError::encode(&self.name, e))?;
        body.push('\n');
        Ok(body)
    }
}

#[async_trait]
impl<C: QueueClient + ?Sized + 'static> DeliveryHandler for QueueHandler<C> {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "queue_handler_deliver",
        skip(self, ctx, record),
        fields(queue = %self.queue_url, key = record.idempotency_key())
    )]
    async fn deliver(&self, ctx: &DeliveryContext, record: &Record) -> Result<(), DeliveryError> {
        let body = self.encode(record)?;
        ctx.guard(&self.name, async {
            self.client
                .send_message(&self.queue_url, body)
                .await
                .map_err(|e| DeliveryError::transport_with_source(&self.name, e))
        })
        .await
    }
}
