//! StreamHandler - appends record payloads to a stream

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::instrument;

use contracts::{DeliveryContext, DeliveryError, DeliveryHandler, Record};

use crate::transport::StreamClient;

/// Handler that puts the record payload on a stream
///
/// Only `data` is sent; the idempotency key is the partition key, with the
/// source as fallback when the key is empty.
pub struct StreamHandler<C: ?Sized> {
    name: String,
    stream_name: String,
    client: Arc<C>,
}

impl<C: StreamClient + ?Sized> StreamHandler<C> {
    pub fn new(stream_name: impl Into<String>, client: Arc<C>) -> Self {
        let stream_name = stream_name.into();
        Self {
            name: format!("stream:{stream_name}"),
            stream_name,
            client,
        }
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }
}

#[async_trait]
impl<C: StreamClient + ?Sized + 'static> DeliveryHandler for StreamHandler<C> {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "stream_handler_deliver",
        skip(self, ctx, record),
        fields(stream = %self.stream_name, key = record.idempotency_key())
    )]
    async fn deliver(&self, ctx: &DeliveryContext, record: &Record) -> Result<(), DeliveryError> {
        let data = serde_json::to_vec(record.data())
            .map(Bytes::from)
            .map_err(|e| DeliveryError::encode(&self.name, e))?;
        let key = record.idempotency_key();

        ctx.guard(&self.name, async {
            self.client
                .put_record(&self.stream_name, key, data)
                .await
                .map_err(|e| DeliveryError::transport_with_source(&self.name, e))
        })
        .await
    }
}
