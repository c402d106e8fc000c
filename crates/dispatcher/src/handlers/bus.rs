//! BusHandler - puts records on an event bus

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use contracts::{DeliveryContext, DeliveryError, DeliveryHandler, Record};

use crate::transport::{BusClient, BusEntry};

/// Handler that puts one bus entry per record
pub struct BusHandler<C: ?Sized> {
    name: String,
    bus_name: String,
    client: Arc<C>,
}

impl<C: BusClient + ?Sized> BusHandler<C> {
    pub fn new(bus_name: impl Into<String>, client: Arc<C>) -> Self {
        let bus_name = bus_name.into();
        Self {
            name: format!("bus:{bus_name}"),
            bus_name,
            client,
        }
    }

    pub fn bus_name(&self) -> &str {
        &self.bus_name
    }

    fn entry(&self, record: &Record) -> Result<BusEntry, DeliveryError> {
        let detail =
            serde_json::to_string(record).map_err(|e| DeliveryError::encode(&self.name, e))?;
        Ok(BusEntry {
            bus_name: self.bus_name.clone(),
            detail,
        })
    }
}

#[async_trait]
impl<C: BusClient + ?Sized + 'static> DeliveryHandler for BusHandler<C> {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "bus_handler_deliver",
        skip(self, ctx, record),
        fields(bus = %self.bus_name, key = record.idempotency_key())
    )]
    async fn deliver(&self, ctx: &DeliveryContext, record: &Record) -> Result<(), DeliveryError> {
        let entry = self.entry(record)?;
        ctx.guard(&self.name, async {
            self.client
                .put_events(vec![entry])
                .await
                .map_err(|e| DeliveryError::transport_with_source(&self.name, e))
        })
        .await
    }
}
