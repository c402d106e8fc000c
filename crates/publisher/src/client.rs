//! Publisher - frontend callers use to publish events

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use contracts::{DeliveryContext, DeliveryError, DeliveryHandler, IdentityConfig, SharedHandler};

use crate::builder::{PublishInput, RecordBuilder};

/// Source used when no identity is configured
pub const NO_NAME: &str = "no-name";

/// Publish failure
#[derive(Debug, Error)]
pub enum PublishError {
    /// The payload could not be converted to JSON
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// One or more handlers failed
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl PublishError {
    /// Delivery failure, if that is what this is
    pub fn as_delivery(&self) -> Option<&DeliveryError> {
        match self {
            Self::Delivery(e) => Some(e),
            Self::Encode(_) => None,
        }
    }
}

/// Binds a record builder and identity to one delivery handler
#[derive(Clone)]
pub struct Publisher {
    source: String,
    service: Option<String>,
    squad: Option<String>,
    domain: Option<String>,
    handler: SharedHandler,
    records: RecordBuilder,
}

impl Publisher {
    /// Publisher stamping records with `source`
    pub fn new(source: impl Into<String>, handler: SharedHandler) -> Self {
        Self {
            source: source.into(),
            service: None,
            squad: None,
            domain: None,
            handler,
            records: RecordBuilder::new(),
        }
    }

    pub fn builder(handler: SharedHandler) -> PublisherBuilder {
        PublisherBuilder::new(handler)
    }

    /// Publisher configured from an identity section
    pub fn from_identity(identity: &IdentityConfig, handler: SharedHandler) -> Self {
        let mut builder = Self::builder(handler).source(identity.effective_source());
        if let Some(service) = &identity.service {
            builder = builder.service_name(service);
        }
        if let Some(squad) = &identity.squad {
            builder = builder.squad_name(squad);
        }
        if let Some(domain) = &identity.domain {
            builder = builder.domain(domain);
        }
        builder.build()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service.as_deref()
    }

    pub fn squad_name(&self) -> Option<&str> {
        self.squad.as_deref()
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn handler(&self) -> &SharedHandler {
        &self.handler
    }

    /// Publish `data` without an event name
    pub async fn publish<T>(&self, ctx: &DeliveryContext, data: &T) -> Result<(), PublishError>
    where
        T: Serialize + ?Sized,
    {
        let input = PublishInput::new(serde_json::to_value(data)?);
        self.publish_with(ctx, input).await
    }

    /// Publish `data` as `event`
    pub async fn publish_event<T>(
        &self,
        ctx: &DeliveryContext,
        event: impl Into<String>,
        data: &T,
    ) -> Result<(), PublishError>
    where
        T: Serialize + ?Sized,
    {
        let input = PublishInput::new(serde_json::to_value(data)?).with_event(event);
        self.publish_with(ctx, input).await
    }

    /// Build one record from `input` and hand it to the handler once
    pub async fn publish_with(
        &self,
        ctx: &DeliveryContext,
        input: PublishInput,
    ) -> Result<(), PublishError> {
        let record = self
            .records
            .build(&self.source, self.domain.as_deref(), input);

        match self.handler.deliver(ctx, &record).await {
            Ok(()) => {
                debug!(
                    source = %self.source,
                    service = self.service.as_deref(),
                    squad = self.squad.as_deref(),
                    handler = self.handler.name(),
                    idempotency_key = record.idempotency_key(),
                    "Record published"
                );
                Ok(())
            }
            Err(e) => {
                debug!(
                    source = %self.source,
                    service = self.service.as_deref(),
                    squad = self.squad.as_deref(),
                    handler = self.handler.name(),
                    failures = e.failure_count(),
                    "Record delivery failed"
                );
                Err(e.into())
            }
        }
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("source", &self.source)
            .field("service", &self.service)
            .field("squad", &self.squad)
            .field("domain", &self.domain)
            .field("handler", &self.handler.name())
            .finish()
    }
}

/// Builder with functional options for [`Publisher`]
pub struct PublisherBuilder {
    source: Option<String>,
    service: Option<String>,
    squad: Option<String>,
    domain: Option<String>,
    handler: SharedHandler,
    records: RecordBuilder,
}

impl PublisherBuilder {
    pub fn new(handler: SharedHandler) -> Self {
        Self {
            source: None,
            service: None,
            squad: None,
            domain: None,
            handler,
            records: RecordBuilder::new(),
        }
    }

    /// Explicit record source; an empty string is ignored
    pub fn source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        if !source.is_empty() {
            self.source = Some(source);
        }
        self
    }

    pub fn service_name(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn squad_name(mut self, squad: impl Into<String>) -> Self {
        self.squad = Some(squad.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.records = self.records.with_clock(clock);
        self
    }

    pub fn id_generator(mut self, new_id: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.records = self.records.with_id_generator(new_id);
        self
    }

    /// Source falls back to the service name, then to [`NO_NAME`]
    pub fn build(self) -> Publisher {
        let source = self
            .source
            .or_else(|| self.service.clone())
            .unwrap_or_else(|| NO_NAME.to_string());
        Publisher {
            source,
            service: self.service,
            squad: self.squad,
            domain: self.domain,
            handler: self.handler,
            records: self.records,
        }
    }

    /// Build and wrap in an `Arc` for sharing or installing as default
    pub fn build_shared(self) -> Arc<Publisher> {
        Arc::new(self.build())
    }
}
