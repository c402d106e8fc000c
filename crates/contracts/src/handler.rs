//! DeliveryHandler trait - the single delivery capability
//!
//! Every transport adapter and every composer implements this trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{DeliveryContext, DeliveryError, Record};

/// Delivery capability
///
/// Success is signaled only by `Ok(())`. Implementations must observe `ctx`
/// on every blocking network call they perform.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    /// Handler name (used for errors/logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one record
    ///
    /// # Errors
    /// Returns the delivery failure (should include handler name)
    async fn deliver(&self, ctx: &DeliveryContext, record: &Record) -> Result<(), DeliveryError>;
}

/// Handler shared between composers, publishers and tasks
pub type SharedHandler = Arc<dyn DeliveryHandler>;

#[async_trait]
impl<H: DeliveryHandler + ?Sized> DeliveryHandler for Arc<H> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn deliver(&self, ctx: &DeliveryContext, record: &Record) -> Result<(), DeliveryError> {
        (**self).deliver(ctx, record).await
    }
}

#[async_trait]
impl<H: DeliveryHandler + ?Sized> DeliveryHandler for Box<H> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn deliver(&self, ctx: &DeliveryContext, record: &Record) -> Result<(), DeliveryError> {
        (**self).deliver(ctx, record).await
    }
}
