//! Process-wide default publisher
//!
//! Starts out as a `no-name` publisher that discards every record. Readers
//! take a snapshot per call, so a publish that began before a swap finishes
//! against the publisher it started with.

use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use serde::Serialize;
use tracing::info;

use contracts::DeliveryContext;
use dispatcher::JsonHandler;

use crate::client::{NO_NAME, PublishError, Publisher};

static DEFAULT: LazyLock<ArcSwap<Publisher>> = LazyLock::new(|| {
    ArcSwap::from_pointee(Publisher::new(NO_NAME, Arc::new(JsonHandler::discard())))
});

/// Current default publisher
pub fn default_publisher() -> Arc<Publisher> {
    DEFAULT.load_full()
}

/// Install `publisher` as the default
pub fn set_default(publisher: Arc<Publisher>) {
    replace_default(publisher);
}

/// Install `publisher` as the default and return the previous one
pub fn replace_default(publisher: Arc<Publisher>) -> Arc<Publisher> {
    info!(
        source = publisher.source(),
        handler = publisher.handler().name(),
        "Default publisher replaced"
    );
    DEFAULT.swap(publisher)
}

/// Publish `data` through the default publisher with no deadline
pub async fn publish<T>(data: &T) -> Result<(), PublishError>
where
    T: Serialize + ?Sized,
{
    publish_context(&DeliveryContext::background(), data).await
}

/// Publish `data` through the default publisher
pub async fn publish_context<T>(ctx: &DeliveryContext, data: &T) -> Result<(), PublishError>
where
    T: Serialize + ?Sized,
{
    let publisher = default_publisher();
    publisher.publish(ctx, data).await
}
