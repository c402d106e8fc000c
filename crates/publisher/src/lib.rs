//! # Publisher
//!
//! Event publishing frontend.
//!
//! Responsibilities:
//! - Normalize caller payloads into records (timestamp, idempotency key, trace id)
//! - Hand each record to one configured delivery handler
//! - Keep a swappable process-wide default publisher

pub mod builder;
pub mod client;
pub mod default;

pub use builder::{Clock, IdGenerator, PublishInput, RecordBuilder};
pub use client::{NO_NAME, PublishError, Publisher, PublisherBuilder};
pub use contracts::{DeliveryContext, EventMetadata};
pub use default::{default_publisher, publish, publish_context, replace_default, set_default};
