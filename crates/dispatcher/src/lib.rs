//! # Dispatcher
//!
//! Record delivery module.
//!
//! Responsibilities:
//! - Compose handlers sequentially or as a fan-out
//! - Aggregate every child failure without loss
//! - Queue / bus / stream / local-sink handlers and their transport clients

pub mod composer;
pub mod error;
pub mod factory;
pub mod handlers;
pub mod metrics;
pub mod transport;

pub use composer::{Composer, DispatchMode};
pub use contracts::{DeliveryHandler, Record, SharedHandler};
pub use error::{DispatcherError, TransportError};
pub use factory::{Broker, HandlerFactory, HandlerTree};
pub use handlers::{BusHandler, JsonHandler, LogHandler, QueueHandler, StreamHandler};
pub use metrics::{HandlerMetrics, Metered, MetricsSnapshot};
pub use transport::{
    BrokerMessage, BusClient, BusEntry, MemoryBroker, QueueClient, StreamClient, UdpBroker,
    UdpBrokerConfig,
};
