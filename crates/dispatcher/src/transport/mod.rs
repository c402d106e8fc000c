//! Transport clients
//!
//! One trait per backend kind; each exposes the single network call its
//! handler needs. Contains MemoryBroker and UdpBroker.

mod memory;
mod udp;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

pub use self::memory::{BrokerMessage, MemoryBroker};
pub use self::udp::{UdpBroker, UdpBrokerConfig};

/// Durable queue backend
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Enqueue one message body
    async fn send_message(&self, queue_url: &str, body: String) -> Result<(), TransportError>;
}

/// One event bus entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusEntry {
    pub bus_name: String,
    /// Serialized record (JSON)
    pub detail: String,
}

/// Event bus backend
#[async_trait]
pub trait BusClient: Send + Sync {
    /// Put a batch of entries
    async fn put_events(&self, entries: Vec<BusEntry>) -> Result<(), TransportError>;
}

/// Stream backend
#[async_trait]
pub trait StreamClient: Send + Sync {
    /// Append one record to a partition
    async fn put_record(
        &self,
        stream_name: &str,
        partition_key: &str,
        data: Bytes,
    ) -> Result<(), TransportError>;
}
