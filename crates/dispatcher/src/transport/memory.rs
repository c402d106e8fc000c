//! MemoryBroker - in-process backend keeping every message

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;

use super::{BusClient, BusEntry, QueueClient, StreamClient};
use crate::error::TransportError;

/// Message accepted by the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerMessage {
    Queue {
        queue_url: String,
        body: String,
    },
    Bus(BusEntry),
    Stream {
        stream_name: String,
        partition_key: String,
        data: Bytes,
    },
}

/// In-process queue / bus / stream backend
///
/// Targets registered with [`MemoryBroker::fail_target`] reject every message.
#[derive(Debug, Default)]
pub struct MemoryBroker {
    messages: Mutex<Vec<BrokerMessage>>,
    failing: Mutex<HashMap<String, String>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every message sent to `target` fail with `message`
    pub fn fail_target(&self, target: impl Into<String>, message: impl Into<String>) {
        lock(&self.failing).insert(target.into(), message.into());
    }

    /// Stop failing `target`
    pub fn heal_target(&self, target: &str) {
        lock(&self.failing).remove(target);
    }

    /// All accepted messages in arrival order
    pub fn messages(&self) -> Vec<BrokerMessage> {
        lock(&self.messages).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.messages).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.messages).is_empty()
    }

    /// Bodies accepted for `queue_url`
    pub fn queue_messages(&self, queue_url: &str) -> Vec<String> {
        lock(&self.messages)
            .iter()
            .filter_map(|m| match m {
                BrokerMessage::Queue { queue_url: q, body } if q == queue_url => Some(body.clone()),
                _ => None,
            })
            .collect()
    }

    /// Entries accepted for `bus_name`
    pub fn bus_entries(&self, bus_name: &str) -> Vec<BusEntry> {
        lock(&self.messages)
            .iter()
            .filter_map(|m| match m {
                BrokerMessage::Bus(entry) if entry.bus_name == bus_name => Some(entry.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(partition_key, data)` pairs accepted for `stream_name`
    pub fn stream_records(&self, stream_name: &str) -> Vec<(String, Bytes)> {
        lock(&self.messages)
            .iter()
            .filter_map(|m| match m {
                BrokerMessage::Stream {
                    stream_name: s,
                    partition_key,
                    data,
                } if s == stream_name => Some((partition_key.clone(), data.clone())),
                _ => None,
            })
            .collect()
    }

    fn accept(&self, target: &str, message: BrokerMessage) -> Result<(), TransportError> {
        if let Some(reason) = lock(&self.failing).get(target) {
            return Err(TransportError::rejected(target, reason.clone()));
        }
        lock(&self.messages).push(message);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl QueueClient for MemoryBroker {
    async fn send_message(&self, queue_url: &str, body: String) -> Result<(), TransportError> {
        self.accept(
            queue_url,
            BrokerMessage::Queue {
                queue_url: queue_url.to_string(),
                body,
            },
        )
    }
}

#[async_trait]
impl BusClient for MemoryBroker {
    async fn put_events(&self, entries: Vec<BusEntry>) -> Result<(), TransportError> {
        for entry in entries {
            let target = entry.bus_name.clone();
            self.accept(&target, BrokerMessage::Bus(entry))?;
        }
        Ok(())
    }
}

#[async_trait]
impl StreamClient for MemoryBroker {
    async fn put_record(
        &self,
        stream_name: &str,
        partition_key: &str,
        data: Bytes,
    ) -> Result<(), TransportError> {
        self.accept(
            stream_name,
            BrokerMessage::Stream {
                stream_name: stream_name.to_string(),
                partition_key: partition_key.to_string(),
                data,
            },
        )
    }
}
