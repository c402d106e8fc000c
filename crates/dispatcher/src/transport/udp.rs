//! UdpBroker - fire-and-forget datagrams for queue / bus / stream traffic

use std::borrow::Cow;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tokio::net::UdpSocket;
use tracing::{debug, instrument};

use contracts::{BrokerConfig, WireFormat};

use super::{BusClient, BusEntry, QueueClient, StreamClient};
use crate::error::TransportError;

/// Configuration for UdpBroker
#[derive(Debug, Clone)]
pub struct UdpBrokerConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Serialization format
    pub format: WireFormat,
    /// Max packet size (UDP typically 65507 for IPv4)
    pub max_packet_size: usize,
}

impl UdpBrokerConfig {
    /// Extract UDP settings from a broker config, `None` for other brokers
    pub fn from_broker(config: &BrokerConfig) -> Option<Self> {
        match config {
            BrokerConfig::Udp {
                addr,
                format,
                max_packet_size,
            } => Some(Self {
                addr: *addr,
                format: *format,
                max_packet_size: *max_packet_size,
            }),
            BrokerConfig::Memory => None,
        }
    }
}

/// Datagram envelope
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    kind: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<&'a str>,
    body: Cow<'a, str>,
}

/// Broker that sends every message as one UDP datagram
pub struct UdpBroker {
    config: UdpBrokerConfig,
    socket: UdpSocket,
}

impl UdpBroker {
    /// Bind an ephemeral local port and connect to the target
    #[instrument(name = "udp_broker_connect", skip(config), fields(addr = %config.addr))]
    pub async fn connect(config: UdpBrokerConfig) -> std::io::Result<Self> {
        let bind_addr = if config.addr.is_ipv6() {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(config.addr).await?;

        debug!(target_addr = %config.addr, format = ?config.format, "UdpBroker connected");

        Ok(Self { config, socket })
    }

    pub fn config(&self) -> &UdpBrokerConfig {
        &self.config
    }

    fn encode(&self, envelope: &Envelope<'_>) -> Result<Vec<u8>, TransportError> {
        let data = match self.config.format {
            WireFormat::Json => {
                serde_json::to_vec(envelope).map_err(|e| TransportError::Encode(e.to_string()))?
            }
            WireFormat::Bincode => {
                bincode::serialize(envelope).map_err(|e| TransportError::Encode(e.to_string()))?
            }
        };

        if data.len() > self.config.max_packet_size {
            return Err(TransportError::PacketTooLarge {
                size: data.len(),
                max: self.config.max_packet_size,
            });
        }
        Ok(data)
    }

    async fn transmit(&self, envelope: Envelope<'_>) -> Result<(), TransportError> {
        let data = self.encode(&envelope)?;
        let sent = self.socket.send(&data).await?;
        debug!(kind = envelope.kind, dest = envelope.target, bytes = sent, "Sent");
        Ok(())
    }
}

#[async_trait]
impl QueueClient for UdpBroker {
    async fn send_message(&self, queue_url: &str, body: String) -> Result<(), TransportError> {
        self.transmit(Envelope {
            kind: "queue",
            target: queue_url,
            key: None,
            body: Cow::Owned(body),
        })
        .await
    }
}

#[async_trait]
impl BusClient for UdpBroker {
    async fn put_events(&self, entries: Vec<BusEntry>) -> Result<(), TransportError> {
        for entry in &entries {
            self.transmit(Envelope {
                kind: "bus",
                target: &entry.bus_name,
                key: None,
                body: Cow::Borrowed(&entry.detail),
            })
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StreamClient for UdpBroker {
    async fn put_record(
        &self,
        stream_name: &str,
        partition_key: &str,
        data: Bytes,
    ) -> Result<(), TransportError> {
        self.transmit(Envelope {
            kind: "stream",
            target: stream_name,
            key: Some(partition_key),
            body: String::from_utf8_lossy(&data),
        })
        .await
    }
}
