//! PublisherConfig - Config Loader output
//!
//! Describes publisher identity, the transport broker, and the delivery
//! handler tree.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete publisher configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PublisherConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Identity stamped on every record
    #[validate(nested)]
    pub identity: IdentityConfig,

    /// Transport broker shared by queue / bus / stream handlers
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Root of the handler tree
    pub handler: HandlerConfig,
}

/// Publisher identity
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IdentityConfig {
    /// Record source (falls back to `service` when empty)
    #[serde(default)]
    pub source: String,

    #[serde(default)]
    #[validate(length(min = 1))]
    pub service: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1))]
    pub squad: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1))]
    pub domain: Option<String>,
}

impl IdentityConfig {
    /// Source name records are stamped with
    pub fn effective_source(&self) -> &str {
        if self.source.is_empty() {
            self.service.as_deref().unwrap_or_default()
        } else {
            &self.source
        }
    }
}

/// Transport broker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BrokerConfig {
    /// In-process broker that keeps every message
    #[default]
    Memory,
    /// Fire-and-forget UDP datagrams
    Udp {
        addr: SocketAddr,
        #[serde(default)]
        format: WireFormat,
        #[serde(default = "default_max_packet_size")]
        max_packet_size: usize,
    },
}

fn default_max_packet_size() -> usize {
    65000
}

/// Datagram serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

/// Delivery handler tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandlerConfig {
    /// Ordered, non-short-circuiting dispatch
    Sequence {
        #[serde(default)]
        handlers: Vec<HandlerConfig>,
    },
    /// Concurrent dispatch
    FanOut {
        #[serde(default)]
        handlers: Vec<HandlerConfig>,
    },
    /// JSON lines to stdout, a file, or nowhere
    Json {
        #[serde(default)]
        name: Option<String>,
        /// Absent or `-` for stdout, `discard` to drop output
        #[serde(default)]
        path: Option<PathBuf>,
    },
    /// Summary via tracing
    Log { name: String },
    /// Durable queue
    Queue { queue_url: String },
    /// Event bus
    Bus { bus_name: String },
    /// Stream
    Stream { stream_name: String },
}

impl HandlerConfig {
    /// Type tag as written in config files
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sequence { .. } => "sequence",
            Self::FanOut { .. } => "fan_out",
            Self::Json { .. } => "json",
            Self::Log { .. } => "log",
            Self::Queue { .. } => "queue",
            Self::Bus { .. } => "bus",
            Self::Stream { .. } => "stream",
        }
    }

    /// Child handlers of a composer, empty for leaves
    pub fn children(&self) -> &[HandlerConfig] {
        match self {
            Self::Sequence { handlers } | Self::FanOut { handlers } => handlers,
            _ => &[],
        }
    }

    /// Number of leaf handlers in this subtree
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Sequence { handlers } | Self::FanOut { handlers } => {
                handlers.iter().map(Self::leaf_count).sum()
            }
            _ => 1,
        }
    }

    /// Nesting depth (leaf = 1)
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(Self::depth)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_tree_from_toml() {
        let content = r#"
[identity]
source = "loan-service"

[handler]
type = "fan_out"

[[handler.handlers]]
type = "queue"
queue_url = "https://queue.local/loans"

[[handler.handlers]]
type = "sequence"

[[handler.handlers.handlers]]
type = "bus"
bus_name = "events"

[[handler.handlers.handlers]]
type = "json"
path = "discard"
"#;
        let config: PublisherConfig = toml::from_str(content).unwrap();
        assert_eq!(config.broker, BrokerConfig::Memory);
        assert_eq!(config.handler.kind(), "fan_out");
        assert_eq!(config.handler.leaf_count(), 3);
        assert_eq!(config.handler.depth(), 3);
    }

    #[test]
    fn test_udp_broker_defaults() {
        let content = r#"
kind = "udp"
addr = "127.0.0.1:9999"
"#;
        let broker: BrokerConfig = toml::from_str(content).unwrap();
        match broker {
            BrokerConfig::Udp {
                addr,
                format,
                max_packet_size,
            } => {
                assert_eq!(addr.port(), 9999);
                assert_eq!(format, WireFormat::Json);
                assert_eq!(max_packet_size, 65000);
            }
            other => panic!("unexpected broker: {other:?}"),
        }
    }

    #[test]
    fn test_effective_source_falls_back_to_service() {
        let identity = IdentityConfig {
            source: String::new(),
            service: Some("billing".to_string()),
            squad: None,
            domain: None,
        };
        assert_eq!(identity.effective_source(), "billing");
    }

    #[test]
    fn test_identity_rejects_empty_domain() {
        let identity = IdentityConfig {
            source: "svc".to_string(),
            service: None,
            squad: None,
            domain: Some(String::new()),
        };
        assert!(identity.validate().is_err());
    }
}
