//! HandlerFactory - builds handler trees from configuration

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use contracts::{BrokerConfig, DeliveryHandler, HandlerConfig, SharedHandler};

use crate::composer::{Composer, DispatchMode};
use crate::error::DispatcherError;
use crate::handlers::{BusHandler, JsonHandler, LogHandler, QueueHandler, StreamHandler};
use crate::metrics::{HandlerMetrics, Metered, MetricsSnapshot};
use crate::transport::{
    BusClient, MemoryBroker, QueueClient, StreamClient, UdpBroker, UdpBrokerConfig,
};

/// Transport backend selected by configuration
#[derive(Clone)]
pub enum Broker {
    Memory(Arc<MemoryBroker>),
    Udp(Arc<UdpBroker>),
}

impl Broker {
    /// Create the broker described by `config`
    #[instrument(name = "broker_connect", skip(config))]
    pub async fn connect(config: &BrokerConfig) -> Result<Self, DispatcherError> {
        match UdpBrokerConfig::from_broker(config) {
            None => Ok(Self::Memory(Arc::new(MemoryBroker::new()))),
            Some(udp) => {
                let addr = udp.addr;
                let broker = UdpBroker::connect(udp).await.map_err(|e| {
                    DispatcherError::handler_creation(format!("udp:{addr}"), e.to_string())
                })?;
                Ok(Self::Udp(Arc::new(broker)))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Udp(_) => "udp",
        }
    }

    /// The in-process broker, if that is what was configured
    pub fn as_memory(&self) -> Option<&Arc<MemoryBroker>> {
        match self {
            Self::Memory(broker) => Some(broker),
            Self::Udp(_) => None,
        }
    }
}

/// Built handler tree with per-leaf metrics
pub struct HandlerTree {
    root: SharedHandler,
    metrics: Vec<(String, Arc<HandlerMetrics>)>,
}

impl HandlerTree {
    pub fn root(&self) -> &SharedHandler {
        &self.root
    }

    pub fn into_root(self) -> SharedHandler {
        self.root
    }

    /// Get metrics for all leaf handlers
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.metrics
            .iter()
            .map(|(name, m)| (name.clone(), m.snapshot()))
            .collect()
    }
}

/// Builds handlers backed by one set of transport clients
#[derive(Clone)]
pub struct HandlerFactory {
    queue: Arc<dyn QueueClient>,
    bus: Arc<dyn BusClient>,
    stream: Arc<dyn StreamClient>,
}

impl HandlerFactory {
    /// Factory whose queue, bus and stream handlers share `broker`
    pub fn with_broker<B>(broker: Arc<B>) -> Self
    where
        B: QueueClient + BusClient + StreamClient + 'static,
    {
        Self {
            queue: broker.clone(),
            bus: broker.clone(),
            stream: broker,
        }
    }

    /// Factory with independent clients per backend kind
    pub fn with_clients(
        queue: Arc<dyn QueueClient>,
        bus: Arc<dyn BusClient>,
        stream: Arc<dyn StreamClient>,
    ) -> Self {
        Self { queue, bus, stream }
    }

    pub fn from_broker(broker: &Broker) -> Self {
        match broker {
            Broker::Memory(b) => Self::with_broker(Arc::clone(b)),
            Broker::Udp(b) => Self::with_broker(Arc::clone(b)),
        }
    }

    /// Build the handler tree described by `config`
    #[instrument(
        name = "handler_factory_build",
        skip(self, config),
        fields(root = config.kind(), leaves = config.leaf_count())
    )]
    pub fn build(&self, config: &HandlerConfig) -> Result<HandlerTree, DispatcherError> {
        let mut metrics = Vec::new();
        let root = self.build_node(config, &mut metrics)?;
        info!(handlers = metrics.len(), "Handler tree built");
        Ok(HandlerTree { root, metrics })
    }

    fn build_node(
        &self,
        config: &HandlerConfig,
        metrics: &mut Vec<(String, Arc<HandlerMetrics>)>,
    ) -> Result<SharedHandler, DispatcherError> {
        match config {
            HandlerConfig::Sequence { handlers } => {
                self.build_composer(DispatchMode::Sequence, handlers, metrics)
            }
            HandlerConfig::FanOut { handlers } => {
                self.build_composer(DispatchMode::FanOut, handlers, metrics)
            }
            HandlerConfig::Json { name, path } => {
                let name = name.as_deref().unwrap_or("json");
                let handler = json_handler(name, path.as_deref())?;
                Ok(metered(handler, metrics))
            }
            HandlerConfig::Log { name } => Ok(metered(LogHandler::new(name), metrics)),
            HandlerConfig::Queue { queue_url } => Ok(metered(
                QueueHandler::new(queue_url, Arc::clone(&self.queue)),
                metrics,
            )),
            HandlerConfig::Bus { bus_name } => Ok(metered(
                BusHandler::new(bus_name, Arc::clone(&self.bus)),
                metrics,
            )),
            HandlerConfig::Stream { stream_name } => Ok(metered(
                StreamHandler::new(stream_name, Arc::clone(&self.stream)),
                metrics,
            )),
        }
    }

    fn build_composer(
        &self,
        mode: DispatchMode,
        children: &[HandlerConfig],
        metrics: &mut Vec<(String, Arc<HandlerMetrics>)>,
    ) -> Result<SharedHandler, DispatcherError> {
        let handlers = children
            .iter()
            .map(|child| self.build_node(child, metrics))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(mode = mode.as_str(), children = handlers.len(), "Composer built");
        Ok(Composer::new(mode, handlers).into_shared())
    }
}

fn json_handler(name: &str, path: Option<&Path>) -> Result<JsonHandler, DispatcherError> {
    let Some(path) = path else {
        return Ok(JsonHandler::new(name, std::io::stdout()));
    };
    match path.to_str() {
        Some("-") => Ok(JsonHandler::new(name, std::io::stdout())),
        Some("discard") => Ok(JsonHandler::new(name, std::io::sink())),
        _ => JsonHandler::file(name, path)
            .map_err(|e| DispatcherError::handler_creation(name, e.to_string())),
    }
}

fn metered<H: DeliveryHandler + 'static>(
    handler: H,
    metrics: &mut Vec<(String, Arc<HandlerMetrics>)>,
) -> SharedHandler {
    let metered = Metered::new(handler);
    metrics.push((metered.name().to_string(), Arc::clone(metered.metrics())));
    Arc::new(metered)
}
