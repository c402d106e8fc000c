//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{BrokerConfig, HandlerConfig, PublisherConfig};

use super::validate::broker_kind;
use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    identity: IdentityInfo,
    broker: BrokerInfo,
    handler: HandlerNode,
}

#[derive(Serialize)]
struct IdentityInfo {
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    squad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
}

#[derive(Serialize)]
struct BrokerInfo {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_packet_size: Option<usize>,
}

#[derive(Serialize)]
struct HandlerNode {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<HandlerNode>,
}

impl HandlerNode {
    fn from_config(config: &HandlerConfig) -> Self {
        Self {
            kind: config.kind(),
            target: handler_target(config),
            children: config.children().iter().map(Self::from_config).collect(),
        }
    }
}

/// Name or destination of a leaf handler
fn handler_target(config: &HandlerConfig) -> Option<String> {
    match config {
        HandlerConfig::Sequence { .. } | HandlerConfig::FanOut { .. } => None,
        HandlerConfig::Json { name, path } => {
            let dest = path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "stdout".to_string());
            Some(match name {
                Some(name) => format!("{name} -> {dest}"),
                None => dest,
            })
        }
        HandlerConfig::Log { name } => Some(name.clone()),
        HandlerConfig::Queue { queue_url } => Some(queue_url.clone()),
        HandlerConfig::Bus { bus_name } => Some(bus_name.clone()),
        HandlerConfig::Stream { stream_name } => Some(stream_name.clone()),
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{json}");
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn build_config_info(config: &PublisherConfig) -> ConfigInfo {
    let broker = match &config.broker {
        BrokerConfig::Memory => BrokerInfo {
            kind: "memory",
            addr: None,
            format: None,
            max_packet_size: None,
        },
        BrokerConfig::Udp {
            addr,
            format,
            max_packet_size,
        } => BrokerInfo {
            kind: "udp",
            addr: Some(addr.to_string()),
            format: Some(format!("{format:?}").to_lowercase()),
            max_packet_size: Some(*max_packet_size),
        },
    };

    ConfigInfo {
        version: format!("{:?}", config.version),
        identity: IdentityInfo {
            source: config.identity.effective_source().to_string(),
            service: config.identity.service.clone(),
            squad: config.identity.squad.clone(),
            domain: config.identity.domain.clone(),
        },
        broker,
        handler: HandlerNode::from_config(&config.handler),
    }
}

fn print_config_info(config: &PublisherConfig) {
    println!("Publisher Configuration\n");

    let identity = &config.identity;
    println!("Identity");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Source: {}", identity.effective_source());
    println!(
        "   ├─ Service: {}",
        identity.service.as_deref().unwrap_or("-")
    );
    println!("   ├─ Squad: {}", identity.squad.as_deref().unwrap_or("-"));
    println!("   └─ Domain: {}", identity.domain.as_deref().unwrap_or("-"));

    println!("\nBroker");
    match &config.broker {
        BrokerConfig::Memory => println!("   └─ {}", broker_kind(&config.broker)),
        BrokerConfig::Udp {
            addr,
            format,
            max_packet_size,
        } => {
            println!("   ├─ udp://{addr}");
            println!("   ├─ Format: {format:?}");
            println!("   └─ Max packet: {max_packet_size} bytes");
        }
    }

    println!(
        "\nHandlers ({} leaves, depth {})",
        config.handler.leaf_count(),
        config.handler.depth()
    );
    print_handler(&config.handler, "   ", true);

    println!();
}

fn print_handler(config: &HandlerConfig, indent: &str, is_last: bool) {
    let prefix = if is_last { "└─" } else { "├─" };
    match handler_target(config) {
        Some(target) => println!("{indent}{prefix} {} ({target})", config.kind()),
        None => println!("{indent}{prefix} {}", config.kind()),
    }

    let child_indent = format!("{indent}{}", if is_last { "   " } else { "│  " });
    let children = config.children();
    for (i, child) in children.iter().enumerate() {
        print_handler(child, &child_indent, i == children.len() - 1);
    }
}
