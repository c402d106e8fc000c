//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{BrokerConfig, HandlerConfig, PublisherConfig};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    source: String,
    broker: String,
    root_handler: String,
    handler_count: usize,
    depth: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    source: config.identity.effective_source().to_string(),
                    broker: broker_kind(&config.broker).to_string(),
                    root_handler: config.handler.kind().to_string(),
                    handler_count: config.handler.leaf_count(),
                    depth: config.handler.depth(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

pub(crate) fn broker_kind(broker: &BrokerConfig) -> &'static str {
    match broker {
        BrokerConfig::Memory => "memory",
        BrokerConfig::Udp { .. } => "udp",
    }
}

/// Collect non-fatal configuration issues
fn collect_warnings(config: &PublisherConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.handler.leaf_count() == 0 {
        warnings.push("Handler tree has no leaves - every record will be dropped".to_string());
    }

    let network_leaves = count_network_leaves(&config.handler);
    if network_leaves > 0 && config.broker == BrokerConfig::Memory {
        warnings.push(format!(
            "{network_leaves} queue/bus/stream handlers use the in-memory broker - nothing leaves the process"
        ));
    }

    if config.identity.source.is_empty() {
        warnings.push(format!(
            "identity.source is empty - records use service name '{}'",
            config.identity.effective_source()
        ));
    }

    warnings
}

fn count_network_leaves(handler: &HandlerConfig) -> usize {
    match handler {
        HandlerConfig::Queue { .. } | HandlerConfig::Bus { .. } | HandlerConfig::Stream { .. } => 1,
        other => other.children().iter().map(count_network_leaves).sum(),
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Source: {}", summary.source);
            println!("  Broker: {}", summary.broker);
            println!("  Root handler: {}", summary.root_handler);
            println!("  Handlers: {}", summary.handler_count);
            println!("  Depth: {}", summary.depth);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}
