//! Config validation
//!
//! Rules:
//! - identity fields pass their derive rules and a source can be resolved
//! - named handlers (json / log) have unique, non-empty names
//! - queue URL, bus name and stream name are non-empty
//! - composers nest no deeper than [`MAX_DEPTH`]
//! - the UDP broker targets a non-zero port

use std::collections::HashSet;

use validator::Validate;

use contracts::{BrokerConfig, ContractError, HandlerConfig, PublisherConfig};

/// Deepest allowed handler tree, leaves included
pub const MAX_DEPTH: usize = 8;

/// Validate a parsed config
///
/// Returns the first error encountered.
pub fn validate(config: &PublisherConfig) -> Result<(), ContractError> {
    validate_identity(config)?;
    validate_broker(&config.broker)?;
    validate_depth(&config.handler)?;
    validate_handlers(&config.handler, "handler", &mut HashSet::new())?;
    Ok(())
}

fn validate_identity(config: &PublisherConfig) -> Result<(), ContractError> {
    if let Err(errors) = config.validate() {
        let field = errors
            .errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "identity".to_string());
        return Err(ContractError::config_validation(
            field,
            format!("invalid identity: {errors}"),
        ));
    }

    if config.identity.effective_source().is_empty() {
        return Err(ContractError::config_validation(
            "identity.source",
            "source cannot be empty (set source or service)",
        ));
    }
    Ok(())
}

fn validate_broker(broker: &BrokerConfig) -> Result<(), ContractError> {
    if let BrokerConfig::Udp {
        addr,
        max_packet_size,
        ..
    } = broker
    {
        if addr.port() == 0 {
            return Err(ContractError::config_validation(
                "broker.addr",
                format!("udp address {addr} needs a non-zero port"),
            ));
        }
        if *max_packet_size == 0 {
            return Err(ContractError::config_validation(
                "broker.max_packet_size",
                "max_packet_size must be > 0",
            ));
        }
    }
    Ok(())
}

fn validate_depth(handler: &HandlerConfig) -> Result<(), ContractError> {
    let depth = handler.depth();
    if depth > MAX_DEPTH {
        return Err(ContractError::config_validation(
            "handler",
            format!("handler tree depth {depth} exceeds {MAX_DEPTH}"),
        ));
    }
    Ok(())
}

fn validate_handlers<'a>(
    handler: &'a HandlerConfig,
    path: &str,
    names: &mut HashSet<&'a str>,
) -> Result<(), ContractError> {
    match handler {
        HandlerConfig::Sequence { handlers } | HandlerConfig::FanOut { handlers } => {
            for (idx, child) in handlers.iter().enumerate() {
                validate_handlers(child, &format!("{path}.handlers[{idx}]"), names)?;
            }
        }
        HandlerConfig::Json { name, .. } => {
            if let Some(name) = name {
                check_name(name, path, names)?;
            }
        }
        HandlerConfig::Log { name } => check_name(name, path, names)?,
        HandlerConfig::Queue { queue_url } => {
            require(queue_url, &format!("{path}.queue_url"), "queue_url")?
        }
        HandlerConfig::Bus { bus_name } => {
            require(bus_name, &format!("{path}.bus_name"), "bus_name")?
        }
        HandlerConfig::Stream { stream_name } => {
            require(stream_name, &format!("{path}.stream_name"), "stream_name")?
        }
    }
    Ok(())
}

fn check_name<'a>(
    name: &'a str,
    path: &str,
    names: &mut HashSet<&'a str>,
) -> Result<(), ContractError> {
    require(name, &format!("{path}.name"), "handler name")?;
    if !names.insert(name) {
        return Err(ContractError::config_validation(
            format!("{path}.name"),
            format!("duplicate handler name '{name}'"),
        ));
    }
    Ok(())
}

fn require(value: &str, field: &str, what: &str) -> Result<(), ContractError> {
    if value.trim().is_empty() {
        return Err(ContractError::config_validation(
            field,
            format!("{what} cannot be empty"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConfigVersion, IdentityConfig, WireFormat};

    fn minimal_config() -> PublisherConfig {
        PublisherConfig {
            version: ConfigVersion::V1,
            identity: IdentityConfig {
                source: "svc".into(),
                service: None,
                squad: None,
                domain: None,
            },
            broker: BrokerConfig::Memory,
            handler: HandlerConfig::FanOut {
                handlers: vec![
                    HandlerConfig::Queue {
                        queue_url: "q".into(),
                    },
                    HandlerConfig::Log {
                        name: "audit".into(),
                    },
                ],
            },
        }
    }

    fn nested(depth: usize) -> HandlerConfig {
        (1..depth).fold(
            HandlerConfig::Bus {
                bus_name: "b".into(),
            },
            |inner, _| HandlerConfig::Sequence {
                handlers: vec![inner],
            },
        )
    }

    fn error_of(config: &PublisherConfig) -> String {
        validate(config).unwrap_err().to_string()
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_empty_source() {
        let mut config = minimal_config();
        config.identity.source = String::new();
        let err = error_of(&config);
        assert!(err.contains("source cannot be empty"), "got: {err}");

        config.identity.service = Some("billing".into());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_domain_rejected() {
        let mut config = minimal_config();
        config.identity.domain = Some(String::new());
        let err = error_of(&config);
        assert!(err.contains("invalid identity"), "got: {err}");
    }

    #[test]
    fn test_duplicate_handler_name() {
        let mut config = minimal_config();
        config.handler = HandlerConfig::Sequence {
            handlers: vec![
                HandlerConfig::Log {
                    name: "audit".into(),
                },
                HandlerConfig::Json {
                    name: Some("audit".into()),
                    path: None,
                },
            ],
        };
        let err = error_of(&config);
        assert!(err.contains("duplicate handler name"), "got: {err}");
        assert!(err.contains("handler.handlers[1].name"), "got: {err}");
    }

    #[test]
    fn test_unnamed_json_handlers_allowed() {
        let mut config = minimal_config();
        config.handler = HandlerConfig::FanOut {
            handlers: vec![
                HandlerConfig::Json {
                    name: None,
                    path: None,
                },
                HandlerConfig::Json {
                    name: None,
                    path: None,
                },
            ],
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_targets() {
        for handler in [
            HandlerConfig::Queue {
                queue_url: " ".into(),
            },
            HandlerConfig::Bus {
                bus_name: String::new(),
            },
            HandlerConfig::Stream {
                stream_name: String::new(),
            },
        ] {
            let mut config = minimal_config();
            config.handler = handler;
            let err = error_of(&config);
            assert!(err.contains("cannot be empty"), "got: {err}");
        }
    }

    #[test]
    fn test_depth_limit() {
        let mut config = minimal_config();
        config.handler = nested(MAX_DEPTH);
        assert!(validate(&config).is_ok());

        config.handler = nested(MAX_DEPTH + 1);
        let err = error_of(&config);
        assert!(err.contains("exceeds"), "got: {err}");
    }

    #[test]
    fn test_udp_port_zero() {
        let mut config = minimal_config();
        config.broker = BrokerConfig::Udp {
            addr: "127.0.0.1:0".parse().unwrap(),
            format: WireFormat::Json,
            max_packet_size: 1024,
        };
        let err = error_of(&config);
        assert!(err.contains("non-zero port"), "got: {err}");
    }

    #[test]
    fn test_first_error_wins() {
        let mut config = minimal_config();
        config.identity.source = String::new();
        config.handler = HandlerConfig::Queue {
            queue_url: String::new(),
        };
        let err = error_of(&config);
        assert!(err.contains("source"), "got: {err}");
    }
}
