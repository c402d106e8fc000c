//! `publish` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::PublishArgs;
use crate::error::CliError;
use crate::pipeline::{PublishRun, RunConfig};

/// Execute the `publish` command
pub async fn run_publish(args: &PublishArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let payload: serde_json::Value =
        serde_json::from_str(&args.data).map_err(|e| CliError::invalid_data(e.to_string()))?;

    let run_config = RunConfig {
        config,
        payload,
        event: args.event.clone(),
        count: args.count,
        timeout: (args.timeout_ms > 0).then(|| Duration::from_millis(args.timeout_ms)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    let run = PublishRun::new(run_config);

    tokio::select! {
        result = run.run() => {
            let stats = result.context("Publish run failed")?;
            info!(
                total = stats.publish.total,
                failed = stats.failed(),
                duration_secs = stats.duration.as_secs_f64(),
                "Publish run finished"
            );
            stats.print_summary();

            if stats.failed() > 0 {
                return Err(CliError::publish_failed(stats.failed(), stats.publish.total).into());
            }
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping publish run");
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    const CONFIG: &str = r#"
[identity]
source = "svc"

[handler]
type = "json"
name = "local"
path = "discard"
"#;

    fn args(config: PathBuf, data: &str) -> PublishArgs {
        PublishArgs {
            config,
            data: data.to_string(),
            event: None,
            count: 2,
            timeout_ms: 0,
            metrics_port: 0,
        }
    }

    fn config_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_publish_succeeds() {
        let file = config_file();
        run_publish(&args(file.path().to_path_buf(), r#"{"a":1}"#))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_publish_rejects_bad_payload() {
        let file = config_file();
        let err = run_publish(&args(file.path().to_path_buf(), "{not json"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::InvalidData { .. })
        ));
    }

    #[tokio::test]
    async fn test_publish_missing_config() {
        let err = run_publish(&args(PathBuf::from("/nonexistent/p.toml"), "{}"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {err}");
    }
}
