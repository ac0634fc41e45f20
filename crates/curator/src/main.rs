//! Curator - content update daemon
//!
//! # Usage
//!
//! ```bash
//! # Run with the default config file
//! curator
//! curator --config configs/curator.toml
//!
//! # Override the log level
//! curator --log-level debug
//! ```
//!
//! Loads one action per `[[action]]` table in the config file, starts
//! their schedulers, registers on-demand endpoints where requested, and
//! shuts everything down gracefully on ctrl-c.

use anyhow::{Context, Result};
use clap::Parser;
use curator_config::DaemonConfig;
use curator_router::Broker;
use curator_updater::Action;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Curator - content update daemon
#[derive(Parser, Debug)]
#[command(name = "curator")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/curator.toml")]
    config: std::path::PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config
    #[arg(short, long)]
    log_level: Option<String>,
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = DaemonConfig::from_file(&cli.config)
        .with_context(|| format!("loading '{}'", cli.config.display()))?;

    let level = cli
        .log_level
        .unwrap_or_else(|| config.log.level.as_str().to_string());
    init_logging(&level)?;

    if config.actions.is_empty() {
        anyhow::bail!("no [[action]] tables in '{}'", cli.config.display());
    }

    let broker = Broker::new();
    let mut actions = Vec::with_capacity(config.actions.len());

    for parameters in &config.actions {
        let document = serde_json::to_value(parameters)?;
        let mut action = Action::new(&broker, document)
            .with_context(|| format!("creating action '{}'", parameters.topic_name))?;

        // Log every message the feed publishes; real subscribers attach
        // through the broker the same way.
        let mut subscriber = broker.subscribe(action.topic(), "daemon-log");
        let topic = action.topic().to_string();
        tokio::spawn(async move {
            while let Some(message) = subscriber.recv().await {
                info!(
                    topic = %topic,
                    data_type = %message.payload["data_type"],
                    "message published"
                );
            }
        });

        if action.ondemand_enabled() {
            if let Err(err) = action.register_on_demand() {
                error!(topic = %action.topic(), error = %err, "on-demand registration failed");
            }
        }
        if action.configured_interval() > 0 {
            action.start_scheduler(action.configured_interval());
        }

        actions.push(action);
    }

    info!(actions = actions.len(), "curator running, ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down");

    for action in &mut actions {
        action.stop_scheduler().await;
        action.unregister_on_demand();
    }

    Ok(())
}
