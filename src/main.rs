//! netlens: Terminal dashboard for a network traffic monitoring backend.
//!
//! Polls per-client traffic aggregates from a REST backend and renders a
//! live top-talkers dashboard with per-client drill-down, classifier
//! predictions and volume forecasts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐      ┌──────────────┐       ┌─────────────┐
//! │   Backend   │<────>│  Controller  │──────>│     UI      │
//! │   (REST)    │ HTTP │ (async task) │ watch │  (ratatui)  │
//! └─────────────┘      └──────────────┘       └─────────────┘
//!                             ^                      │
//!                             └──── mpsc commands ───┘
//! ```
//!
//! - **Backend**: HTTP API serving traffic aggregates, captures and models
//! - **Controller**: Async task owning the view state and all fetches
//! - **UI**: Real-time TUI dashboard, input only ever becomes commands

mod aggregate;
mod api;
mod config;
mod controller;
mod drilldown;
mod error;
mod model;
mod ui;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{HttpApi, TrafficApi};
use crate::config::Config;
use crate::controller::{run_controller, ControllerSettings, ViewState};
use crate::model::Period;
use crate::ui::run_ui;

/// netlens: real-time network traffic dashboard.
#[derive(Parser, Debug)]
#[command(name = "netlens")]
#[command(version = "0.1.0")]
#[command(about = "Live terminal dashboard over a network traffic monitoring backend")]
#[command(long_about = None)]
struct Cli {
    /// Path to the TOML config file (default: netlens.toml when present).
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch the interactive dashboard.
    Watch {
        /// Backend base URL override (e.g. "http://127.0.0.1:5000").
        #[arg(short, long)]
        backend: Option<String>,

        /// Append logs to this file (the TUI owns the terminal).
        #[arg(long)]
        log_file: Option<String>,
    },

    /// Fetch one window, print the aggregation, and exit.
    Snapshot {
        /// Backend base URL override.
        #[arg(short, long)]
        backend: Option<String>,

        /// Window to aggregate: minute, hour, day, week (default: live).
        #[arg(short, long)]
        period: Option<String>,

        /// Print one client's protocol breakdown instead of the full table.
        #[arg(long)]
        client: Option<String>,

        /// Output format: text, json.
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Write a default config file and exit.
    InitConfig {
        /// Destination path.
        #[arg(long, default_value = Config::DEFAULT_PATH)]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    let config = match cli.config.as_deref() {
        Some(path) => Config::load(Path::new(path))?,
        None => Config::load_or_default(None),
    };

    match cli.command {
        Commands::Watch { backend, log_file } => {
            // The TUI owns the terminal, so console logging is off unless
            // redirected to a file.
            if let Some(path) = log_file {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("Failed to create log file: {path}"))?;
                let subscriber = FmtSubscriber::builder()
                    .with_max_level(log_level)
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .finish();
                tracing::subscriber::set_global_default(subscriber)
                    .context("Failed to set tracing subscriber")?;
            }

            run_watch(apply_overrides(config, backend)?).await
        }

        Commands::Snapshot {
            backend,
            period,
            client,
            output,
        } => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;

            run_snapshot(apply_overrides(config, backend)?, period, client, &output).await
        }

        Commands::InitConfig { path } => {
            std::fs::write(&path, Config::generate_default())
                .with_context(|| format!("Failed to write config file: {path}"))?;
            println!("Wrote default configuration to {path}");
            Ok(())
        }
    }
}

/// Applies CLI overrides on top of the loaded config, then validates.
fn apply_overrides(mut config: Config, backend: Option<String>) -> Result<Config> {
    if let Some(base_url) = backend {
        config.backend.base_url = base_url;
    }
    config.validate()?;
    Ok(config)
}

/// Starts the controller task and blocks on the dashboard UI.
async fn run_watch(config: Config) -> Result<()> {
    info!("Starting netlens dashboard...");

    let api: Arc<dyn TrafficApi> = Arc::new(HttpApi::new(
        &config.backend.base_url,
        Duration::from_secs(config.backend.timeout_secs),
    ));

    let settings = ControllerSettings {
        poll_interval: Duration::from_secs(config.view.poll_interval_secs),
        capture_limit: config.view.capture_limit,
        prediction_limit: config.view.prediction_limit,
    };

    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (state_tx, state_rx) = watch::channel(ViewState::initial());

    let controller_handle = tokio::spawn(run_controller(api, settings, cmd_rx, state_tx));

    // Blocks until the user quits
    run_ui(cmd_tx, state_rx, config.ui.clone(), config.view.top_talkers).await?;

    let _ = controller_handle.await;

    info!("netlens stopped");
    Ok(())
}

/// Fetches one window and prints the aggregation to stdout.
async fn run_snapshot(
    config: Config,
    period: Option<String>,
    client: Option<String>,
    output: &str,
) -> Result<()> {
    let api = HttpApi::new(
        &config.backend.base_url,
        Duration::from_secs(config.backend.timeout_secs),
    );

    if let Some(client_ip) = client {
        return run_client_report(&api, &client_ip, output).await;
    }

    let (window, records) = match period {
        Some(raw) => {
            let period: Period = raw.parse()?;
            let records = api.fetch_historical(period).await?;
            (format!("last {period}"), records)
        }
        None => ("live".to_string(), api.fetch_live().await?),
    };

    let talkers = aggregate::top_talkers(&records, config.view.top_talkers);
    let protocols = aggregate::protocol_rollup(&records);
    let total = aggregate::total_volume(&records);

    match output {
        "json" => {
            let report = serde_json::json!({
                "window": window,
                "clients": records.len(),
                "total_bytes": total,
                "total": aggregate::format_bytes(total),
                "top_talkers": talkers.iter().map(|record| serde_json::json!({
                    "client_ip": record.client_ip,
                    "inbound": record.inbound,
                    "outbound": record.outbound,
                    "total": record.total(),
                })).collect::<Vec<_>>(),
                "protocols": protocols.iter().map(|(name, bytes)| serde_json::json!({
                    "protocol": name,
                    "bytes": bytes,
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("Traffic snapshot ({window})\n");
            println!(
                "Clients: {}   Total: {}",
                records.len(),
                aggregate::format_bytes(total)
            );
            println!();
            println!(
                "{:<5} {:<18} {:>12} {:>12} {:>12}",
                "#", "Client IP", "Inbound", "Outbound", "Total"
            );
            println!("{}", "-".repeat(63));

            for (i, record) in talkers.iter().enumerate() {
                println!(
                    "{:<5} {:<18} {:>12} {:>12} {:>12}",
                    i + 1,
                    record.client_ip,
                    aggregate::format_bytes(record.inbound),
                    aggregate::format_bytes(record.outbound),
                    aggregate::format_bytes(record.total()),
                );
            }

            if !protocols.is_empty() {
                println!("\nProtocol mix:");
                for (name, bytes) in &protocols {
                    println!("  {:<12} {}", name, aggregate::format_bytes(*bytes));
                }
            }
        }
    }

    Ok(())
}

/// Prints the latest per-protocol breakdown for a single client.
async fn run_client_report(api: &HttpApi, client_ip: &str, output: &str) -> Result<()> {
    let record = api.fetch_client_protocols(client_ip).await?;
    let ranked = aggregate::rank_protocols(&record.protocols);

    match output {
        "json" => {
            let report = serde_json::json!({
                "client_ip": record.client_ip,
                "inbound": record.inbound,
                "outbound": record.outbound,
                "total": record.total(),
                "protocols": ranked.iter().map(|(name, bytes)| serde_json::json!({
                    "protocol": name,
                    "bytes": bytes,
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("Client {}", record.client_ip);
            println!(
                "Inbound: {}   Outbound: {}   Total: {}",
                aggregate::format_bytes(record.inbound),
                aggregate::format_bytes(record.outbound),
                aggregate::format_bytes(record.total()),
            );
            if ranked.is_empty() {
                println!("\nNo protocol data recorded");
            } else {
                println!("\nProtocols:");
                for (name, bytes) in &ranked {
                    println!("  {:<12} {}", name, aggregate::format_bytes(*bytes));
                }
            }
        }
    }

    Ok(())
}
