//! # ga-server
//!
//! GA session broker binary: loads settings, starts logging and metrics,
//! and serves the reference GA engine over WebSocket.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ga_broker::shutdown::{DEFAULT_SHUTDOWN_TIMEOUT, wait_for_signal};
use ga_broker::{CommandTable, GaServer, ServerConfig, TraceCommands};
use ga_core::logging::{LogFormat, init_subscriber};
use ga_engine::{GaFactory, GaParams, GaState, ProblemKind, WorkingStatus, register_commands};
use ga_settings::GaSettings;

/// GA session broker.
#[derive(Parser, Debug)]
#[command(name = "ga-server", about = "Real-time session broker for genetic algorithm front ends")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.ga-server/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Title returned by `describe` (overrides settings).
    #[arg(long)]
    title: Option<String>,

    /// Objective to minimize: sphere or rastrigin.
    #[arg(long, default_value = "sphere")]
    problem: ProblemKind,

    /// Genes per individual.
    #[arg(long, default_value_t = 10)]
    dimensions: usize,

    /// Initial population size (2..=1000).
    #[arg(long, default_value_t = 100)]
    population: usize,

    /// Seed for reproducible sessions.
    #[arg(long)]
    seed: Option<u64>,

    /// Log level filter, e.g. `info` or `ga_broker=debug` (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn settings_path(&self) -> PathBuf {
        self.settings.clone().unwrap_or_else(ga_settings::settings_path)
    }

    /// Server config from settings with CLI overrides on top.
    fn server_config(&self, settings: &GaSettings) -> ServerConfig {
        let mut config = ServerConfig::from(&settings.server);
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(title) = &self.title {
            config.title.clone_from(title);
        }
        config
    }

    fn log_level<'a>(&'a self, settings: &'a GaSettings) -> &'a str {
        self.log_level.as_deref().unwrap_or(&settings.logging.level)
    }
}

/// Engine factory plus the command table serving it.
fn build_engine(cli: &Cli) -> Result<(GaFactory, CommandTable<GaState>)> {
    let problem = cli
        .problem
        .build(cli.dimensions)
        .context("invalid problem configuration")?;
    let params = GaParams {
        population_size: cli.population,
        ..GaParams::default()
    };
    let factory = GaFactory::new(problem, params)
        .context("invalid GA parameters")?
        .with_seed(cli.seed);

    let mut table = CommandTable::new();
    let _ = table
        .layer(TraceCommands::default())
        .layer(WorkingStatus::default());
    register_commands(&mut table);
    Ok((factory, table))
}

fn build_server(cli: &Cli, settings: &GaSettings) -> Result<GaServer<GaState>> {
    let (factory, table) = build_engine(cli)?;
    Ok(GaServer::new(
        cli.server_config(settings),
        move || factory.build(),
        table,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli.settings_path();
    let settings = ga_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;

    let format = LogFormat::parse(&settings.logging.format).unwrap_or_default();
    init_subscriber(cli.log_level(&settings), format);

    let metrics = ga_broker::metrics::install_recorder()
        .context("failed to install metrics recorder")?;

    let server = build_server(&cli, &settings)?.with_metrics(metrics);
    let (addr, handle) = server.listen().await.context("failed to bind server")?;
    tracing::info!(
        problem = %cli.problem,
        dimensions = cli.dimensions,
        commands = ?server.broker().commands().commands(),
        "GA server listening on ws://{addr}/ws"
    );

    wait_for_signal().await;

    tracing::info!("shutting down");
    server
        .shutdown()
        .graceful_shutdown(vec![handle], Some(shutdown_timeout(&settings)))
        .await;
    tracing::info!("shutdown complete");
    Ok(())
}

/// Long enough for sockets to see a missed heartbeat, never below the default.
fn shutdown_timeout(settings: &GaSettings) -> Duration {
    DEFAULT_SHUTDOWN_TIMEOUT.max(Duration::from_secs(settings.server.heartbeat_interval_secs))
}
