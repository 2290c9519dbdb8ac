//! Gatekeeper reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 GATEKEEPER                   │
//!   Client Request        │  ┌────────┐   ┌────────────┐   ┌─────────┐   │
//!   ──────────────────────┼─▶│  http  │──▶│  security  │──▶│  proxy  │───┼──▶ Upstream
//!                         │  │ server │   │ checks     │   │ handler │   │    Application
//!                         │  └────────┘   └─────┬──────┘   └─────────┘   │
//!                         │                     │ deny / throttle        │
//!   ◀─────────────────────┼─────────────────────┘ uniform JSON body      │
//!                         │                                              │
//!                         │  config · observability · lifecycle · admin  │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use gatekeeper::admin::{serve_admin, setup_admin_router};
use gatekeeper::config::{load_config, GatekeeperConfig};
use gatekeeper::http::HttpServer;
use gatekeeper::lifecycle::{wait_for_signal, Shutdown, WindowSweeper};
use gatekeeper::observability::{init_logging, init_metrics};

#[derive(Debug, Parser)]
#[command(name = "gatekeeper", version, about = "Request-time security gatekeeper")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatekeeperConfig::default(),
    };

    init_logging(&config.observability, config.environment);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = config.environment.as_str(),
        config = ?cli.config,
        "gatekeeper starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        limit = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        fault_policy = ?config.fault_policy,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(&config)?;
    let gatekeeper = server.gatekeeper();
    let shutdown = Shutdown::new();

    let sweeper = WindowSweeper::new(
        gatekeeper.limiter().clone(),
        Duration::from_secs(config.rate_limit.sweep_interval_secs),
    );
    let sweeper_task = tokio::spawn(sweeper.run(shutdown.subscribe()));

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let router = setup_admin_router(gatekeeper.clone(), &config.admin);
        Some(tokio::spawn(serve_admin(router, listener, shutdown.subscribe())))
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();

    server_task.await??;
    if let Some(task) = admin_task {
        task.await??;
    }
    sweeper_task.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
