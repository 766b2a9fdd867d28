mod routes;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use svckit::MicroConfig;
use svckit_auth::axum_ext::HmacState;
use svckit_registry::{ServicePool, spawn_health_monitor};
use tokio_util::sync::CancellationToken;

use crate::routes::{AppState, build_router};

/// Svckit Server - signed service pool front end
#[derive(Parser)]
#[command(name = "svckit-server")]
#[command(about = "Svckit Server - signed service pool front end")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a YAML configuration file (environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (secrets redacted) and exit
    #[arg(long)]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = MicroConfig::load_layered(cli.config.as_deref())?;
    svckit::logging::init_logging(&config.log_level);

    tracing::info!(service = %config.service_name, "Svckit Server starting");

    if cli.print_config {
        println!("Effective configuration:\n{}", config.to_redacted_json()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn check_config(config: &MicroConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    config.hmac_config().context("HMAC settings")?;
    config.service_descriptor().context("service settings")?;
    let pool = config.pool_descriptors().context("service pool")?;
    println!("Configuration is valid ({} pooled services)", pool.len());
    Ok(())
}

async fn run_server(config: MicroConfig) -> Result<()> {
    let hmac = HmacState::from_config(config.hmac_config()?);

    if config.gateway_url.as_deref().is_some_and(|url| !url.is_empty()) {
        config
            .register_at_gateway()
            .await
            .context("gateway registration failed")?;
    }

    let pool = Arc::new(ServicePool::with_probe_timeout(config.health_probe_timeout()));
    for descriptor in config.pool_descriptors()? {
        pool.add_service(descriptor);
    }

    let cancel = CancellationToken::new();
    let monitor = spawn_health_monitor(
        Arc::clone(&pool),
        config.health_check_interval(),
        cancel.clone(),
    );

    let state = AppState {
        app_name: Arc::from(config.service_name.as_str()),
        release_version: Arc::from(config.service_version.as_str()),
        pool,
    };
    let router = svckit::http::apply_middleware_stack(build_router(state, hmac), &config)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "listening");

    let shutdown = cancel.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
                () = shutdown.cancelled() => {}
            }
        })
        .await?;

    cancel.cancel();
    monitor.await?;
    tracing::info!("Svckit Server stopped");
    Ok(())
}
