//! meetly-server - meeting attendance API
//!
//! Serves the REST API over a SQLite database in the root folder and runs the
//! participant duration checkpoint in the background.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use meetly_common::config::{CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig};
use meetly_common::db::init::init_database;
use meetly_server::checkpoint::{CheckpointConfig, CheckpointService};
use meetly_server::{build_router, AppState, LiveKitTokenIssuer};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for meetly-server
#[derive(Parser, Debug)]
#[command(name = "meetly-server")]
#[command(about = "Meeting attendance API server")]
#[command(version)]
struct Args {
    /// Path to meetly.toml (default: platform config directory)
    #[arg(short, long, env = "MEETLY_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding meetly.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to bind (overrides [server] host)
    #[arg(long, env = "MEETLY_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides [server] port)
    #[arg(short, long, env = "MEETLY_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let defaults = CompiledDefaults::for_current_platform();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},tower_http=info", defaults.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting meetly-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let root_folder = RootFolderResolver::new("meetly-server")
        .with_cli_arg(args.root_folder)
        .with_config(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let shutdown = CancellationToken::new();
    let checkpoint = CheckpointService::new(CheckpointConfig::from(&config.tracker), pool.clone())
        .spawn(shutdown.clone());

    let room_tokens = Arc::new(LiveKitTokenIssuer::new(&config.livekit));
    info!("Media rooms at {} (api key {})", config.livekit.url, config.livekit.api_key);

    let app = build_router(AppState::new(pool.clone(), room_tokens));

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("meetly-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    shutdown.cancel();
    if let Err(e) = checkpoint.await {
        error!("Checkpoint task ended abnormally: {}", e);
    }
    pool.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
