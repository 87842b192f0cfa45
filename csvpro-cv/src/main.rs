//! csvpro-cv - CSV conversion service
//!
//! Accepts CSV uploads or pasted text, previews the parsed rows and exports
//! them as JSON or SQL. Free-tier users see only the first rows.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use csvpro_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use csvpro_common::db::{init_database, RuntimeSettings};
use csvpro_cv::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for csvpro-cv
#[derive(Parser, Debug)]
#[command(name = "csvpro-cv")]
#[command(about = "CSV to JSON/SQL conversion service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "CSVPRO_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "CSVPRO_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing so the log level can come from it
    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("csvpro_cv={0},csvpro_common={0},tower_http=info", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting CSV Pro converter (csvpro-cv) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new("csvpro-cv")
        .with_cli_arg(args.root_folder)
        .with_toml(&config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| initializer.database_path());
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e).context("Database initialization failed");
        }
    };

    let settings = RuntimeSettings::load(&pool)
        .await
        .context("Failed to load runtime settings")?;
    info!(
        "Free row limit: {}, preview rows: {}, history limit: {}, session TTL: {}s",
        settings.free_row_limit, settings.preview_rows, settings.history_limit, settings.session_ttl_secs
    );

    let webhook_secret = config.webhook_secret();
    if webhook_secret.is_none() {
        warn!("No billing webhook secret configured; /api/billing/webhook will answer 503");
    }

    let state = AppState::new(pool, settings)
        .with_webhook_secret(webhook_secret, config.billing.signature_tolerance_secs)
        .with_max_upload_bytes(config.max_upload_bytes);
    if let Some(ttl) = state.sessions.idle_ttl() {
        state.sessions.spawn_eviction(eviction_period(ttl));
    }
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", config.bind_host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("csvpro-cv listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Sweep period: a quarter of the TTL, kept between one second and five minutes
fn eviction_period(ttl: Duration) -> Duration {
    (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(300))
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
