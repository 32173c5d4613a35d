//! Tournament server.
//!
//! Serves the bracket engine over HTTP, storing tournaments either in
//! PostgreSQL or in process memory.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use bracket_engine::{db::Database, tournament::TournamentManager};
use bracket_server::{
    api,
    config::{CliOverrides, ServerConfig, StorageBackend},
    logging, metrics,
};
use ctrlc::set_handler;
use pico_args::Arguments;
use tokio::sync::watch;
use tracing::info;

const HELP: &str = "\
Run a single-elimination tournament server

USAGE:
  bracket_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:7878]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --memory                 Keep tournaments in memory, ignoring DATABASE_URL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  STORAGE                  memory | postgres
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = CliOverrides {
        bind: pargs.opt_value_from_str::<_, SocketAddr>("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        memory: pargs.contains("--memory"),
    };

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    logging::init();

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exported at http://{addr}/metrics");
    }

    let (manager, pool) = match config.storage {
        StorageBackend::Memory => {
            info!("Storing tournaments in memory");
            (TournamentManager::in_memory(), None)
        }
        StorageBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::connect(&config.database)
                .await
                .context("Failed to open tournament database")?;
            info!("Database connected successfully");

            (db.tournament_manager(), Some(db.pool()))
        }
    };

    let state = api::AppState {
        tournament_manager: Arc::new(manager),
        pool,
    };
    let app = api::create_router(state);

    // Ctrl+C flips the watch channel; axum drains in-flight requests.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Tournament server ({} storage) running at http://{}. Press Ctrl+C to stop.",
        config.storage, config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    Ok(())
}

/// Resolves once the Ctrl+C handler has fired
async fn shutdown_signal(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
