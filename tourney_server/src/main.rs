//! Tournament platform server.
//!
//! Connects to PostgreSQL and Redis (or runs on in-memory backends with
//! `--memory`), applies migrations and serves the HTTP API.

use std::sync::Arc;

use anyhow::{Context, Error};
use pico_args::Arguments;
use tourney::Services;
use tourney::cache::{MemoryRankedCache, RankedCache, RedisRankedCache};
use tourney::db::Database;
use tourney::store::{MemoryStore, PgStore, Store};
use tourney_server::api;
use tourney_server::config::{Backend, Overrides, ServerConfig};
use tourney_server::{logging, metrics};
use tracing::info;

const HELP: &str = "\
Run the tournament platform server

USAGE:
  tourney_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --redis-url  URL         Redis connection string     [default: env REDIS_URL or redis://127.0.0.1:6379]

FLAGS:
  --memory                 Use in-memory store and cache (nothing is persisted)
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  DB_MAX_CONNECTIONS       Pool size
  REDIS_URL                Redis connection string
  CACHE_KEY_PREFIX         Prefix of every cache key [default: tourney:]
  TOURNAMENT_ENTRY_FEE     Money charged on join [default: 50]
  TOURNAMENT_CAPACITY      Participants that finish a tournament [default: 10]
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  RUST_LOG                 Log filter
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

    let overrides = Overrides {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        redis_url: pargs.opt_value_from_str("--redis-url")?,
        memory: pargs.contains("--memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;
    info!("Starting tournament server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exported on {}", addr);
    }

    let (store, cache, db): (Arc<dyn Store>, Arc<dyn RankedCache>, Option<Database>) =
        match config.backend {
            Backend::Memory => {
                info!("Using in-memory store and cache");
                (
                    Arc::new(MemoryStore::new()),
                    Arc::new(MemoryRankedCache::with_prefix(config.cache.key_prefix.clone())),
                    None,
                )
            }
            Backend::External => {
                let db = Database::new(&config.database)
                    .await
                    .context("Failed to connect to database")?;
                db.migrate().await.context("Failed to run migrations")?;
                info!("Database connected successfully");

                let cache = RedisRankedCache::new(&config.cache)
                    .context("Invalid Redis configuration")?;
                (
                    Arc::new(PgStore::new(db.shared_pool())),
                    Arc::new(cache),
                    Some(db),
                )
            }
        };

    let services = Services::new(store, cache, config.rules);
    let report = services.maintenance.health().await;
    if !report.is_healthy() {
        tracing::warn!(?report, "Starting with degraded backends");
    }

    let app = api::create_router(api::AppState::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = db {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
