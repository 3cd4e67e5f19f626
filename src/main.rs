//! transfer_ledger - account balances and atomic transfers over HTTP
//!
//! Serves the ledger API on top of PostgreSQL or an in-process store.

use std::net::SocketAddr;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transfer_ledger::config::{Config, StorageBackend};
use transfer_ledger::store::{LedgerStore, MemoryStore, PgStore};
use transfer_ledger::{api, db};

/// Initialize tracing/logging
fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "transfer_ledger=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(backend = ?config.storage_backend, "Starting transfer_ledger server");

    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; balances are lost on shutdown");
            let store = MemoryStore::with_lock_timeout(config.lock_timeout());
            serve(addr, store).await?;
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres backend"))?;

            tracing::info!("Connecting to database...");

            // Create database pool
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await?;
            db::verify_connection(&pool).await?;

            if config.run_migrations {
                db::run_migrations(&pool).await?;
            }

            // Verify database schema
            if !db::check_schema(&pool).await? {
                tracing::error!("Database schema is not complete. Please run migrations.");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }

            tracing::info!("Database connected successfully");

            let store = PgStore::new(pool.clone()).with_lock_timeout(config.lock_timeout());
            serve(addr, store).await?;

            pool.close().await;
            tracing::info!("Database connections closed");
        }
    }

    tracing::info!("Goodbye!");
    Ok(())
}

/// Run the HTTP server until a shutdown signal arrives
async fn serve<S: LedgerStore>(addr: SocketAddr, store: S) -> anyhow::Result<()> {
    let app = api::build_app(store);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
