//! Claims Document Assistant - API Server Binary
//!
//! # Usage
//!
//! ```bash
//! # In-memory storage, default port 8000
//! cargo run --bin claim-assistant
//!
//! # PostgreSQL storage
//! API_STORAGE__BACKEND=postgres API_STORAGE__DATABASE_URL=postgres://... cargo run --bin claim-assistant
//! ```
//!
//! # Environment Variables
//!
//! * `API_SERVER__HOST` / `API_SERVER__PORT` - Bind address (default: 0.0.0.0:8000)
//! * `API_LOG__LEVEL` - Filter directive (default: info, `RUST_LOG` wins when set)
//! * `API_LOG__FORMAT` - `pretty` or `json`
//! * `API_STORAGE__BACKEND` - `memory` or `postgres`
//! * `API_STORAGE__DATABASE_URL` - PostgreSQL connection string
//! * `API_WIZARD__PROCESSING_DELAY_MS` - Simulated wizard processing time
//! * `API_UPLOAD__MAX_BODY_BYTES` - Upload request size limit
//! * `API_PIPELINE__CLASSIFICATION_THRESHOLD`, `API_PIPELINE__EXTRACTION_MAX_FIELDS`,
//!   `API_PIPELINE__EVALUATION_THRESHOLD` - Pipeline tuning

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_claims::ClaimStore;
use infra_db::{create_pool, run_migrations, DatabaseConfig, InMemoryClaimStore, PostgresClaimStore};
use interface_api::config::{ApiConfig, LogFormat, StorageBackend};
use interface_api::{create_router, AppState};

/// Main entry point for the API server.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded or is invalid
/// - The PostgreSQL backend is selected and the database is unreachable
/// - Server fails to bind to the configured address
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    init_tracing(&config.log.level, config.log.format);

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        backend = ?config.storage.backend,
        "Starting Claims Document Assistant API Server"
    );

    let store = create_store(&config).await?;
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .context("invalid server address")?;

    let app = create_router(AppState::with_store(store, config));

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

/// Creates the configured claim store, migrating PostgreSQL first
async fn create_store(config: &ApiConfig) -> anyhow::Result<Arc<dyn ClaimStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory claim store; claims are lost on restart");
            Ok(Arc::new(InMemoryClaimStore::new()))
        }
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::new(config.storage.database_url.clone())
                .max_connections(config.storage.max_connections);
            let pool = create_pool(db_config)
                .await
                .context("failed to connect to database")?;
            run_migrations(&pool).await.context("failed to run migrations")?;
            Ok(Arc::new(PostgresClaimStore::new(pool)))
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
