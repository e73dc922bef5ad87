//! Authentication service
//!
//! Serves the authentication lifecycle API over HTTP, backed by PostgreSQL when
//! `DATABASE_URL` is set and by an in-memory store otherwise.

use authn_service::audit::{AuditExporter, TracingAuditSink};
use authn_service::config::Config;
use authn_service::observability::metrics::init_metrics_recorder;
use authn_service::repositories::{AuthenticationStore, MemoryStore, PostgresStore};
use authn_service::routes::{self, AppState};
use authn_service::services::bootstrap::bootstrap_token;
use authn_service::services::AuthenticationService;
use authn_service::tasks::start_expired_cleanup;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first: it decides the log format
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;

    common::logging::init_tracing(&config.observability)?;

    info!("Starting authentication service");
    info!(
        bind_address = %config.bind_address,
        store = if config.database.is_some() { "postgres" } else { "memory" },
        audit_logging_enabled = config.audit.logging_enabled,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    let store: Arc<dyn AuthenticationStore> = match &config.database {
        Some(database) => {
            info!("Connecting to database...");
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(database.max_connections)
                .acquire_timeout(Duration::from_secs(5))
                .connect(&database.postgres_url)
                .await
                .map_err(|e| {
                    error!("Failed to connect to database: {}", e);
                    e
                })?;

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(|e| {
                    error!("Failed to run migrations: {}", e);
                    e
                })?;

            info!("Database connection established");
            Arc::new(PostgresStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    if let Some(client_token) = config.bootstrap_token {
        bootstrap_token(store.as_ref(), client_token)
            .await
            .map_err(|e| {
                error!("Failed to bootstrap token authentication: {}", e);
                e
            })?;
    }

    let cancel_token = CancellationToken::new();

    let (emitter, exporter_handle) = AuditExporter::spawn(
        Arc::new(TracingAuditSink),
        config.audit.buffer_size,
        config.audit.send_timeout,
        cancel_token.child_token(),
    );

    let cleanup_handle = tokio::spawn(start_expired_cleanup(
        store.clone(),
        config.cleanup.clone(),
        cancel_token.child_token(),
    ));

    let service = AuthenticationService::new(store.clone(), emitter)
        .with_audit_logging_enabled(config.audit.logging_enabled);
    let state = Arc::new(AppState { service, store });
    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Authentication service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Stop background tasks; the exporter flushes queued audit events first
    cancel_token.cancel();
    if let Err(e) = cleanup_handle.await {
        error!("Cleanup task failed: {}", e);
    }
    if let Err(e) = exporter_handle.await {
        error!("Audit exporter failed: {}", e);
    }

    info!("Authentication service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
