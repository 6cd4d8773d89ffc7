use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use comanda_notify::scheduler::{
    self, ConfirmationSweep, LogCleanupSweep, PendingEventSweep, RecurringJob,
};
use comanda_notify::{ChannelRegistry, NotifyConfig, PgNotificationStore, PgTenantDirectory};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use comanda_api::config::ServerConfig;
use comanda_api::router::build_app_router;
use comanda_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "comanda_api=debug,comanda_notify=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let notify_config = NotifyConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    tracing::info!(
        default_timezone = %notify_config.default_timezone,
        twilio_api_base = %notify_config.twilio_api_base,
        "Loaded notification configuration"
    );

    // --- Database ---
    let database_url = config
        .database_url
        .clone()
        .ok_or("DATABASE_URL must be set")?;

    let pool = comanda_db::create_pool(&database_url).await?;
    tracing::info!("Database connection pool created");

    comanda_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");

    comanda_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    // --- Notification engine ---
    let store = Arc::new(PgNotificationStore::new(pool.clone()));
    let directory = Arc::new(PgTenantDirectory::new(pool.clone()));
    let adapters =
        ChannelRegistry::standard(&notify_config.twilio_api_base, notify_config.provider_timeout)?;

    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let addr = SocketAddr::new(config.host.parse()?, config.port);

    let state = AppState::new(
        config,
        &notify_config,
        Some(pool),
        store.clone(),
        directory.clone(),
        adapters,
    );

    // --- Background sweeps ---
    let jobs: Vec<Arc<dyn RecurringJob>> = vec![
        Arc::new(ConfirmationSweep::new(
            store.clone(),
            directory,
            Arc::clone(&state.processor),
            notify_config.default_timezone,
            notify_config.confirmation_sweep_interval,
        )),
        Arc::new(PendingEventSweep::new(
            store,
            Arc::clone(&state.processor),
            notify_config.pending_sweep_interval,
        )),
        Arc::new(LogCleanupSweep::new(
            notify_config.log_retention_days,
            notify_config.log_cleanup_interval,
        )),
    ];
    let sweep_cancel = CancellationToken::new();
    let sweep_handles = scheduler::spawn_all(jobs, &sweep_cancel);
    tracing::info!(jobs = sweep_handles.len(), "Background sweeps started");

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    for handle in sweep_handles {
        if tokio::time::timeout(shutdown_timeout, handle).await.is_err() {
            tracing::warn!("Background sweep did not stop within the shutdown timeout");
        }
    }
    tracing::info!("Background sweeps stopped");

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
