use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use achievo_core::authorization::AuthorizationGuard;
use achievo_core::coordinator::AchievementCoordinator;
use achievo_core::ports::Inbox;
use achievo_core::workflow::VerificationWorkflow;
use achievo_db::{PgDirectory, PgDocumentStore, PgInbox, PgReferenceStore};
use achievo_events::{BusNotifier, EventBus, NotificationDelivery};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use achievo_api::config::{LogFormat, ServerConfig};
use achievo_api::router::build_app_router;
use achievo_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "achievo_api=debug,achievo_core=info,achievo_events=info,tower_http=debug".into()
            }),
        )
        .with(pretty)
        .with(json)
        .init();

    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Databases ---
    let pool = achievo_db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("Failed to connect to reference database");
    let document_pool =
        achievo_db::create_pool(&config.document_database_url, config.db_max_connections)
            .await
            .expect("Failed to connect to document database");
    tracing::info!("Database connection pools created");

    achievo_db::health_check(&pool)
        .await
        .expect("Reference database health check failed");
    achievo_db::health_check(&document_pool)
        .await
        .expect("Document database health check failed");

    achievo_db::run_migrations(&pool)
        .await
        .expect("Failed to run reference database migrations");
    achievo_db::run_document_migrations(&document_pool)
        .await
        .expect("Failed to run document database migrations");
    tracing::info!("Database migrations applied");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let inbox: Arc<dyn Inbox> = Arc::new(PgInbox::new(pool.clone()));

    // Spawn notification delivery (writes notifications to the inbox).
    let delivery_cancel = CancellationToken::new();
    let delivery_handle = tokio::spawn(
        NotificationDelivery::new(Arc::clone(&inbox))
            .run(event_bus.subscribe(), delivery_cancel.clone()),
    );
    tracing::info!("Notification delivery started");

    // --- Services ---
    let guard = AuthorizationGuard::new(Arc::new(PgDirectory::new(pool.clone())));
    let coordinator = AchievementCoordinator::new(
        Arc::new(PgDocumentStore::new(document_pool.clone())),
        Arc::new(PgReferenceStore::new(pool.clone())),
        guard,
    );
    let workflow = VerificationWorkflow::new(
        coordinator.clone(),
        Arc::new(BusNotifier::new(Arc::clone(&event_bus))),
    );

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        coordinator,
        workflow,
        inbox,
        databases: Arc::new(vec![
            ("reference", pool.clone()),
            ("document", document_pool.clone()),
        ]),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Deliver whatever is still queued, then stop.
    delivery_cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, delivery_handle).await.is_err() {
        tracing::warn!("Notification delivery did not drain in time");
    }
    drop(event_bus);
    tracing::info!("Event services shut down");

    pool.close().await;
    document_pool.close().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
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
