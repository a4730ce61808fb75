//! Router assembly and server lifecycle.

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::notify::{NotificationDispatcher, SmtpMailer};
use crate::store::{create_store, SharedStorage};

use super::{tasks, users};
use super::types::HealthResponse;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Task and user storage backend
    pub storage: SharedStorage,
    /// Email notifications
    pub dispatcher: Arc<NotificationDispatcher>,
}

/// Build the application router over prepared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .nest("/api/tasks", tasks::routes())
        .nest("/api/users", users::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let storage = create_store(config.store_type, config.database_path.clone()).await?;
    tracing::info!("Task store ready ({:?})", config.store_type);

    let transport = Arc::new(SmtpMailer::new(&config.smtp)?);
    let dispatcher = Arc::new(NotificationDispatcher::new(
        config.mail.clone(),
        transport,
        Arc::clone(&storage).into_user_directory(),
    ));

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState {
        config,
        storage,
        dispatcher,
    });
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mail_configured: state.dispatcher.is_configured(),
        store: state.config.store_type.as_str().to_string(),
        persistent: state.storage.is_persistent(),
    })
}
