use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use hyperion_core::Settings;
use hyperion_core::notification::LogNotificationTool;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use crate::routes;
use crate::state::AppState;

pub async fn run(settings: Settings) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = settings.port;
    let state = AppState::new(settings, Arc::new(LogNotificationTool))?;

    // Build the calendar file up front so the first subscriber does not wait
    match state.rebuild_ics().await {
        Ok(count) => tracing::info!("Calendar file ready with {count} events"),
        Err(e) => tracing::error!("Could not build the calendar file: {e:#}"),
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(state).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("hyperion listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
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
