use axum::{middleware, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;
pub mod metrics;

pub use metrics::Metrics;

/// The fixed port the server listens on.
pub const PORT: u16 = 8081;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<Metrics>,
}

/// Builds the router. Kept separate from `run_server` so tests can drive it
/// without binding a socket.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::echo_path))
        .route("/hi", get(handlers::hi))
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::echo_path)
        .layer(middleware::from_fn_with_state(state.clone(), metrics::track))
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The main function to configure and run the web server.
pub async fn run_server(addr: SocketAddr) -> anyhow::Result<()> {
    let state = AppState {
        metrics: Arc::new(Metrics::new()?),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Web server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for Ctrl+C; running until killed.");
        std::future::pending::<()>().await;
    }
    tracing::warn!("Received Ctrl+C, initiating graceful shutdown...");
}
