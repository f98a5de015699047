use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{extract::State, middleware, response::Response, routing::get, Router};
use serde::Serialize;
use tracing::info;

use super::api_error::success;
use super::metrics::metrics_handler;
use super::songs_routes::make_songs_routes;
use super::state::{GuardedSongStore, OptionalCacheBackend, ServerState};
use super::upload_routes::make_upload_routes;
use super::{log_requests, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub cache_backend: &'static str,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> Response {
    success(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        cache_backend: state.synchronizer.cache().backend_name(),
    })
}

pub fn make_app(
    config: ServerConfig,
    song_store: GuardedSongStore,
    cache_backend: OptionalCacheBackend,
) -> Result<Router> {
    let state = ServerState::new(config, song_store, cache_backend);

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    let app = home_router
        .merge(make_songs_routes(state.clone()))
        .merge(make_upload_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serves `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: tokio::net::TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

pub async fn run_server(
    config: ServerConfig,
    song_store: GuardedSongStore,
    cache_backend: OptionalCacheBackend,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, song_store, cache_backend)?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(("0.0.0.0", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Serving songs on port {}, metrics on port {}", port, metrics_port);

    tokio::try_join!(
        serve(listener, app, shutdown_signal()),
        serve(metrics_listener, make_metrics_app(), shutdown_signal()),
    )?;
    Ok(())
}
