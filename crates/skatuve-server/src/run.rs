use std::path::Path;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use futures::FutureExt;
use skatuve_app::{api_router, state::AppState};
use skatuve_dal::ConnectionCache;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::Result;

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args);
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let app = main_router(state, args.static_dir.as_deref());

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server stopped");
    Ok(())
}

pub fn main_router(state: AppState, static_dir: Option<&Path>) -> Router<()> {
    let mut router = api_router(state).route("/health", get(health));

    if let Some(dir) = static_dir {
        info!("Serving frontend from {}", dir.display());
        let frontend = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        router = router.fallback_service(frontend);
    }

    router.layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// State with a lazily connected database, nothing is opened until the first request.
pub fn build_state(config: &ServerConfig) -> AppState {
    if config.database_url.is_none() {
        warn!("Database URL is not configured, API requests will fail until it is set");
    }
    let db = ConnectionCache::new(config.db_config());
    AppState::new(db, config.app_config())
}
