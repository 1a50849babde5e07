use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use skatuve_dal::ConnectionCache;

use crate::error::ConnectionFault;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(db: ConnectionCache, app_config: AppConfig) -> Self {
        AppState {
            state: Arc::new(AppStateInner { db, app_config }),
        }
    }

    pub fn db(&self) -> &ConnectionCache {
        &self.state.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }
}

struct AppStateInner {
    db: ConnectionCache,
    app_config: AppConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub body_limit_kb: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            body_limit_kb: 1024,
        }
    }
}

/// Drops the cached database pool when a handler hit a connection failure.
pub async fn invalidate_on_connection_fault(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if response.extensions().get::<ConnectionFault>().is_some() {
        state.db().invalidate();
    }
    response
}
