pub mod cors;
pub mod error;
pub mod rest_api;
pub mod state;

use axum::{extract::DefaultBodyLimit, middleware, Router};

use crate::state::AppState;

#[macro_export]
macro_rules! repository_from_request {
    ($repo:ty) => {
        impl axum::extract::FromRequestParts<$crate::state::AppState> for $repo {
            type Rejection = $crate::error::ApiError;

            fn from_request_parts(
                _parts: &mut http::request::Parts,
                state: &$crate::state::AppState,
            ) -> impl std::future::Future<Output = std::result::Result<Self, Self::Rejection>>
                   + core::marker::Send {
                let db = state.db().clone();
                async move {
                    let pool = db.pool().await?;
                    std::result::Result::Ok(<$repo>::new(pool))
                }
            }
        }
    };
}

/// All JSON API routes with their cross-cutting layers.
pub fn api_router(state: AppState) -> Router<()> {
    let body_limit = state.config().body_limit_kb * 1024;
    Router::new()
        .nest("/api/galleries", rest_api::gallery::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            state::invalidate_on_connection_fault,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(cors::permissive_cors))
        .with_state(state)
}
