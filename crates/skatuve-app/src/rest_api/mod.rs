use axum::response::IntoResponse;
use http::Method;

use crate::error::ApiError;

pub mod gallery;

pub(crate) fn method_not_allowed(method: Method, allow: &'static [Method]) -> impl IntoResponse {
    ApiError::MethodNotAllowed { method, allow }
}
