use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    response::{IntoResponse, Response},
    Json,
};
use http::{header, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Marker put into response extensions when the database connection failed.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionFault;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Method {method} is not allowed")]
    MethodNotAllowed {
        method: Method,
        allow: &'static [Method],
    },
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Internal(String),
}

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ApiError {
    pub fn category(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "ValidationError",
            ApiError::NotFound(_) => "NotFound",
            ApiError::MethodNotAllowed { .. } => "MethodNotAllowed",
            ApiError::ServiceUnavailable(_) => "ServiceUnavailable",
            ApiError::Configuration(_) => "ConfigurationError",
            ApiError::Internal(_) => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::ServiceUnavailable(_)
            | ApiError::Configuration(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub fn allow_header(methods: &[Method]) -> HeaderValue {
    let allow = methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    HeaderValue::from_str(&allow).unwrap_or_else(|_| HeaderValue::from_static(""))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self:?}");
        } else {
            debug!("Request rejected: {self}");
        }
        let detail = match &self {
            // internals are logged above, not sent to the caller
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: self.category().to_string(),
            detail,
            timestamp: OffsetDateTime::now_utc(),
        };
        let mut response = (status, Json(body)).into_response();
        match self {
            ApiError::MethodNotAllowed { allow, .. } => {
                response
                    .headers_mut()
                    .insert(header::ALLOW, allow_header(allow));
            }
            ApiError::ServiceUnavailable(_) => {
                response.extensions_mut().insert(ConnectionFault);
            }
            _ => {}
        }
        response
    }
}

impl From<skatuve_dal::Error> for ApiError {
    fn from(value: skatuve_dal::Error) -> Self {
        use skatuve_dal::{Error, SqlxError};
        match value {
            Error::RecordNotFound(what) => ApiError::NotFound(format!("{what} not found")),
            Error::MissingConfiguration(msg) => ApiError::Configuration(msg),
            Error::DatabaseError(e @ SqlxError::Configuration(_)) => {
                ApiError::Configuration(e.to_string())
            }
            e if e.is_client_error() => ApiError::Validation(e.to_string()),
            e if e.is_connection_error() => {
                ApiError::ServiceUnavailable(format!("Database is not available: {e}"))
            }
            e @ Error::MigrationError(_) => ApiError::ServiceUnavailable(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// JSON extractor answering malformed bodies with [`ApiError::Validation`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
