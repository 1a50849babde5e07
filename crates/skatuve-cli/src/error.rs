use reqwest::{Response, StatusCode};
use skatuve_app::error::ErrorBody;
use skatuve_types::OrderingError;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {error} - {detail}")]
    Api {
        status: StatusCode,
        error: String,
        detail: String,
    },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Ordering(#[from] OrderingError),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Passes successful responses through, turns the rest into [`ClientError::Api`].
pub(crate) async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let (error, detail) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.error, body.detail),
        Err(_) => (
            status.canonical_reason().unwrap_or("Error").to_string(),
            text,
        ),
    };
    Err(ClientError::Api {
        status,
        error,
        detail,
    })
}
