//! Mapping of engine errors onto HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use hush_secrets::SecretsError;

use crate::handlers::ErrorResponse;

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Engine error.
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    /// Request body could not be parsed.
    #[error("invalid request body: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Secrets(e) => match e {
                SecretsError::NotFound => StatusCode::NOT_FOUND,
                SecretsError::InvalidPassphrase => StatusCode::FORBIDDEN,
                SecretsError::Validation(_) => StatusCode::BAD_REQUEST,
                SecretsError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                SecretsError::CorruptRecord(_) | SecretsError::Crypto(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                },
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ApiError::Secrets(SecretsError::StoreUnavailable(_)) => {
                error!(error = %self, "Store unavailable");
                "store unavailable".to_string()
            },
            _ if status.is_server_error() => {
                error!(error = %self, "Request failed");
                "internal error".to_string()
            },
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
