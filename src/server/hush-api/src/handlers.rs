//! HTTP request handlers.

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::AppState;

/// Request body for `POST /v1/secrets`.
#[derive(Deserialize)]
pub struct SubmitRequest {
    /// Secret text.
    pub secret: String,
    /// Optional passphrase. Empty means none.
    #[serde(default)]
    pub passphrase: Option<String>,
    /// Time to live in seconds.
    pub ttl: u64,
}

/// Response body for `POST /v1/secrets`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Identifier to share with the recipient.
    pub id: String,
}

/// Response body for `GET /v1/secrets/{id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ViewResponse {
    /// `plaintext` or `passphrase`.
    pub protection: String,
}

/// Request body for `POST /v1/secrets/{id}/reveal`.
#[derive(Default, Deserialize)]
pub struct RevealRequest {
    /// Passphrase, for protected secrets.
    #[serde(default)]
    pub passphrase: Option<String>,
}

/// Response body for `POST /v1/secrets/{id}/reveal`.
#[derive(Serialize, Deserialize)]
pub struct RevealResponse {
    /// Decrypted secret.
    pub secret: String,
}

/// Response body for `GET /v1/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: String,
    /// Server version.
    pub version: String,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// GET /v1/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// POST /v1/secrets
pub async fn submit(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(body) = body?;

    let id = state
        .engine
        .submit(
            &body.secret,
            body.passphrase.as_deref(),
            Duration::from_secs(body.ttl),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse { id: id.to_string() }),
    ))
}

/// GET /v1/secrets/{id}
pub async fn view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ViewResponse>, ApiError> {
    let kind = state.engine.view(&id).await?;

    Ok(Json(ViewResponse {
        protection: kind.as_str().into(),
    }))
}

/// POST /v1/secrets/{id}/reveal
pub async fn reveal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<RevealRequest>, JsonRejection>,
) -> Result<Json<RevealResponse>, ApiError> {
    let Json(body) = body?;

    let secret = state
        .engine
        .reveal(&id, body.passphrase.as_deref())
        .await?;

    Ok(Json(RevealResponse {
        secret: secret.as_str().to_owned(),
    }))
}
