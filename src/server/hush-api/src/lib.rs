//! # Hush API
//!
//! JSON API over the secrets engine.
//!
//! ## Endpoints
//!
//! - `GET  /v1/health` - Liveness
//! - `POST /v1/secrets` - Submit a secret
//! - `GET  /v1/secrets/{id}` - Check whether a passphrase is needed
//! - `POST /v1/secrets/{id}/reveal` - Reveal and destroy a secret

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use hush_secrets::SecretsEngine;

pub use error::ApiError;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The secrets engine.
    pub engine: Arc<SecretsEngine>,
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handlers::health))
        .route("/v1/secrets", post(handlers::submit))
        .route("/v1/secrets/{id}", get(handlers::view))
        .route("/v1/secrets/{id}/reveal", post(handlers::reveal))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use hush_crypto::MasterKey;
    use hush_secrets::EngineConfig;
    use hush_storage::MemoryStore;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let config = EngineConfig {
            kdf_iterations: 1_000,
            ..Default::default()
        };
        let engine =
            SecretsEngine::new(Arc::new(MemoryStore::new()), MasterKey::generate(), config)
                .unwrap();
        router(AppState {
            engine: Arc::new(engine),
        })
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn submit(app: &Router, body: Value) -> String {
        let (status, value) = call(app, Method::POST, "/v1/secrets", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        value["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, value) = call(&app, Method::GET, "/v1/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["status"], "ok");
    }

    #[tokio::test]
    async fn test_plaintext_flow() {
        let app = app();
        let id = submit(&app, json!({ "secret": "launch codes", "ttl": 60 })).await;

        let uri = format!("/v1/secrets/{id}");
        let (status, value) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["protection"], "plaintext");

        let reveal = format!("/v1/secrets/{id}/reveal");
        let (status, value) = call(&app, Method::POST, &reveal, Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["secret"], "launch codes");

        let (status, value) = call(&app, Method::POST, &reveal, Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(value["error"].is_string());

        let (status, _) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_passphrase_flow() {
        let app = app();
        let id = submit(
            &app,
            json!({ "secret": "top secret", "passphrase": "horse-battery", "ttl": 60 }),
        )
        .await;

        let (_, value) = call(&app, Method::GET, &format!("/v1/secrets/{id}"), None).await;
        assert_eq!(value["protection"], "passphrase");

        let reveal = format!("/v1/secrets/{id}/reveal");

        let (status, _) = call(&app, Method::POST, &reveal, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            call(&app, Method::POST, &reveal, Some(json!({ "passphrase": "wrong" }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, value) = call(
            &app,
            Method::POST,
            &reveal,
            Some(json!({ "passphrase": "horse-battery" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["secret"], "top secret");

        let (status, _) = call(
            &app,
            Method::POST,
            &reveal,
            Some(json!({ "passphrase": "horse-battery" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_submit_validation() {
        let app = app();

        for body in [
            json!({ "secret": "", "ttl": 60 }),
            json!({ "secret": "s", "ttl": 0 }),
            json!({ "secret": "s", "ttl": 10_000_000 }),
            json!({ "secret": "s" }),
            json!({ "ttl": 60 }),
        ] {
            let (status, value) = call(&app, Method::POST, "/v1/secrets", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(value["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let app = app();

        for id in ["0123456789abcdef0123456789abcdef", "not-an-id"] {
            let (status, _) = call(&app, Method::GET, &format!("/v1/secrets/{id}"), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_error_status_mapping() {
        use hush_secrets::SecretsError;

        let cases = [
            (SecretsError::NotFound, StatusCode::NOT_FOUND),
            (SecretsError::InvalidPassphrase, StatusCode::FORBIDDEN),
            (SecretsError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                SecretsError::StoreUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                SecretsError::CorruptRecord("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SecretsError::Crypto("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status(), expected);
        }
    }
}
