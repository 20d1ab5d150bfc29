//! Integration tests for the Hush server.
//!
//! Each test starts a real `hush-server` process and talks to it over HTTP.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

/// Cheap key derivation so passphrase tests stay fast.
const TEST_KDF_ITERATIONS: &str = "1000";

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Status and JSON body of one API call.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    /// A string field of the body.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }
}

// ============================================================================
// Test Server
// ============================================================================

/// How the spawned server stores secrets.
pub enum Mode<'a> {
    /// `--dev`: in-memory store, ephemeral key.
    Dev,
    /// SQLite under `data_dir` with a fixed master key.
    Persistent { data_dir: &'a Path, key: &'a str },
}

/// A running server process, killed on drop.
pub struct TestServer {
    process: Child,
    pub base_url: String,
    pub port: u16,
}

impl TestServer {
    /// Start a development-mode server on the specified port.
    pub async fn start(port: u16) -> Result<Self> {
        Self::start_with(port, Mode::Dev).await
    }

    /// Start a server in the given mode.
    pub async fn start_with(port: u16, mode: Mode<'_>) -> Result<Self> {
        let server_binary = find_server_binary()?;

        let mut command = Command::new(&server_binary);
        command
            .arg("--bind")
            .arg(format!("127.0.0.1:{port}"))
            .arg("--kdf-iterations")
            .arg(TEST_KDF_ITERATIONS)
            .env_remove("HUSH_ENCRYPTION_KEY")
            .env_remove("HUSH_DEV_MODE")
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match mode {
            Mode::Dev => {
                command.arg("--dev");
            },
            Mode::Persistent { data_dir, key } => {
                command
                    .arg("--data-dir")
                    .arg(data_dir)
                    .arg("--encryption-key")
                    .arg(key);
            },
        }

        let process = command
            .spawn()
            .with_context(|| format!("Failed to start server: {server_binary:?}"))?;

        let server = Self {
            process,
            base_url: format!("http://127.0.0.1:{port}"),
            port,
        };

        server.wait_for_ready().await?;

        Ok(server)
    }

    /// Wait for the server to be ready to accept connections.
    async fn wait_for_ready(&self) -> Result<()> {
        let client = Client::new();
        let url = format!("{}/v1/health", self.base_url);

        for _ in 0..50 {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                _ => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }

        bail!("Server failed to start within 5 seconds")
    }

    /// Get a configured HTTP client for this server.
    pub fn client(&self) -> Result<HushClient> {
        HushClient::new(&self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Find the server binary in the target directory.
fn find_server_binary() -> Result<PathBuf> {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let target = Path::new(&manifest_dir).join("../../target");

    let candidates = [
        target.join("debug/hush-server"),
        target.join("debug/hush-server.exe"),
        target.join("release/hush-server"),
        target.join("release/hush-server.exe"),
    ];

    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.canonicalize()?);
        }
    }

    bail!(
        "Could not find hush-server binary. Run 'cargo build -p hush-server' first. Searched in: {:?}",
        candidates
    )
}

// ============================================================================
// Test Client
// ============================================================================

/// HTTP client for testing the Hush API.
#[derive(Clone)]
pub struct HushClient {
    client: Client,
    base_url: String,
}

impl HushClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn finish(resp: reqwest::Response) -> Result<ApiResponse> {
        let status = resp.status();
        let text = resp.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok(ApiResponse { status, body })
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self.client.get(self.url("/v1/health")).send().await?;
        Ok(resp.json().await?)
    }

    pub async fn submit(
        &self,
        secret: &str,
        passphrase: Option<&str>,
        ttl: u64,
    ) -> Result<ApiResponse> {
        let mut body = json!({ "secret": secret, "ttl": ttl });
        if let Some(passphrase) = passphrase {
            body["passphrase"] = json!(passphrase);
        }

        let resp = self
            .client
            .post(self.url("/v1/secrets"))
            .json(&body)
            .send()
            .await?;
        Self::finish(resp).await
    }

    /// Submits and returns the id, failing unless the server answered 201.
    pub async fn submit_ok(&self, secret: &str, passphrase: Option<&str>, ttl: u64) -> Result<String> {
        let resp = self.submit(secret, passphrase, ttl).await?;
        if resp.status != StatusCode::CREATED {
            bail!("Submit failed: {} {}", resp.status, resp.body);
        }
        resp.field("id")
            .map(str::to_string)
            .context("Submit response has no id")
    }

    pub async fn view(&self, id: &str) -> Result<ApiResponse> {
        let resp = self
            .client
            .get(self.url(&format!("/v1/secrets/{id}")))
            .send()
            .await?;
        Self::finish(resp).await
    }

    pub async fn reveal(&self, id: &str, passphrase: Option<&str>) -> Result<ApiResponse> {
        let body = match passphrase {
            Some(passphrase) => json!({ "passphrase": passphrase }),
            None => json!({}),
        };

        let resp = self
            .client
            .post(self.url(&format!("/v1/secrets/{id}/reveal")))
            .json(&body)
            .send()
            .await?;
        Self::finish(resp).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU16, Ordering};

    use hush_crypto::MasterKey;
    use tempfile::TempDir;

    // Port counter to avoid conflicts between parallel tests
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18300);

    fn next_port() -> u16 {
        PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_server_health_in_dev_mode() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client().unwrap();

        let health = client.health().await.unwrap();

        assert_eq!(health.status, "ok");
        assert!(!health.version.is_empty());
    }

    #[tokio::test]
    async fn test_plaintext_lifecycle() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client().unwrap();

        let id = client.submit_ok("launch codes", None, 60).await.unwrap();
        assert_eq!(id.len(), 32);

        let view = client.view(&id).await.unwrap();
        assert_eq!(view.status, StatusCode::OK);
        assert_eq!(view.field("protection"), Some("plaintext"));

        let reveal = client.reveal(&id, None).await.unwrap();
        assert_eq!(reveal.status, StatusCode::OK);
        assert_eq!(reveal.field("secret"), Some("launch codes"));

        let again = client.reveal(&id, None).await.unwrap();
        assert_eq!(again.status, StatusCode::NOT_FOUND);
        assert_eq!(client.view(&id).await.unwrap().status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_passphrase_lifecycle() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client().unwrap();

        let id = client
            .submit_ok("top secret", Some("horse-battery"), 60)
            .await
            .unwrap();

        let view = client.view(&id).await.unwrap();
        assert_eq!(view.field("protection"), Some("passphrase"));

        let missing = client.reveal(&id, None).await.unwrap();
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);

        let wrong = client.reveal(&id, Some("wrong")).await.unwrap();
        assert_eq!(wrong.status, StatusCode::FORBIDDEN);

        let right = client.reveal(&id, Some("horse-battery")).await.unwrap();
        assert_eq!(right.status, StatusCode::OK);
        assert_eq!(right.field("secret"), Some("top secret"));

        let again = client.reveal(&id, Some("horse-battery")).await.unwrap();
        assert_eq!(again.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_secret_expires_unviewed() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client().unwrap();

        let id = client.submit_ok("fleeting", None, 1).await.unwrap();
        assert_eq!(client.view(&id).await.unwrap().status, StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert_eq!(client.view(&id).await.unwrap().status, StatusCode::NOT_FOUND);
        assert_eq!(
            client.reveal(&id, None).await.unwrap().status,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_concurrent_reveals_single_winner() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client().unwrap();

        let id = client.submit_ok("only once", Some("pw"), 60).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let client = client.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                client.reveal(&id, Some("pw")).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            let resp = handle.await.unwrap();
            match resp.status {
                StatusCode::OK => winners += 1,
                StatusCode::NOT_FOUND => {},
                other => panic!("unexpected status {other}"),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_invalid_submissions_rejected() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client().unwrap();

        for (secret, ttl) in [("", 60), ("s", 0), ("s", 365 * 24 * 3600)] {
            let resp = client.submit(secret, None, ttl).await.unwrap();
            assert_eq!(resp.status, StatusCode::BAD_REQUEST);
            assert!(resp.field("error").is_some());
        }
    }

    #[tokio::test]
    async fn test_secret_survives_restart_with_same_key() {
        let data_dir = TempDir::new().unwrap();
        let encoded = MasterKey::generate().to_base64();
        let (dir, key) = (data_dir.path(), encoded.as_str());
        let mode = || Mode::Persistent { data_dir: dir, key };

        let id = {
            let server = TestServer::start_with(next_port(), mode()).await.unwrap();
            let client = server.client().unwrap();
            client.submit_ok("durable", Some("pw"), 60).await.unwrap()
        };

        let server = TestServer::start_with(next_port(), mode()).await.unwrap();
        let client = server.client().unwrap();

        let view = client.view(&id).await.unwrap();
        assert_eq!(view.field("protection"), Some("passphrase"));

        let reveal = client.reveal(&id, Some("pw")).await.unwrap();
        assert_eq!(reveal.field("secret"), Some("durable"));
    }

    #[test]
    fn test_server_refuses_to_start_without_key() {
        let data_dir = TempDir::new().unwrap();
        let status = Command::new(find_server_binary().unwrap())
            .arg("--data-dir")
            .arg(data_dir.path())
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", next_port()))
            .env_remove("HUSH_ENCRYPTION_KEY")
            .env_remove("HUSH_DEV_MODE")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .unwrap();

        assert!(!status.success());
    }
}
