//! Hush CLI - Command line interface.

use std::io::{self, Read};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use hush_crypto::MasterKey;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "hush")]
#[command(about = "Hush CLI - Share secrets that can be read exactly once")]
#[command(version)]
struct Cli {
    /// Hush server address
    #[arg(long, default_value = "http://localhost:8300", env = "HUSH_ADDR")]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a secret and print its id
    Submit {
        /// Secret text (read from stdin if omitted)
        secret: Option<String>,
        /// Time to live in seconds
        #[arg(long, default_value = "3600")]
        ttl: u64,
        /// Passphrase required to reveal the secret
        #[arg(long, env = "HUSH_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,
    },
    /// Check whether a secret exists and needs a passphrase
    View {
        /// Secret id
        id: String,
    },
    /// Reveal a secret. It is destroyed on success.
    Reveal {
        /// Secret id
        id: String,
        /// Passphrase, for protected secrets
        #[arg(long, env = "HUSH_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,
    },
    /// Generate a master encryption key
    Keygen,
    /// Check server status
    Status,
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    passphrase: Option<&'a str>,
    ttl: u64,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ViewResponse {
    protection: String,
}

#[derive(Serialize)]
struct RevealRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    passphrase: Option<&'a str>,
}

#[derive(Deserialize)]
struct RevealResponse {
    secret: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// HTTP Client
// ============================================================================

struct HushClient {
    client: Client,
    base_url: String,
}

impl HushClient {
    fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decodes a successful response or turns the error body into a message.
    async fn parse<T: DeserializeOwned>(resp: Response, action: &str) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let error: ErrorResponse = resp.json().await.unwrap_or(ErrorResponse {
                error: "Unknown error".into(),
            });
            match status {
                StatusCode::NOT_FOUND => {
                    bail!("{action} failed: secret not found (expired or already revealed)")
                },
                StatusCode::FORBIDDEN => bail!("{action} failed: wrong passphrase"),
                _ => bail!("{action} failed: {}", error.error),
            }
        }

        resp.json().await.context("Failed to parse response")
    }

    async fn get_health(&self) -> Result<HealthResponse> {
        let resp = self
            .client
            .get(self.url("/v1/health"))
            .send()
            .await
            .context("Failed to connect to server")?;

        Self::parse(resp, "Status").await
    }

    async fn submit(
        &self,
        secret: &str,
        passphrase: Option<&str>,
        ttl: u64,
    ) -> Result<SubmitResponse> {
        let req = SubmitRequest {
            secret,
            passphrase,
            ttl,
        };

        let resp = self
            .client
            .post(self.url("/v1/secrets"))
            .json(&req)
            .send()
            .await
            .context("Failed to connect to server")?;

        Self::parse(resp, "Submit").await
    }

    async fn view(&self, id: &str) -> Result<ViewResponse> {
        let resp = self
            .client
            .get(self.url(&format!("/v1/secrets/{id}")))
            .send()
            .await
            .context("Failed to connect to server")?;

        Self::parse(resp, "View").await
    }

    async fn reveal(&self, id: &str, passphrase: Option<&str>) -> Result<RevealResponse> {
        let resp = self
            .client
            .post(self.url(&format!("/v1/secrets/{id}/reveal")))
            .json(&RevealRequest { passphrase })
            .send()
            .await
            .context("Failed to connect to server")?;

        Self::parse(resp, "Reveal").await
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

/// Strips one trailing line ending, as left by `echo` or a heredoc.
fn trim_line_ending(mut input: String) -> String {
    if input.ends_with('\n') {
        input.pop();
        if input.ends_with('\r') {
            input.pop();
        }
    }
    input
}

fn read_secret(secret: Option<String>) -> Result<String> {
    let secret = match secret {
        Some(s) => s,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read secret from stdin")?;
            trim_line_ending(buf)
        },
    };

    if secret.is_empty() {
        bail!("Secret cannot be empty");
    }
    Ok(secret)
}

async fn cmd_status(client: &HushClient) -> Result<()> {
    let health = client.get_health().await?;

    println!("Hush server status:");
    println!("  Status:  {}", health.status);
    println!("  Version: {}", health.version);

    Ok(())
}

async fn cmd_submit(
    client: &HushClient,
    secret: Option<String>,
    passphrase: Option<&str>,
    ttl: u64,
) -> Result<()> {
    let secret = read_secret(secret)?;
    let result = client.submit(&secret, passphrase, ttl).await?;

    println!("{}", result.id);
    eprintln!("Secret stored. It can be revealed once within {ttl}s.");

    Ok(())
}

async fn cmd_view(client: &HushClient, id: &str) -> Result<()> {
    let result = client.view(id).await?;

    match result.protection.as_str() {
        "passphrase" => println!("Secret {id} exists and requires a passphrase"),
        _ => println!("Secret {id} exists"),
    }

    Ok(())
}

async fn cmd_reveal(client: &HushClient, id: &str, passphrase: Option<&str>) -> Result<()> {
    let result = client.reveal(id, passphrase).await?;
    println!("{}", result.secret);
    Ok(())
}

fn cmd_keygen() -> Result<()> {
    let key = MasterKey::generate();
    println!("{}", key.to_base64().as_str());
    eprintln!("Set this as HUSH_ENCRYPTION_KEY. Losing it makes stored secrets unreadable.");
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = HushClient::new(&cli.addr)?;

    match cli.command {
        Commands::Status => cmd_status(&client).await,
        Commands::Submit {
            secret,
            ttl,
            passphrase,
        } => cmd_submit(&client, secret, passphrase.as_deref(), ttl).await,
        Commands::View { id } => cmd_view(&client, &id).await,
        Commands::Reveal { id, passphrase } => {
            cmd_reveal(&client, &id, passphrase.as_deref()).await
        },
        Commands::Keygen => cmd_keygen(),
    }
}
