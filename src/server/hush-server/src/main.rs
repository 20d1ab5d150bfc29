//! Hush Server - Main entry point.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hush_api::AppState;
use hush_crypto::MasterKey;
use hush_secrets::config::{DEFAULT_MAX_SECRET_BYTES, DEFAULT_MAX_TTL};
use hush_secrets::{EngineConfig, SecretsEngine};
use hush_storage::{HashStore, MemoryStore};
use hush_storage_sqlite::SqliteStore;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "hush-server")]
#[command(about = "Hush - one-time secret sharing server")]
#[command(version)]
struct Cli {
    /// Enable development mode (in-memory storage, ephemeral key if none given)
    #[arg(long, env = "HUSH_DEV_MODE")]
    dev: bool,

    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:8300", env = "HUSH_BIND_ADDRESS")]
    bind: String,

    /// Master encryption key (URL-safe base64, at least 32 bytes)
    #[arg(long, env = "HUSH_ENCRYPTION_KEY", hide_env_values = true)]
    encryption_key: Option<String>,

    /// Directory for the SQLite database
    #[arg(long, default_value = "data", env = "HUSH_DATA_DIR")]
    data_dir: PathBuf,

    /// PBKDF2 iterations for passphrase-protected secrets
    #[arg(long, default_value_t = hush_crypto::kdf::DEFAULT_PBKDF2_ITERATIONS, env = "HUSH_KDF_ITERATIONS")]
    kdf_iterations: u32,

    /// Longest accepted TTL, in seconds
    #[arg(long, default_value_t = DEFAULT_MAX_TTL.as_secs(), env = "HUSH_MAX_TTL")]
    max_ttl: u64,

    /// Largest accepted secret, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_SECRET_BYTES, env = "HUSH_MAX_SECRET_BYTES")]
    max_secret_bytes: usize,
}

/// The configured backend, kept concrete for periodic purging.
#[derive(Clone)]
enum Store {
    Memory(Arc<MemoryStore>),
    Sqlite(SqliteStore),
}

impl Store {
    async fn open(cli: &Cli) -> anyhow::Result<Self> {
        if cli.dev {
            tracing::info!("Using in-memory storage");
            return Ok(Store::Memory(Arc::new(MemoryStore::new())));
        }

        tracing::info!(data_dir = %cli.data_dir.display(), "Using SQLite storage");
        let store = SqliteStore::open(&cli.data_dir, "hush")
            .await
            .context("failed to open SQLite store")?;
        Ok(Store::Sqlite(store))
    }

    fn backend(&self) -> Arc<dyn HashStore> {
        match self {
            Store::Memory(store) => store.clone(),
            Store::Sqlite(store) => Arc::new(store.clone()),
        }
    }

    async fn purge_expired(&self) -> anyhow::Result<u64> {
        let purged = match self {
            Store::Memory(store) => store.purge_expired()? as u64,
            Store::Sqlite(store) => store.purge_expired().await?,
        };
        Ok(purged)
    }
}

fn load_master_key(cli: &Cli) -> anyhow::Result<MasterKey> {
    match &cli.encryption_key {
        Some(encoded) => MasterKey::from_base64(encoded).context("invalid HUSH_ENCRYPTION_KEY"),
        None if cli.dev => {
            tracing::warn!(
                "No encryption key configured - using an ephemeral key, secrets will not survive a restart"
            );
            Ok(MasterKey::generate())
        },
        None => bail!("HUSH_ENCRYPTION_KEY is required outside development mode"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    tracing::info!("Starting Hush server...");
    tracing::info!("Bind address: {}", cli.bind);

    if cli.dev {
        tracing::warn!("Development mode enabled - DO NOT USE IN PRODUCTION");
    }

    let master_key = load_master_key(&cli)?;
    let store = Store::open(&cli).await?;

    let config = EngineConfig {
        kdf_iterations: cli.kdf_iterations,
        max_ttl: Duration::from_secs(cli.max_ttl),
        max_secret_bytes: cli.max_secret_bytes,
    };
    let engine = SecretsEngine::new(store.backend(), master_key, config)
        .context("invalid engine configuration")?;

    let purger = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match purger.purge_expired().await {
                Ok(0) => {},
                Ok(purged) => tracing::debug!(purged, "Expired secrets purged"),
                Err(e) => tracing::warn!(error = %e, "Purge of expired secrets failed"),
            }
        }
    });

    let app = hush_api::router(AppState {
        engine: Arc::new(engine),
    });

    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;

    tracing::info!("Hush server started successfully");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
