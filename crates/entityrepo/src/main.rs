use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use entityrepo::cli::{execute, Cli, Domain, LogFormat};
use entityrepo::{Config, Repositories};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber; logs go to stderr so stdout stays JSON
    let json_logs = cli.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "entityrepo=info,entityrepo_core=info".into()),
        )
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .init();

    let config = Config::from_env();
    let store = Arc::new(build_store(&config).await);
    let repos = Repositories::new(store, &config)?;

    let result = match cli.domain {
        Domain::Sites => execute(&repos.sites, &cli.command).await,
        Domain::Artifacts => execute(&repos.artifacts, &cli.command).await,
        Domain::Sessions => execute(&repos.sessions, &cli.command).await,
        Domain::ContentCache => execute(&repos.content_cache, &cli.command).await,
    };

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(err) => {
            tracing::error!(error = %err, domain = ?cli.domain, "Command failed");
            Err(err.into())
        }
    }
}

/// In-memory tables start empty on every run.
#[cfg(feature = "inmemory")]
async fn build_store(config: &Config) -> entityrepo::storage::InMemoryStore {
    tracing::info!("Using in-memory store");
    entityrepo::repositories::in_memory_store(config)
}

#[cfg(feature = "dynamodb")]
async fn build_store(_config: &Config) -> entityrepo::storage::DynamoDbStore {
    entityrepo::storage::DynamoDbStore::from_env().await
}
