//! Clear binary for resetting the saved widget state.
//!
//! Usage: cargo run --bin clear
//!        cargo run --bin clear -- --key event-schedule
//!
//! Deletes every saved widget entry, or only the given keys.

use anyhow::Result;
use clap::Parser;
use dotenvy::EnvLoader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use event_form::config::AppConfig;
use event_form::persistence::{KeyValueStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "clear")]
#[command(about = "Delete saved widget state")]
struct Args {
    /// Database URL (overrides DATABASE_URL and the config file)
    #[arg(long)]
    db: Option<String>,

    /// Only delete these keys; may be repeated
    #[arg(long)]
    key: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let dotenv = EnvLoader::new().load().unwrap_or_default();
    let config = AppConfig::resolve(|name| {
        dotenv
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    })?;
    let database_url = args.db.unwrap_or(config.database_url);

    info!(database = %database_url, "connecting");
    let store = SqliteStore::connect(&database_url).await?;

    if args.key.is_empty() {
        let removed = store.clear().await?;
        info!(removed, "cleared all widget state");
    } else {
        for key in &args.key {
            store.remove(key).await;
            info!(key = %key, "cleared");
        }
    }

    Ok(())
}
