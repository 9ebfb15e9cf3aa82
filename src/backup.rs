//! Backup binary for copying the saved widget state to a backup file.
//!
//! Usage: cargo run --bin backup
//!        cargo run --bin backup -- --target my_backup.db
//!        cargo run --bin backup -- --db sqlite:other.db --target backup.db
//!
//! Creates a backup of all saved widget entries in a new file.

use anyhow::Result;
use chrono::Datelike;
use clap::Parser;
use dotenvy::EnvLoader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use event_form::config::AppConfig;
use event_form::persistence::SqliteStore;

#[derive(Parser, Debug)]
#[command(name = "backup")]
#[command(about = "Backup the saved widget state to a new file")]
struct Args {
    /// Source database URL (overrides DATABASE_URL and the config file)
    #[arg(long)]
    db: Option<String>,

    /// Target backup file path (default: backup_{year}_{month}_{day}.db)
    #[arg(long)]
    target: Option<String>,
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
    let source_url = args.db.unwrap_or(config.database_url);

    let now = chrono::Utc::now();
    let default_target = format!("backup_{}_{:02}_{:02}.db", now.year(), now.month(), now.day());
    let target_file = args.target.unwrap_or(default_target);
    let target_url = format!("sqlite:{}?mode=rwc", target_file);

    info!(source = %source_url, target = %target_file, "starting backup");
    let source = SqliteStore::connect(&source_url).await?;
    let target = SqliteStore::connect(&target_url).await?;

    let keys = source.keys().await?;
    let copied = source.copy_to(&target).await?;
    info!(copied, keys = ?keys, "backup completed");

    Ok(())
}
