use std::fs;
use std::sync::Arc;

use anyhow::Result;
use axum::{Router, routing::get, routing::get_service};
use dotenvy::EnvLoader;
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::EnvFilter;

use event_form::config::{self, AppConfig};
use event_form::form::{self, AppState};
use event_form::persistence::SqliteStore;
use event_form::storybook;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dotenv = EnvLoader::new().load().unwrap_or_default();
    let config = AppConfig::resolve(|name| {
        dotenv
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    })?;
    config::init_timezone(&config.timezone);

    let store = SqliteStore::connect(&config.database_url).await?;
    info!(database = %config.database_url, "database initialized");

    fs::create_dir_all("static")?;
    let static_dir = ServeDir::new("static");

    let addr = config.socket_addr()?;
    let state = AppState::new(Arc::new(store), config);

    let app = Router::new()
        .route("/", get(form::homepage))
        .nest("/api", form::router())
        .nest("/storybook", storybook::router())
        .with_state(state)
        .nest_service("/static", get_service(static_dir));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
