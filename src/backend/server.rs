use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, header::InvalidHeaderValue},
};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};

use super::api::{self, AppState};
use super::db::{ChatDb, DbHandle};
use crate::agent::Assistant;

/// Configuration for the HTTP server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: std::path::PathBuf,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            db_path: std::path::PathBuf::from("jidoka.db"),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// CORS for the browser front-end: listed origins, credentials allowed.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, InvalidHeaderValue>>()
        .context("Invalid CORS origin")?;
    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// Build the full application router.
pub fn build_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    api::api_router().with_state(state).layer(cors)
}

/// Open (creating parent directories as needed) and migrate the database.
pub fn open_database(db_path: &std::path::Path) -> Result<ChatDb> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    ChatDb::new(db_path).context("Failed to initialize chat database")
}

/// Start the server and run until Ctrl+C.
pub async fn start_server(config: ServerConfig, assistant: Assistant) -> Result<()> {
    let db = open_database(&config.db_path)?;
    let state = Arc::new(AppState {
        db: DbHandle::new(db),
        assistant,
    });

    let app = build_router(state, cors_layer(&config.cors_origins)?);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!("Jidoka backend running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
