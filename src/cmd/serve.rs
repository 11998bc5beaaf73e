//! HTTP server command (`jidoka serve`).

use std::path::PathBuf;

use anyhow::Result;
use jidoka::backend::server::{self, ServerConfig};
use jidoka::config::AppConfig;

pub async fn cmd_serve(
    config: &AppConfig,
    port: Option<u16>,
    host: Option<String>,
    db_path: Option<PathBuf>,
    init: bool,
) -> Result<()> {
    let db_path = db_path.unwrap_or_else(|| config.server.db_path.clone());

    if init {
        // Just initialize the database
        server::open_database(&db_path)?;
        println!("Database initialized at {}", db_path.display());
        return Ok(());
    }

    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    let assistant = super::build_assistant(config)?;
    server::start_server(
        ServerConfig {
            host: host.unwrap_or_else(|| config.server.host.clone()),
            port: port.unwrap_or(config.server.port),
            db_path,
            cors_origins: config.server.cors_origins.clone(),
        },
        assistant,
    )
    .await
}
