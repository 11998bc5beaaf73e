use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use jidoka::config::AppConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "jidoka")]
#[command(version, about = "Project chat backend with a script-writing assistant")]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a TOML config file. Defaults to ./jidoka.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Initialize database only (don't start server)
        #[arg(long)]
        init: bool,
    },
    /// Send one message to the assistant and print its reply
    Ask {
        /// The chat message
        message: String,
    },
    /// Show the resolved configuration and any warnings
    Config,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            port,
            host,
            db_path,
            init,
        } => {
            cmd::cmd_serve(&config, port, host, db_path, init).await?;
        }
        Commands::Ask { message } => {
            cmd::cmd_ask(&config, &message).await?;
        }
        Commands::Config => cmd::cmd_config(&config)?,
    }

    Ok(())
}
