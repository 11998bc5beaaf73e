//! One-shot chat command (`jidoka ask`).

use anyhow::Result;
use jidoka::config::AppConfig;

pub async fn cmd_ask(config: &AppConfig, message: &str) -> Result<()> {
    let assistant = super::build_assistant(config)?;
    let reply = assistant.route(message).await;
    println!("{}", reply);
    Ok(())
}
