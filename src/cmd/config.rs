//! Configuration view and validation (`jidoka config`).

use anyhow::{Context, Result};
use jidoka::config::AppConfig;

pub fn cmd_config(config: &AppConfig) -> Result<()> {
    let mut shown = config.clone();
    if shown.generator.api_key.is_some() {
        shown.generator.api_key = Some("********".to_string());
    }
    let rendered = toml::to_string_pretty(&shown).context("Failed to serialize configuration")?;
    println!("{}", rendered);

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("Configuration is valid.");
    } else {
        println!("Warnings:");
        for warning in warnings {
            println!("  - {}", warning);
        }
    }
    Ok(())
}
