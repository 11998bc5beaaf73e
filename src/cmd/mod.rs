//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `serve`  | `Serve`          |
//! | `ask`    | `Ask`            |
//! | `config` | `Config`         |

pub mod ask;
pub mod config;
pub mod serve;

pub use ask::cmd_ask;
pub use config::cmd_config;
pub use serve::cmd_serve;

use std::sync::Arc;

use anyhow::{Context, Result};
use jidoka::agent::Assistant;
use jidoka::agent::executor::ScriptExecutor;
use jidoka::agent::generator::OpenAiGenerator;
use jidoka::agent::workspace::Workspace;
use jidoka::config::AppConfig;

/// Wire the assistant pipeline from resolved configuration.
pub fn build_assistant(config: &AppConfig) -> Result<Assistant> {
    let generator =
        OpenAiGenerator::new(config.generator_config()).context("Failed to create generator")?;
    Ok(Assistant::new(
        Arc::new(generator),
        Workspace::new(&config.workspace.dir),
        ScriptExecutor::new(
            config.executor.interpreter.clone(),
            config.execution_timeout(),
        ),
        config.trigger_keywords(),
    ))
}
