//! Application configuration.
//!
//! Settings are layered: built-in defaults → `jidoka.toml` (optional) →
//! environment variables → CLI flags. The resolved `AppConfig` is built once
//! at startup and handed to the components that need it; nothing below
//! `main` reads the environment.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//! db_path = "jidoka.db"
//! cors_origins = ["http://localhost:3000"]
//!
//! [generator]
//! base_url = "https://api.openai.com/v1"
//! model = "gpt-3.5-turbo"
//! request_timeout_secs = 60
//!
//! [workspace]
//! dir = "workspace"
//!
//! [executor]
//! interpreter = "python3"
//! timeout_secs = 15
//!
//! [router]
//! required = ["python"]
//! any_of = ["create", "作成", "作って"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::agent::generator::GeneratorConfig;
use crate::agent::router::TriggerKeywords;

pub const DEFAULT_CONFIG_FILE: &str = "jidoka.toml";

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Front-end origins allowed by CORS
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_db_path() -> PathBuf {
    PathBuf::from("jidoka.db")
}

fn default_cors_origins() -> Vec<String> {
    (3000..=3003)
        .map(|port| format!("http://localhost:{}", port))
        .collect()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Upstream chat-completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Usually supplied through `OPENAI_API_KEY` rather than the file
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSection {
    #[serde(default = "default_workspace_dir")]
    pub dir: PathBuf,
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("workspace")
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        Self {
            dir: default_workspace_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorSection {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Keyword lists that select the script pipeline over the clarification reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSection {
    #[serde(default = "default_required_keywords")]
    pub required: Vec<String>,
    #[serde(default = "default_any_keywords")]
    pub any_of: Vec<String>,
}

fn default_required_keywords() -> Vec<String> {
    vec!["python".to_string()]
}

fn default_any_keywords() -> Vec<String> {
    vec!["create".to_string(), "作成".to_string(), "作って".to_string()]
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            required: default_required_keywords(),
            any_of: default_any_keywords(),
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub generator: GeneratorSection,
    #[serde(default)]
    pub workspace: WorkspaceSection,
    #[serde(default)]
    pub executor: ExecutorSection,
    #[serde(default)]
    pub router: RouterSection,
}

impl AppConfig {
    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse jidoka.toml")
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Resolve configuration for this process.
    ///
    /// An explicit `path` must exist. Without one, `jidoka.toml` in the
    /// working directory is used when present, defaults otherwise. Environment
    /// overrides are applied last.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.generator.api_key = Some(key);
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.generator.base_url = url;
        }
        if let Some(model) = non_empty("OPENAI_MODEL") {
            self.generator.model = model;
        }
        if let Some(dir) = non_empty("JIDOKA_WORKSPACE") {
            self.workspace.dir = PathBuf::from(dir);
        }
        if let Some(interpreter) = non_empty("JIDOKA_PYTHON") {
            self.executor.interpreter = interpreter;
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            base_url: self.generator.base_url.clone(),
            model: self.generator.model.clone(),
            api_key: self.generator.api_key.clone(),
            request_timeout: Duration::from_secs(self.generator.request_timeout_secs),
        }
    }

    pub fn trigger_keywords(&self) -> TriggerKeywords {
        TriggerKeywords::new(self.router.required.clone(), self.router.any_of.clone())
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.executor.timeout_secs)
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.generator.api_key.is_none() {
            warnings.push(
                "OPENAI_API_KEY is not set; script generation requests will fail".to_string(),
            );
        }
        if self.executor.timeout_secs == 0 {
            warnings.push("executor.timeout_secs is 0; every script will time out".to_string());
        }
        if self.router.required.is_empty() && self.router.any_of.is_empty() {
            warnings.push(
                "router keyword lists are empty; every message will trigger script generation"
                    .to_string(),
            );
        }

        warnings
    }
}
