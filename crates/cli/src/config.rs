//! Configuration loading from parley.toml.

use std::collections::BTreeMap;
use std::path::Path;

use runtime::LaunchTable;
use runtime::providers::{DEFAULT_API_BASE, DEFAULT_MAX_OUTPUT_TOKENS};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Tool server to connect on start-up.
    #[serde(default)]
    pub server: ServerConfig,

    /// Extra extension → launcher commands, merged over the defaults.
    #[serde(default)]
    pub launchers: BTreeMap<String, String>,

    /// Replaces the default assistant instructions.
    pub system_prompt: Option<String>,
}

/// Chat backend configuration.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    pub api_key: Option<String>,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: default_api_base(),
            api_key: None,
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    pub path: Option<String>,
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_max_output_tokens() -> u32 {
    DEFAULT_MAX_OUTPUT_TOKENS
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment overrides: `MODEL` replaces the model, and
    /// `GROQ_API_KEY` is used when no key is configured.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("MODEL").filter(|m| !m.trim().is_empty()) {
            self.backend.model = model;
        }
        if self.backend.api_key.is_none() {
            self.backend.api_key = lookup("GROQ_API_KEY").filter(|k| !k.trim().is_empty());
        }
    }

    /// The launcher table: defaults plus configured entries.
    pub fn launch_table(&self) -> LaunchTable {
        self.launchers
            .iter()
            .fold(LaunchTable::default(), |table, (ext, command)| {
                table.with(ext, command.clone())
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
