//! `wtconfig.toml`: generator provider settings and pipeline options.

use crate::schema::AggregateScope;
use crate::validation::{Validator, DEFAULT_DAY_LENGTH_SECONDS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "wtconfig.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("generator credential missing: set the {0} environment variable")]
    MissingCredential(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Supported generator backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Generative Language API.
    #[default]
    Gemini,
    /// OpenAI-compatible chat completions (OpenAI, OpenRouter, local gateways).
    OpenAi,
    /// Canned responses read from a script file; development and tests only.
    Scripted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_seconds: u64,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
    /// JSON file of canned responses for the scripted provider.
    pub script: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            model: "gemini-2.5-flash".to_string(),
            base_url: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_seconds: 120,
            temperature: None,
            max_output_tokens: None,
            script: None,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn needs_credential(&self) -> bool {
        self.provider != ProviderKind::Scripted
    }

    /// Read the API key once; absence is fatal for remote providers.
    pub fn credential(&self) -> Result<Option<String>, ConfigError> {
        if !self.needs_credential() {
            return Ok(None);
        }
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(Some(key)),
            _ => Err(ConfigError::MissingCredential(self.api_key_env.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub aggregate_scope: AggregateScope,
    pub day_length_seconds: i64,
    pub max_correction_iterations: usize,
    /// Root employee type; the lowest `etype` when unset.
    pub basic_etype: Option<i64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aggregate_scope: AggregateScope::Core,
            day_length_seconds: DEFAULT_DAY_LENGTH_SECONDS,
            max_correction_iterations: 3,
            basic_etype: None,
        }
    }
}

impl PipelineConfig {
    /// Validator for this pipeline's scope, day length and basic type.
    pub fn validator(&self) -> Validator {
        Validator::new(self.aggregate_scope)
            .with_day_length(self.day_length_seconds)
            .with_basic_etype(self.basic_etype)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub generator: GeneratorConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.check()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Load `path` if given, else `wtconfig.toml` when present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.generator.timeout_seconds == 0 {
            return Err(ConfigError::Invalid("generator.timeout_seconds must be positive".into()));
        }
        if self.pipeline.day_length_seconds <= 0 {
            return Err(ConfigError::Invalid("pipeline.day_length_seconds must be positive".into()));
        }
        if self.generator.provider == ProviderKind::Scripted && self.generator.script.is_none() {
            return Err(ConfigError::Invalid("scripted provider requires generator.script".into()));
        }
        Ok(())
    }
}
