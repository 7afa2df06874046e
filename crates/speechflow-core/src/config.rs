use crate::error::ConfigError;
use crate::types::DeliveryMode;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub session: SessionDefaults,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub operation: OperationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionDefaults {
    /// Language used when a session config leaves `languageCode` empty.
    #[serde(default = "default_language")]
    pub default_language: String,

    #[serde(default)]
    pub delivery: DeliveryMode,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            delivery: DeliveryMode::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_engine")]
    pub name: String,

    /// Engine-specific settings, handed to the engine untouched.
    #[serde(default = "empty_table")]
    pub settings: toml::Value,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_engine(),
            settings: empty_table(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OperationConfig {
    #[serde(default)]
    pub project_id: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_engine() -> String {
    "null".to_string()
}

fn empty_table() -> toml::Value {
    toml::Value::Table(Default::default())
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern compiles"))
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = input.to_string();

    for cap in env_var_pattern().captures_iter(input) {
        let var_name = &cap[1];
        let value =
            std::env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
        result = result.replace(&cap[0], &value);
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        tracing::debug!(
            engine = %config.engine.name,
            delivery = ?config.session.delivery,
            "configuration parsed"
        );
        Ok(config)
    }
}
