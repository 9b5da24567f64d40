//! Shell configuration: defaults, then `timetools.toml`, then `TIMETOOLS__*`
//! environment variables.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "timetools.toml";
pub const ENV_PREFIX: &str = "TIMETOOLS__";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    /// Program to activate at startup.
    pub initial_program: Option<String>,
    pub todo_storage_path: PathBuf,
    pub log_filter: String,
    /// Upper bound on how long the host sleeps between updates.
    pub idle_poll_millis: u64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            initial_program: None,
            todo_storage_path: PathBuf::from("todo-storage.json"),
            log_filter: "info".to_string(),
            idle_poll_millis: 50,
        }
    }
}

impl ShellConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }

    /// Overlays `TIMETOOLS__<FIELD>` pairs. Unknown keys are ignored.
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(field) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref();
            match field.to_ascii_lowercase().as_str() {
                "initial_program" => {
                    let value = value.trim();
                    self.initial_program = (!value.is_empty()).then(|| value.to_string());
                }
                "todo_storage_path" => self.todo_storage_path = PathBuf::from(value),
                "log_filter" => self.log_filter = value.to_string(),
                "idle_poll_millis" => {
                    self.idle_poll_millis =
                        value
                            .trim()
                            .parse()
                            .map_err(|_| ConfigError::InvalidValue {
                                key: key.as_ref().to_string(),
                                value: value.to_string(),
                            })?;
                }
                other => log::debug!("ignoring unknown config variable {ENV_PREFIX}{other}"),
            }
        }
        Ok(())
    }
}

/// Reads `path`, or `timetools.toml` in the working directory when it exists,
/// then applies the process environment.
pub fn load_config(path: Option<&Path>) -> Result<ShellConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                read_file(default_path)?
            } else {
                ShellConfig::default()
            }
        }
    };
    config.apply_env(std::env::vars())?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<ShellConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = ShellConfig::from_toml(&text)?;
    log::info!("loaded config from {}", path.display());
    Ok(config)
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    InvalidValue {
        key: String,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse(err) => write!(f, "invalid config: {err}"),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value '{value}' for {key}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(err) => Some(err),
            ConfigError::InvalidValue { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
