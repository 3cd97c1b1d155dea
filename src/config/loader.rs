//! Configuration Loader
//!
//! Environment-aware loading of [`SqlKitConfig`]. Sources are layered with the
//! `config` crate, later sources overriding earlier ones:
//!
//! 1. `{dir}/sqlkit.{yaml,toml,json}` (optional)
//! 2. `{dir}/sqlkit-{environment}.{yaml,toml,json}` (optional)
//! 3. `SQLKIT__*` environment variables, `__` separating nested keys
//!    (`SQLKIT__CACHE__EXPIRE_SECONDS=30`)

use super::SqlKitConfig;
use crate::constants::env_vars;
use crate::error::{SqlKitError, SqlKitResult};
use config::{Config, Environment, File, FileFormat};
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_BASENAME: &str = "sqlkit";

/// Keys whose string values are masked before the loaded document is logged
const SENSITIVE_PATTERNS: &[&str] = &[
    "connection_strings",
    "primary",
    "replicas",
    "password",
    "secret",
];

/// A loaded, validated configuration and where it came from
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: SqlKitConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigLoader {
    /// Load configuration with environment and directory auto-detection
    pub fn load() -> SqlKitResult<ConfigLoader> {
        Self::load_from_directory(None)
    }

    pub fn load_from_directory(config_dir: Option<PathBuf>) -> SqlKitResult<ConfigLoader> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load with an explicit environment instead of reading `SQLKIT_ENV`
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> SqlKitResult<ConfigLoader> {
        Self::load_layered(config_dir, environment, None)
    }

    /// Like [`Self::load_from_directory_with_env`], but environment overrides are
    /// read from `overrides` (e.g. `SQLKIT__CACHE__EXPIRE_SECONDS`) instead of the
    /// process environment.
    pub fn load_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: HashMap<String, String>,
    ) -> SqlKitResult<ConfigLoader> {
        Self::load_layered(config_dir, environment, Some(overrides))
    }

    fn load_layered(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> SqlKitResult<ConfigLoader> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let base = config_directory.join(CONFIG_BASENAME);
        let overlay = config_directory.join(format!("{CONFIG_BASENAME}-{environment}"));

        let config: SqlKitConfig = Config::builder()
            .add_source(File::from(base).required(false))
            .add_source(File::from(overlay).required(false))
            .add_source(
                Environment::with_prefix(env_vars::OVERRIDE_PREFIX)
                    .separator(env_vars::OVERRIDE_SEPARATOR)
                    .try_parsing(true)
                    .source(overrides),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );
        info!(
            environment = environment,
            connections = config.connection_strings.len(),
            master_slave = config.master_slave.len(),
            cache_enabled = config.cache.is_some(),
            "Configuration loaded successfully"
        );

        Ok(ConfigLoader {
            config,
            environment: environment.to_string(),
            config_directory,
        })
    }

    /// Parse and validate a configuration document held in memory
    pub fn from_str(content: &str, format: FileFormat) -> SqlKitResult<SqlKitConfig> {
        let config: SqlKitConfig = Config::builder()
            .add_source(File::from_str(content, format))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn config(&self) -> &SqlKitConfig {
        &self.config
    }

    pub fn into_config(self) -> SqlKitConfig {
        self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON with connection strings masked
    pub fn debug_config(&self) -> Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    /// `SQLKIT_ENV`, then `APP_ENV`, then `development`
    pub fn detect_environment() -> String {
        env::var(env_vars::SQLKIT_ENV)
            .or_else(|_| env::var(env_vars::APP_ENV))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        env::var(env_vars::SQLKIT_CONFIG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    fn sanitize_config_for_logging(config: &SqlKitConfig) -> Value {
        let mut config_json = serde_json::to_value(config).unwrap_or(Value::Null);
        Self::sanitize_json_recursive(&mut config_json, false);
        config_json
    }

    fn sanitize_json_recursive(value: &mut Value, masked: bool) {
        match value {
            Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = masked
                        || SENSITIVE_PATTERNS
                            .iter()
                            .any(|pattern| key_lower.contains(pattern));
                    Self::sanitize_json_recursive(val, is_sensitive);
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    Self::sanitize_json_recursive(item, masked);
                }
            }
            Value::String(s) if masked => {
                *value = Value::String(mask(s));
            }
            _ => {}
        }
    }
}

/// Keep the first and last two characters for debugging
fn mask(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        "[EMPTY]".to_string()
    } else if chars.len() > 4 {
        let head: String = chars[..2].iter().collect();
        let tail: String = chars[chars.len() - 2..].iter().collect();
        format!("[MASKED: {head}***{tail}]")
    } else {
        "[MASKED: ***]".to_string()
    }
}

impl From<ConfigLoader> for SqlKitConfig {
    fn from(loader: ConfigLoader) -> Self {
        loader.config
    }
}

impl TryFrom<&Path> for ConfigLoader {
    type Error = SqlKitError;

    fn try_from(dir: &Path) -> SqlKitResult<Self> {
        Self::load_from_directory(Some(dir.to_path_buf()))
    }
}
