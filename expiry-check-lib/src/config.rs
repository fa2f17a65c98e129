//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `EXPIRY_*`
//! environment variables, and layering them over the built-in defaults.
//! Precedence, lowest first: defaults, XDG file, home file, local file (or
//! an explicit path), environment, command line.

use crate::error::ExpiryCheckError;
use crate::types::{CheckConfig, ProviderConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Which WHOIS providers to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers: Option<ProvidersSection>,

    /// Engine defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Output formatting preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// `[providers]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProvidersSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<bool>,

    /// Command run by the custom provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_command: Option<String>,

    /// Image run by the docker provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_image: Option<String>,

    /// Time limit for the custom command, e.g. "20s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_timeout: Option<String>,
}

/// `[defaults]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Domains resolved in parallel within a package
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Network timeout, e.g. "30s" or "2m"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,

    /// Resolution attempts per domain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<usize>,
}

/// `[output]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    /// One of "table", "json" or "csv"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

const OUTPUT_FORMATS: [&str; 3] = ["table", "json", "csv"];

impl FileConfig {
    /// Layer this file's values over `providers` and `config`.
    pub fn apply(&self, providers: &mut ProviderConfig, config: &mut CheckConfig) {
        if let Some(section) = &self.providers {
            if let Some(native) = section.native {
                providers.native = native;
            }
            if let Some(docker) = section.docker {
                providers.docker = docker;
            }
            if let Some(custom) = section.custom {
                providers.custom = custom;
            }
            if let Some(command) = &section.custom_command {
                providers.custom_command = command.clone();
            }
            if let Some(image) = &section.docker_image {
                config.docker_image = image.clone();
            }
            if let Some(limit) = section.custom_timeout.as_deref().and_then(parse_timeout_string) {
                config.custom_timeout = Some(Duration::from_secs(limit));
            }
        }

        if let Some(defaults) = &self.defaults {
            if let Some(concurrency) = defaults.concurrency {
                *config = config.clone().with_concurrency(concurrency);
            }
            if let Some(limit) = defaults.timeout.as_deref().and_then(parse_timeout_string) {
                *config = config.clone().with_timeout(Duration::from_secs(limit));
            }
            if let Some(url) = &defaults.registry_url {
                *config = config.clone().with_registry_url(url.clone());
            }
            if let Some(attempts) = defaults.max_attempts {
                *config = config.clone().with_max_attempts(attempts);
            }
        }
    }

    /// Preferred output format, if the file names one.
    pub fn output_format(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.format.as_deref())
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Directory searched for a local config file
    local_dir: PathBuf,
    /// User home directory
    home_dir: Option<PathBuf>,
    /// XDG config directory
    xdg_dir: Option<PathBuf>,
}

impl ConfigManager {
    /// Create a manager that searches the current directory, `$HOME` and
    /// `$XDG_CONFIG_HOME` (or `~/.config`).
    pub fn new() -> Self {
        let home_dir = env::var_os("HOME").map(PathBuf::from);
        let xdg_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| home_dir.as_ref().map(|home| home.join(".config")));

        Self {
            local_dir: PathBuf::from("."),
            home_dir,
            xdg_dir,
        }
    }

    /// Create a manager that searches the given directories.
    pub fn with_dirs(local_dir: PathBuf, home_dir: Option<PathBuf>, xdg_dir: Option<PathBuf>) -> Self {
        Self {
            local_dir,
            home_dir,
            xdg_dir,
        }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `FileError` when the file is missing or unreadable and
    /// `ConfigError` when it is not valid TOML or holds invalid values.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ExpiryCheckError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ExpiryCheckError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ExpiryCheckError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            ExpiryCheckError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        validate_config(&config)?;
        tracing::debug!(path = %path.display(), "loaded configuration file");

        Ok(config)
    }

    /// Discover and merge configuration files in precedence order.
    ///
    /// Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> FileConfig {
        let candidates = [
            self.xdg_config_path(),
            self.global_config_path(),
            self.local_config_path(),
        ];

        let mut merged = FileConfig::default();
        let mut loaded = Vec::new();

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged = merge_configs(merged, config);
                    loaded.push(path);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring configuration file"),
            }
        }

        if loaded.len() > 1 {
            tracing::info!(files = ?loaded, "merged multiple configuration files, later ones win");
        }

        merged
    }

    fn local_config_path(&self) -> Option<PathBuf> {
        ["expiry-check.toml", ".expiry-check.toml"]
            .iter()
            .map(|name| self.local_dir.join(name))
            .find(|path| path.exists())
    }

    fn global_config_path(&self) -> Option<PathBuf> {
        let home = self.home_dir.as_ref()?;
        [".expiry-check.toml", "expiry-check.toml"]
            .iter()
            .map(|name| home.join(name))
            .find(|path| path.exists())
    }

    fn xdg_config_path(&self) -> Option<PathBuf> {
        let path = self.xdg_dir.as_ref()?.join("expiry-check").join("config.toml");
        path.exists().then_some(path)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge two configurations; values from `higher` win.
pub fn merge_configs(lower: FileConfig, higher: FileConfig) -> FileConfig {
    FileConfig {
        providers: match (lower.providers, higher.providers) {
            (Some(mut low), Some(high)) => {
                low.native = high.native.or(low.native);
                low.docker = high.docker.or(low.docker);
                low.custom = high.custom.or(low.custom);
                low.custom_command = high.custom_command.or(low.custom_command);
                low.docker_image = high.docker_image.or(low.docker_image);
                low.custom_timeout = high.custom_timeout.or(low.custom_timeout);
                Some(low)
            }
            (low, high) => high.or(low),
        },
        defaults: match (lower.defaults, higher.defaults) {
            (Some(mut low), Some(high)) => {
                low.concurrency = high.concurrency.or(low.concurrency);
                low.timeout = high.timeout.or(low.timeout);
                low.registry_url = high.registry_url.or(low.registry_url);
                low.max_attempts = high.max_attempts.or(low.max_attempts);
                Some(low)
            }
            (low, high) => high.or(low),
        },
        output: higher.output.or(lower.output),
    }
}

fn validate_config(config: &FileConfig) -> Result<(), ExpiryCheckError> {
    if let Some(defaults) = &config.defaults {
        if let Some(concurrency) = defaults.concurrency {
            if concurrency == 0 || concurrency > 32 {
                return Err(ExpiryCheckError::config(
                    "Concurrency must be between 1 and 32",
                ));
            }
        }

        if let Some(timeout) = &defaults.timeout {
            check_timeout(timeout)?;
        }

        if defaults.max_attempts == Some(0) {
            return Err(ExpiryCheckError::config("max_attempts must be at least 1"));
        }
    }

    if let Some(providers) = &config.providers {
        if let Some(timeout) = &providers.custom_timeout {
            check_timeout(timeout)?;
        }
        if providers.custom == Some(true)
            && providers
                .custom_command
                .as_deref()
                .is_some_and(|c| c.trim().is_empty())
        {
            return Err(ExpiryCheckError::config(
                "custom_command cannot be blank when the custom provider is enabled",
            ));
        }
    }

    if let Some(format) = config.output_format() {
        if !OUTPUT_FORMATS.contains(&format) {
            return Err(ExpiryCheckError::config(format!(
                "Unknown output format '{}'. Use one of: {}",
                format,
                OUTPUT_FORMATS.join(", ")
            )));
        }
    }

    Ok(())
}

fn check_timeout(timeout: &str) -> Result<(), ExpiryCheckError> {
    match parse_timeout_string(timeout) {
        Some(_) => Ok(()),
        None => Err(ExpiryCheckError::config(format!(
            "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
            timeout
        ))),
    }
}

/// Values taken from `EXPIRY_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub native: Option<bool>,
    pub docker: Option<bool>,
    pub custom_command: Option<String>,
    pub registry_url: Option<String>,
    pub timeout: Option<u64>,
}

impl EnvConfig {
    /// Layer these values over `providers` and `config`.
    ///
    /// Setting `EXPIRY_CUSTOM_COMMAND` also enables the custom provider.
    pub fn apply(&self, providers: &mut ProviderConfig, config: &mut CheckConfig) {
        if let Some(native) = self.native {
            providers.native = native;
        }
        if let Some(docker) = self.docker {
            providers.docker = docker;
        }
        if let Some(command) = &self.custom_command {
            *providers = providers.clone().with_custom(command.clone());
        }
        if let Some(concurrency) = self.concurrency {
            *config = config.clone().with_concurrency(concurrency);
        }
        if let Some(url) = &self.registry_url {
            *config = config.clone().with_registry_url(url.clone());
        }
        if let Some(seconds) = self.timeout {
            *config = config.clone().with_timeout(Duration::from_secs(seconds));
        }
    }
}

/// Load configuration from the process environment.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("EXPIRY_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if (1..=32).contains(&concurrency) => {
                tracing::info!(concurrency, "using EXPIRY_CONCURRENCY");
                env_config.concurrency = Some(concurrency);
            }
            _ => tracing::warn!(value = %val, "invalid EXPIRY_CONCURRENCY, must be 1-32"),
        }
    }

    env_config.native = lookup_bool(&lookup, "EXPIRY_NATIVE");
    env_config.docker = lookup_bool(&lookup, "EXPIRY_DOCKER");

    if let Some(command) = lookup("EXPIRY_CUSTOM_COMMAND") {
        if command.trim().is_empty() {
            tracing::warn!("ignoring blank EXPIRY_CUSTOM_COMMAND");
        } else {
            tracing::info!(command = %command, "using EXPIRY_CUSTOM_COMMAND");
            env_config.custom_command = Some(command.trim().to_string());
        }
    }

    if let Some(url) = lookup("EXPIRY_REGISTRY_URL") {
        if url.starts_with("http://") || url.starts_with("https://") {
            tracing::info!(url = %url, "using EXPIRY_REGISTRY_URL");
            env_config.registry_url = Some(url);
        } else {
            tracing::warn!(value = %url, "invalid EXPIRY_REGISTRY_URL, must be an http(s) URL");
        }
    }

    if let Some(timeout) = lookup("EXPIRY_TIMEOUT") {
        match parse_timeout_string(&timeout) {
            Some(seconds) => {
                tracing::info!(seconds, "using EXPIRY_TIMEOUT");
                env_config.timeout = Some(seconds);
            }
            None => tracing::warn!(
                value = %timeout,
                "invalid EXPIRY_TIMEOUT, use format like '5s', '30s', '2m'"
            ),
        }
    }

    env_config
}

fn lookup_bool<F>(lookup: &F, key: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let val = lookup(key)?;
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %val, "invalid boolean, use true/false");
            None
        }
    }
}

/// Parse a timeout such as `"30s"`, `"2m"` or `"45"` into seconds.
///
/// Zero and values that overflow `u64` seconds are rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let seconds = if let Some(seconds) = timeout_str.strip_suffix('s') {
        seconds.parse::<u64>().ok()
    } else if let Some(minutes) = timeout_str.strip_suffix('m') {
        minutes.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        timeout_str.parse::<u64>().ok()
    };

    seconds.filter(|&s| s > 0)
}
