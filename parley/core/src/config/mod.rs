//! TOML Configuration File Support
//!
//! Client configuration is read from `~/.config/parley/client.toml`.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/parley/client.toml` (typically `~/.config/parley/client.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [client]
//! endpoint = "http://localhost:3001/api/chat"
//! connect_timeout_ms = 5000
//! title_max_chars = 30
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `PARLEY_ENDPOINT` | `endpoint` |
//! | `PARLEY_CONNECT_TIMEOUT` | `connect_timeout_ms` |
//! | `PARLEY_TITLE_MAX_CHARS` | `title_max_chars` |

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::DEFAULT_TITLE_MAX_CHARS;

/// Endpoint used when nothing else is configured
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3001/api/chat";

/// Connection timeout used when nothing else is configured
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Client section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSectionToml {
    /// Chat endpoint URL
    pub endpoint: Option<String>,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Title truncation bound in characters
    pub title_max_chars: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Client configuration section
    pub client: ClientSectionToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved client configuration
///
/// Use [`load_config`] to load it with proper priority handling, then
/// [`ClientConfig::validate`] before handing it to a backend.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Chat endpoint URL
    pub endpoint: String,

    /// Bound on establishing the connection
    pub connect_timeout: Duration,

    /// Title truncation bound in characters
    pub title_max_chars: usize,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check that the resolved values are usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the endpoint is not an
    /// http(s) URL or the title bound is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "endpoint must be an http:// or https:// URL, got {:?}",
                self.endpoint
            )));
        }
        if self.title_max_chars == 0 {
            return Err(ConfigError::ValidationError(
                "title_max_chars must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/parley/client.toml` or
/// `~/.config/parley/client.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("parley").join("client.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with a custom environment lookup
///
/// Same as [`load_config_from_path`], but environment variables are read
/// through `env` instead of the process environment.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ClientConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ClientToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ClientConfig, toml: &ClientToml) {
    if let Some(ref endpoint) = toml.client.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(timeout) = toml.client.connect_timeout_ms {
        config.connect_timeout = Duration::from_millis(timeout);
    }
    if let Some(max_chars) = toml.client.title_max_chars {
        config.title_max_chars = max_chars;
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut ClientConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(endpoint) = env("PARLEY_ENDPOINT") {
        config.endpoint = endpoint;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = env("PARLEY_CONNECT_TIMEOUT") {
        match timeout.parse::<u64>() {
            Ok(ms) => {
                config.connect_timeout = Duration::from_millis(ms);
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %timeout, "Ignoring invalid PARLEY_CONNECT_TIMEOUT"),
        }
    }
    if let Some(max_chars) = env("PARLEY_TITLE_MAX_CHARS") {
        match max_chars.parse::<usize>() {
            Ok(n) => {
                config.title_max_chars = n;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %max_chars, "Ignoring invalid PARLEY_TITLE_MAX_CHARS"),
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Endpoint override
    pub endpoint: Option<String>,

    /// Connect timeout override (milliseconds)
    pub connect_timeout_ms: Option<u64>,

    /// Title bound override
    pub title_max_chars: Option<usize>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set endpoint override
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set connect timeout override
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }

    /// Set title bound override
    #[must_use]
    pub fn with_title_max_chars(mut self, max_chars: usize) -> Self {
        self.title_max_chars = Some(max_chars);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ClientConfig) {
        if self.endpoint.is_some()
            || self.connect_timeout_ms.is_some()
            || self.title_max_chars.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref endpoint) = self.endpoint {
            config.endpoint = endpoint.clone();
        }

        if let Some(timeout) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(timeout);
        }

        if let Some(max_chars) = self.title_max_chars {
            config.title_max_chars = max_chars;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    // =========================================================================
    // Default Configuration Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();

        assert_eq!(config.endpoint, "http://localhost:3001/api/chat");
        assert_eq!(config.connect_timeout, Duration::from_millis(5000));
        assert_eq!(config.title_max_chars, 30);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("parley/client.toml"));
        }
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI");
        assert_eq!(ConfigSource::Env.to_string(), "environment");
        assert_eq!(ConfigSource::File.to_string(), "config file");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }

    // =========================================================================
    // File Loading Tests
    // =========================================================================

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            load_config_with_env(Some(PathBuf::from("/nonexistent/parley.toml")), no_env).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            r#"
[client]
endpoint = "https://chat.example.com/api/chat"
connect_timeout_ms = 1500
title_max_chars = 12
"#,
        );

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.endpoint, "https://chat.example.com/api/chat");
        assert_eq!(config.connect_timeout, Duration::from_millis(1500));
        assert_eq!(config.title_max_chars, 12);
        assert_eq!(config.source(), ConfigSource::File);
        assert_eq!(config.config_file_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let file = write_config("[client]\ntitle_max_chars = 10\n");

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.title_max_chars, 10);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_empty_file_is_valid() {
        let file = write_config("");
        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.source(), ConfigSource::File);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let file = write_config("[client\nendpoint = ");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    // =========================================================================
    // Priority Tests
    // =========================================================================

    #[test]
    fn test_env_overrides_file() {
        let file = write_config("[client]\nendpoint = \"http://file:1/api/chat\"\n");
        let env = env_from(&[
            ("PARLEY_ENDPOINT", "http://env:2/api/chat"),
            ("PARLEY_CONNECT_TIMEOUT", "250"),
        ]);

        let config = load_config_with_env(Some(file.path().to_path_buf()), env).unwrap();
        assert_eq!(config.endpoint, "http://env:2/api/chat");
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_unparseable_env_value_is_ignored() {
        let env = env_from(&[("PARLEY_TITLE_MAX_CHARS", "lots")]);
        let config = load_config_with_env(None, env).unwrap();
        assert_eq!(config.title_max_chars, DEFAULT_TITLE_MAX_CHARS);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_cli_overrides_env() {
        let env = env_from(&[("PARLEY_ENDPOINT", "http://env:2/api/chat")]);
        let mut config = load_config_with_env(None, env).unwrap();

        ConfigOverrides::new()
            .with_endpoint("http://cli:3/api/chat")
            .with_title_max_chars(5)
            .apply(&mut config);

        assert_eq!(config.endpoint, "http://cli:3/api/chat");
        assert_eq!(config.title_max_chars, 5);
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_keep_source() {
        let mut config = ClientConfig::default();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    // =========================================================================
    // Validation Tests
    // =========================================================================

    #[test]
    fn test_validate_rejects_non_http_endpoint() {
        let config = ClientConfig {
            endpoint: "ftp://example.com/chat".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_title_bound() {
        let config = ClientConfig {
            title_max_chars: 0,
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
