// crates/ibn-config/src/config.rs
// ============================================================================
// Module: IBN Configuration
// Description: Configuration loading, environment overrides, and validation.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: ibn-core, ibn-providers, ibn-telnet, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits,
//! then platform settings are overridden from the environment
//! (`GNS3_SERVER_IP`, `GNS3_SERVER_PORT`, `GNS3_SERVER_USER`,
//! `GNS3_SERVER_PASSWORD`, `GNS3_PROJECT`), then the result is validated.
//!
//! When no path is given and `IBN_CONFIG` is unset, a missing `ibn.toml`
//! yields the defaults. An explicitly named file must exist.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use ibn_core::CaptureConfig;
use ibn_core::DEFAULT_PROMPT_PATTERNS;
use ibn_providers::Gns3Config;
use ibn_telnet::TelnetConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "ibn.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "IBN_CONFIG";
/// Environment variable overriding `platform.host`.
pub const ENV_SERVER_IP: &str = "GNS3_SERVER_IP";
/// Environment variable overriding `platform.port`.
pub const ENV_SERVER_PORT: &str = "GNS3_SERVER_PORT";
/// Environment variable overriding `platform.username`.
pub const ENV_SERVER_USER: &str = "GNS3_SERVER_USER";
/// Environment variable overriding `platform.password`.
pub const ENV_SERVER_PASSWORD: &str = "GNS3_SERVER_PASSWORD";
/// Environment variable overriding `platform.project`.
pub const ENV_PROJECT: &str = "GNS3_PROJECT";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for platform request timeouts.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 600_000;
/// Upper bound for platform response sizes.
pub(crate) const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;
/// Upper bound for session timeouts.
pub(crate) const MAX_SESSION_TIMEOUT_MS: u64 = 300_000;
/// Upper bound for per-command captured output.
pub(crate) const MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level `ibn.toml` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IbnConfig {
    /// Lab platform connection.
    #[serde(default)]
    pub platform: PlatformConfig,
    /// State file locations.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Console session tuning.
    #[serde(default)]
    pub session: SessionConfig,
}

impl IbnConfig {
    /// Loads configuration with overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| env::var(key).ok())
    }

    /// Loads configuration with overrides drawn from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (resolved, explicit) = resolve_path(path, &lookup)?;
        validate_path(&resolved)?;
        let mut config = match fs::read(&resolved) {
            Ok(bytes) => Self::parse(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound && !explicit => Self::default(),
            Err(err) => {
                return Err(ConfigError::Io(format!("{}: {err}", resolved.display())));
            }
        };
        config.platform.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration bytes without environment overrides or validation.
    fn parse(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.platform.validate()?;
        self.paths.validate()?;
        self.session.validate()?;
        Ok(())
    }

    /// Builds the console connector configuration.
    #[must_use]
    pub fn telnet_config(&self) -> TelnetConfig {
        TelnetConfig {
            platform_host: self.platform.host.clone(),
            connect_timeout: Duration::from_millis(self.session.connect_timeout_ms),
            capture: self.session.capture_config(),
            line_terminator: self.session.line_terminator.clone(),
            flush_prompt: self.session.flush_prompt,
        }
    }
}

// ============================================================================
// SECTION: Platform
// ============================================================================

/// Lab platform (GNS3 server) connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// Platform host; also substituted for wildcard console hosts.
    #[serde(default = "default_platform_host")]
    pub host: String,
    /// Platform REST port.
    #[serde(default = "default_platform_port")]
    pub port: u16,
    /// Optional basic-auth user.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional basic-auth password.
    #[serde(default)]
    pub password: Option<String>,
    /// Project name; required when inventory is captured from the platform.
    #[serde(default)]
    pub project: Option<String>,
    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum response body size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            host: default_platform_host(),
            port: default_platform_port(),
            username: None,
            password: None,
            project: None,
            request_timeout_ms: default_request_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl PlatformConfig {
    /// Applies environment overrides on top of file values.
    fn apply_env<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = non_empty(lookup(ENV_SERVER_IP)) {
            self.host = host;
        }
        if let Some(port) = non_empty(lookup(ENV_SERVER_PORT)) {
            self.port = port.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_SERVER_PORT} must be a port number"))
            })?;
        }
        if let Some(username) = non_empty(lookup(ENV_SERVER_USER)) {
            self.username = Some(username);
        }
        if let Some(password) = lookup(ENV_SERVER_PASSWORD) {
            self.password = Some(password);
        }
        if let Some(project) = non_empty(lookup(ENV_PROJECT)) {
            self.project = Some(project);
        }
        Ok(())
    }

    /// Validates platform settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("platform.host must be non-empty".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("platform.port must be non-zero".to_string()));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(ConfigError::Invalid(
                "platform.password requires platform.username".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 || self.request_timeout_ms > MAX_REQUEST_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "platform.request_timeout_ms must be between 1 and {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_RESPONSE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "platform.max_response_bytes must be between 1 and {MAX_RESPONSE_BYTES}"
            )));
        }
        Ok(())
    }

    /// Builds the platform provider configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no project is configured.
    pub fn gns3_config(&self) -> Result<Gns3Config, ConfigError> {
        let project = self
            .project
            .as_deref()
            .map(str::trim)
            .filter(|project| !project.is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "platform.project must be set (or {ENV_PROJECT}) to capture inventory"
                ))
            })?;
        Ok(Gns3Config {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            project: project.to_string(),
            timeout_ms: self.request_timeout_ms,
            max_response_bytes: self.max_response_bytes,
        })
    }
}

// ============================================================================
// SECTION: Paths
// ============================================================================

/// Locations of the persisted state files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Policy store file (YAML).
    #[serde(default = "default_policy_file")]
    pub policies: PathBuf,
    /// Inventory snapshot file (JSON).
    #[serde(default = "default_inventory_file")]
    pub inventory: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            policies: default_policy_file(),
            inventory: default_inventory_file(),
        }
    }
}

impl PathsConfig {
    /// Validates state file paths.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("paths.policies", &self.policies.to_string_lossy())?;
        validate_path_string("paths.inventory", &self.inventory.to_string_lossy())?;
        if self.policies == self.inventory {
            return Err(ConfigError::Invalid(
                "paths.policies and paths.inventory must differ".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Console session tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// TCP connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Quiet period that ends a capture, in milliseconds.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Terminal-prompt suffixes.
    #[serde(default = "default_prompt_patterns")]
    pub prompt_patterns: Vec<String>,
    /// Terminator appended to every command.
    #[serde(default = "default_line_terminator")]
    pub line_terminator: String,
    /// Maximum bytes captured per command.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Send an empty line on connect and discard the banner.
    #[serde(default = "default_flush_prompt")]
    pub flush_prompt: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            prompt_patterns: default_prompt_patterns(),
            line_terminator: default_line_terminator(),
            max_output_bytes: default_max_output_bytes(),
            flush_prompt: default_flush_prompt(),
        }
    }
}

impl SessionConfig {
    /// Validates session settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_ms == 0 || self.connect_timeout_ms > MAX_SESSION_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "session.connect_timeout_ms must be between 1 and {MAX_SESSION_TIMEOUT_MS}"
            )));
        }
        if self.idle_timeout_ms == 0 || self.idle_timeout_ms > MAX_SESSION_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "session.idle_timeout_ms must be between 1 and {MAX_SESSION_TIMEOUT_MS}"
            )));
        }
        if self.prompt_patterns.is_empty() {
            return Err(ConfigError::Invalid(
                "session.prompt_patterns must list at least one pattern".to_string(),
            ));
        }
        if self.prompt_patterns.iter().any(|pattern| pattern.is_empty()) {
            return Err(ConfigError::Invalid(
                "session.prompt_patterns entries must be non-empty".to_string(),
            ));
        }
        if self.line_terminator.is_empty() {
            return Err(ConfigError::Invalid(
                "session.line_terminator must be non-empty".to_string(),
            ));
        }
        if self.max_output_bytes == 0 || self.max_output_bytes > MAX_OUTPUT_BYTES {
            return Err(ConfigError::Invalid(format!(
                "session.max_output_bytes must be between 1 and {MAX_OUTPUT_BYTES}"
            )));
        }
        Ok(())
    }

    /// Builds the capture policy for console reads.
    #[must_use]
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
            prompt_patterns: self.prompt_patterns.clone(),
            max_output_bytes: self.max_output_bytes,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default platform host.
fn default_platform_host() -> String {
    "127.0.0.1".to_string()
}

/// Default platform REST port.
const fn default_platform_port() -> u16 {
    3080
}

/// Default platform request timeout.
const fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Default platform response size cap.
const fn default_max_response_bytes() -> usize {
    4 * 1024 * 1024
}

/// Default policy store file.
fn default_policy_file() -> PathBuf {
    PathBuf::from("ibn-policies.yaml")
}

/// Default inventory file.
fn default_inventory_file() -> PathBuf {
    PathBuf::from("ibn-inventory.json")
}

/// Default console connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    5_000
}

/// Default capture idle timeout.
const fn default_idle_timeout_ms() -> u64 {
    1_000
}

/// Default terminal-prompt patterns.
fn default_prompt_patterns() -> Vec<String> {
    DEFAULT_PROMPT_PATTERNS.iter().map(ToString::to_string).collect()
}

/// Default line terminator.
fn default_line_terminator() -> String {
    "\r\n".to_string()
}

/// Default per-command capture cap.
const fn default_max_output_bytes() -> usize {
    256 * 1024
}

/// Banner flushing is on unless disabled.
const fn default_flush_prompt() -> bool {
    true
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the CLI, the environment, or the default name.
///
/// The flag is true when the path was named explicitly and must exist.
fn resolve_path<F>(path: Option<&Path>, lookup: &F) -> Result<(PathBuf, bool), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Some(env_path) = non_empty(lookup(CONFIG_ENV_VAR)) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Drops empty or whitespace-only values.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::validate_path_string;

    #[test]
    fn validate_path_string_accepts_relative_path() {
        assert!(validate_path_string("paths.policies", "./state/policies.yaml").is_ok());
    }

    #[test]
    fn validate_path_string_rejects_whitespace_only() {
        let result = validate_path_string("paths.policies", "   ");
        assert!(result.is_err_and(|err| err.to_string().contains("must be non-empty")));
    }

    #[test]
    fn validate_path_string_rejects_long_component() {
        let long = "a".repeat(300);
        let result = validate_path_string("paths.inventory", &long);
        assert!(result.is_err_and(|err| err.to_string().contains("path component too long")));
    }
}
