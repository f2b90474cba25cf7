#![deny(unsafe_code)]

//! Configuration loading and validation for revstamp.
//!
//! Loads an optional TOML configuration file and validates it. Every field
//! has a default, so an empty (or missing) file yields a usable
//! [`AppConfig`].

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Upper bound for a single VCS query, in milliseconds.
pub const MAX_TIMEOUT_MS: u64 = 600_000;

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Revision resolver configuration.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// VCS binary discovery configuration.
    #[serde(default)]
    pub locator: LocatorConfig,

    /// Template defaults.
    #[serde(default)]
    pub template: TemplateConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the VCS binary is queried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Wall-clock bound for each VCS query in milliseconds. The child process
    /// is killed when it runs longer.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Discard the VCS binary's own error output.
    #[serde(default)]
    pub quiet: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            quiet: false,
        }
    }
}

fn default_timeout_ms() -> u64 {
    1000
}

/// Where to look for the VCS binary.
///
/// ## TOML Example
///
/// ```toml
/// [locator]
/// binary_name = "git"
/// use_path = true
/// fallback_roots = ["/usr/local", "/opt/homebrew"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// File name of the VCS executable, without the platform suffix.
    #[serde(default = "default_binary_name")]
    pub binary_name: String,

    /// Explicit path to the executable. Tried before anything else.
    #[serde(default)]
    pub binary: Option<String>,

    /// Whether to search the directories listed in `PATH`.
    #[serde(default = "default_use_path")]
    pub use_path: bool,

    /// Installation roots searched after `PATH`.
    #[serde(default = "default_fallback_roots")]
    pub fallback_roots: Vec<String>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            binary_name: default_binary_name(),
            binary: None,
            use_path: default_use_path(),
            fallback_roots: default_fallback_roots(),
        }
    }
}

fn default_binary_name() -> String {
    "git".to_string()
}

fn default_use_path() -> bool {
    true
}

#[cfg(windows)]
fn default_fallback_roots() -> Vec<String> {
    ["ProgramFiles", "ProgramFiles(x86)", "ProgramW6432"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .fold(Vec::new(), |mut roots, root| {
            if !roots.contains(&root) {
                roots.push(root);
            }
            roots
        })
}

#[cfg(not(windows))]
fn default_fallback_roots() -> Vec<String> {
    vec![
        "/usr/local".to_string(),
        "/opt/homebrew".to_string(),
        "/usr".to_string(),
    ]
}

/// Template defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Format printed by `--revision` when no `--format` is given.
    #[serde(default = "default_format")]
    pub default_format: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            default_format: default_format(),
        }
    }
}

fn default_format() -> String {
    "{!}{commit}".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when neither `RUST_LOG` nor `--debug` is set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolver.timeout_ms == 0 || self.resolver.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::Validation(format!(
                "resolver.timeout_ms must be in 1..={MAX_TIMEOUT_MS}, got {}",
                self.resolver.timeout_ms
            )));
        }

        let name = &self.locator.binary_name;
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "locator.binary_name must not be empty".to_string(),
            ));
        }
        if name.contains(['/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "locator.binary_name must be a bare file name, got {name:?}; use locator.binary for a full path"
            )));
        }
        if self.locator.binary.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Validation(
                "locator.binary must not be empty when set".to_string(),
            ));
        }

        if self.template.default_format.is_empty() {
            return Err(ConfigError::Validation(
                "template.default_format must not be empty".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}
