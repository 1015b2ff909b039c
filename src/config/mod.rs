//! Configuration management for the gpg driver.
//!
//! Configuration is a plain value handed to the driver at construction time.
//! It carries the path to the gpg binary and an initialized flag gating
//! invocations; both can be set through a validated directive interface so a
//! host application can expose them as string key/value pairs.
//!
//! # Environment Variables
//!
//! - `GPGBRIDGE_GPG`: Path to the gpg binary (supports `~` and `$VAR`
//!   expansion; defaults to the platform's conventional install location)

use crate::errors::ConfigError;
use std::env;
use std::path::{Path, PathBuf};

/// Directive name for the gpg binary path (string-valued).
pub const DIRECTIVE_BINARY_PATH: &str = "gpg_binary_path";

/// Directive name for the initialized gate (boolean-valued).
pub const DIRECTIVE_INITIALIZED: &str = "gpg_initialized";

#[cfg(windows)]
const DEFAULT_BINARY_PATH: &str = "C:\\Program Files\\GNU\\GnuPG\\gpg.exe";
#[cfg(target_os = "macos")]
const DEFAULT_BINARY_PATH: &str = "/opt/local/bin/gpg";
#[cfg(not(any(windows, target_os = "macos")))]
const DEFAULT_BINARY_PATH: &str = "/usr/bin/gpg";

/// Configuration for the gpg driver.
///
/// Values are validated when they are set, not at every read: the allow-list
/// of directive names lives in [`GpgConfig::set_directive`], and boolean
/// directives only accept the literal strings `"true"` and `"false"`.
///
/// # Examples
///
/// ```
/// use gpgbridge::config::{GpgConfig, DIRECTIVE_BINARY_PATH, DIRECTIVE_INITIALIZED};
///
/// let mut config = GpgConfig::default();
/// config.set_directive(DIRECTIVE_BINARY_PATH, "/usr/local/bin/gpg").unwrap();
/// config.set_directive(DIRECTIVE_INITIALIZED, "true").unwrap();
/// assert!(config.initialized());
///
/// // Unknown directives are rejected.
/// assert!(config.set_directive("gpg_color_scheme", "dark").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct GpgConfig {
    binary_path: PathBuf,
    initialized: bool,
}

impl Default for GpgConfig {
    fn default() -> Self {
        GpgConfig {
            binary_path: PathBuf::from(DEFAULT_BINARY_PATH),
            initialized: false,
        }
    }
}

impl GpgConfig {
    /// Loads configuration from the environment with platform defaults.
    ///
    /// Reads `GPGBRIDGE_GPG` for the binary path, expanding `~` and
    /// environment variable references.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if path expansion fails or the
    /// resulting path is empty.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = GpgConfig::default();

        if let Ok(raw) = env::var("GPGBRIDGE_GPG") {
            let expanded = shellexpand::full(&raw)
                .map_err(|e| ConfigError::Invalid(format!("failed to expand path: {}", e)))?;
            config.binary_path = PathBuf::from(expanded.into_owned());
        }

        config.validate()?;
        Ok(config)
    }

    /// The path to the gpg binary.
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Whether the host has finished configuring the driver. Batch
    /// invocations refuse to run until this is set.
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// Sets a configuration directive by name.
    ///
    /// The directive name is checked against a fixed allow-list; the value
    /// is checked against the directive's type. String values are stored
    /// exactly as given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownDirective`] for a name outside the
    /// allow-list, and [`ConfigError::InvalidBoolean`] when a boolean
    /// directive is given anything but `"true"` or `"false"`.
    pub fn set_directive(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            DIRECTIVE_BINARY_PATH => {
                if value.is_empty() {
                    return Err(ConfigError::Invalid(
                        "gpg binary path cannot be empty".to_string(),
                    ));
                }
                self.binary_path = PathBuf::from(value);
                Ok(())
            }
            DIRECTIVE_INITIALIZED => {
                self.initialized = parse_bool_literal(key, value)?;
                Ok(())
            }
            _ => Err(ConfigError::UnknownDirective {
                key: key.to_string(),
            }),
        }
    }

    /// Validates that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the binary path is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.binary_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "gpg binary path is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Boolean directives accept exactly the literal strings "true" and "false".
fn parse_bool_literal(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
