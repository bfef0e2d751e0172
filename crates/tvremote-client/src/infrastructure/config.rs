//! TOML configuration for the remote-control client.
//!
//! The embedding application owns storage; this module only parses and
//! renders the text and checks the values.  Every field has a default, so an
//! empty document is a valid configuration:
//!
//! ```toml
//! [discovery]
//! service_type = "_androidtvremote._tcp.local."
//! window_ms = 5000
//!
//! [session]
//! min_pin_length = 4
//!
//! [logging]
//! level = "info"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent, and whole sections marked
//! `#[serde(default)]` fall back to their `Default` impl.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tvremote_core::{ANDROID_TV_REMOTE_SERVICE, DEFAULT_MIN_PIN_LENGTH};

use crate::application::discover_devices::{DiscoveryOptions, DEFAULT_DISCOVERY_WINDOW};

/// Error type for configuration parsing and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but is out of range.
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scan settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// DNS-SD service type to browse; must end in `.local.`.
    #[serde(default = "default_service_type")]
    pub service_type: String,
    /// Length of one scan in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

/// Pairing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// Shortest PIN (after trimming) the bridge will submit.
    #[serde(default = "default_min_pin_length")]
    pub min_pin_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `"info"` or `"tvremote_client=debug"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_service_type() -> String {
    ANDROID_TV_REMOTE_SERVICE.to_string()
}
fn default_window_ms() -> u64 {
    DEFAULT_DISCOVERY_WINDOW.as_millis() as u64
}
fn default_min_pin_length() -> usize {
    DEFAULT_MIN_PIN_LENGTH
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: default_service_type(),
            window_ms: default_window_ms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_pin_length: default_min_pin_length(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ── Parsing and rendering ─────────────────────────────────────────────────────

impl RemoteConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RemoteConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.window_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "discovery.window_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if !self.discovery.service_type.ends_with(".local.") {
            return Err(ConfigError::Invalid {
                field: "discovery.service_type",
                reason: format!("{:?} does not end in \".local.\"", self.discovery.service_type),
            });
        }
        if self.session.min_pin_length == 0 {
            return Err(ConfigError::Invalid {
                field: "session.min_pin_length",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl DiscoveryConfig {
    /// Options for [`DiscoveryService`](crate::application::discover_devices::DiscoveryService).
    pub fn to_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            service_type: self.service_type.clone(),
            window: Duration::from_millis(self.window_ms),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
