#![forbid(unsafe_code)]

//! Tunable engine parameters.
//!
//! [`GadgetsConfig`] groups the render throttle window, URI and command
//! naming, the resize-handle tag and telemetry settings. With the `config`
//! feature it can be loaded from TOML or JSON:
//!
//! ```toml
//! render_throttle_ms = 100
//! uri_prefix = "atom://gadgets/"
//!
//! [telemetry]
//! enabled = false
//! ```
//!
//! ```rust,ignore
//! let config = GadgetsConfig::from_toml_file("gadgets.toml")?;
//! ```
//!
//! Every field has a default, so partial files only override what they name.

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::state::GadgetId;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct GadgetsConfig {
    /// Render coalescing window in milliseconds.
    pub render_throttle_ms: u64,

    /// Scheme and path prefix of gadget URIs; the gadget id follows it.
    pub uri_prefix: String,

    /// Command target selector for per-gadget commands.
    pub command_target: String,

    /// Per-gadget command name prefix; the gadget id follows it.
    pub command_prefix: String,

    /// Tag name of the host's pane resize handle element.
    pub resize_handle_tag: String,

    pub telemetry: TelemetryConfig,
}

impl Default for GadgetsConfig {
    fn default() -> Self {
        Self {
            render_throttle_ms: 100,
            uri_prefix: "atom://gadgets/".to_string(),
            command_target: "atom-workspace".to_string(),
            command_prefix: "gadgets:show-".to_string(),
            resize_handle_tag: "atom-pane-resize-handle".to_string(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Action telemetry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct TelemetryConfig {
    /// Forward action kinds to the analytics sink. Counters run regardless.
    pub enabled: bool,

    /// Event name reported to the analytics sink.
    pub event_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            event_name: "gadgets-action".to_string(),
        }
    }
}

impl GadgetsConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Check every parameter. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.render_throttle_ms == 0 {
            errors.push("render_throttle_ms must be > 0".to_string());
        }
        if self.uri_prefix.is_empty() {
            errors.push("uri_prefix must not be empty".to_string());
        } else if !self.uri_prefix.contains("://") {
            errors.push(format!(
                "uri_prefix must include a scheme, got {:?}",
                self.uri_prefix
            ));
        }
        if self.command_target.trim().is_empty() {
            errors.push("command_target must not be empty".to_string());
        }
        if self.command_prefix.is_empty() || self.command_prefix.contains(char::is_whitespace) {
            errors.push(format!(
                "command_prefix must be non-empty without whitespace, got {:?}",
                self.command_prefix
            ));
        }
        if self.resize_handle_tag.trim().is_empty() {
            errors.push("resize_handle_tag must not be empty".to_string());
        }
        if self.telemetry.enabled && self.telemetry.event_name.trim().is_empty() {
            errors.push("telemetry.event_name must not be empty when telemetry is enabled".to_string());
        }

        errors
    }

    #[must_use]
    pub fn render_throttle(&self) -> Duration {
        Duration::from_millis(self.render_throttle_ms)
    }

    /// URI that opens `gadget`.
    #[must_use]
    pub fn gadget_uri(&self, gadget: &GadgetId) -> String {
        format!("{}{}", self.uri_prefix, gadget)
    }

    /// Parse a gadget id out of `uri`. `None` for foreign or malformed URIs.
    #[must_use]
    pub fn parse_gadget_uri(&self, uri: &str) -> Option<GadgetId> {
        let rest = uri.strip_prefix(self.uri_prefix.as_str())?;
        GadgetId::new(rest.trim_end_matches('/')).ok()
    }

    /// Host command name bound to `gadget`.
    #[must_use]
    pub fn command_name(&self, gadget: &GadgetId) -> String {
        format!("{}{}", self.command_prefix, gadget)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a configuration.
#[cfg(feature = "config")]
#[derive(Debug)]
pub enum ConfigError {
    /// File read failed.
    Io(std::io::Error),
    /// TOML parse failed.
    Toml(toml::de::Error),
    /// JSON parse failed.
    Json(serde_json::Error),
}

#[cfg(feature = "config")]
impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Toml(e) => write!(f, "config TOML parse error: {e}"),
            Self::Json(e) => write!(f, "config JSON parse error: {e}"),
        }
    }
}

#[cfg(feature = "config")]
impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
        }
    }
}
