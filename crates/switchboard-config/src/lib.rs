//! Shared configuration for the switchboard daemon.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then an
//! optional configuration file, then `SWITCHBOARD_*` environment variables,
//! then command-line flags. The resolved [`Config`] drives the listener
//! address, telemetry, the self-description reported over RPC, and which
//! plugins the daemon is allowed to activate.

mod defaults;
mod listen;
mod logging;
mod plugins;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use crate::defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT, DEFAULT_SERVICE_NAME, default_listen_endpoint,
    default_log_directory, default_log_filter, default_log_filter_string, default_log_format,
    default_service_name,
};
pub use crate::listen::{ListenEndpoint, ListenParseError};
pub use crate::logging::{LogFormat, LogFormatParseError};
pub use crate::plugins::{
    PluginDirective, PluginDirectiveParseError, PluginState, deduplicate_directives,
};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SWITCHBOARD")]
pub struct Config {
    /// TCP endpoint the connection listener binds.
    #[serde(default = "default_listen_endpoint")]
    #[ortho_config(default = default_listen_endpoint())]
    pub listen: ListenEndpoint,
    /// `tracing` filter expression applied to the subscriber.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Name reported by `service.describe`.
    #[serde(default = "default_service_name")]
    #[ortho_config(default = default_service_name())]
    pub service_name: String,
    /// Stable service identifier reported by `service.describe`.
    #[serde(default)]
    pub service_id: Option<String>,
    /// One-line summary reported by `service.describe`.
    #[serde(default)]
    pub service_summary: Option<String>,
    /// Per-plugin enablement overrides.
    #[serde(default)]
    #[ortho_config(default = Vec::new())]
    pub plugins: Vec<PluginDirective>,
    /// Directory receiving logs written through the remote logging service.
    #[serde(default = "default_log_directory")]
    #[ortho_config(default = default_log_directory())]
    pub log_directory: Utf8PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            service_name: default_service_name(),
            service_id: None,
            service_summary: None,
            plugins: Vec::new(),
            log_directory: default_log_directory(),
        }
    }
}

impl Config {
    /// Endpoint the daemon listens on.
    #[must_use]
    pub const fn listen(&self) -> &ListenEndpoint {
        &self.listen
    }

    /// Filter expression for the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Selected log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Service name used in self-description.
    #[must_use]
    pub fn service_name(&self) -> &str {
        self.service_name.as_str()
    }

    /// Configured service identifier, when one was provided.
    #[must_use]
    pub fn service_id(&self) -> Option<&str> {
        self.service_id.as_deref()
    }

    /// Configured service summary, when one was provided.
    #[must_use]
    pub fn service_summary(&self) -> Option<&str> {
        self.service_summary.as_deref()
    }

    /// Plugin directives in the order they were supplied.
    #[must_use]
    pub fn plugins(&self) -> &[PluginDirective] {
        &self.plugins
    }

    /// Directory used by the remote logging service.
    #[must_use]
    pub fn log_directory(&self) -> &camino::Utf8Path {
        self.log_directory.as_path()
    }

    /// Returns the state requested for `plugin`, if any directive names it.
    ///
    /// Plugin identifiers compare case-insensitively and the last matching
    /// directive wins.
    #[must_use]
    pub fn plugin_state(&self, plugin: &str) -> Option<PluginState> {
        self.plugins
            .iter()
            .rev()
            .find(|directive| directive.matches(plugin))
            .map(|directive| directive.state)
    }
}
