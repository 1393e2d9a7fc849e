//! Structured health reporting for daemon lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use switchboard_config::Config;
use switchboard_plugins::{ActivationObserver, PluginError, PluginId};

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the listener accepts connections.
    fn listener_ready(&self, addr: SocketAddr);

    /// Invoked after a plugin has been activated.
    fn plugin_activated(&self, plugin: &PluginId);

    /// Invoked when a plugin could not be activated.
    fn plugin_failed(&self, plugin: &PluginId, error: &PluginError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_ready(&self, addr: SocketAddr) {
        (**self).listener_ready(addr);
    }

    fn plugin_activated(&self, plugin: &PluginId) {
        (**self).plugin_activated(plugin);
    }

    fn plugin_failed(&self, plugin: &PluginId, error: &PluginError) {
        (**self).plugin_failed(plugin, error);
    }
}

/// Forwards plugin activations to a [`HealthReporter`].
pub(crate) struct ActivationReporter {
    reporter: Arc<dyn HealthReporter>,
}

impl ActivationReporter {
    pub(crate) const fn new(reporter: Arc<dyn HealthReporter>) -> Self {
        Self { reporter }
    }
}

impl ActivationObserver for ActivationReporter {
    fn activated(&self, plugin: &PluginId) {
        self.reporter.plugin_activated(plugin);
    }

    fn activation_failed(&self, plugin: &PluginId, error: &PluginError) {
        self.reporter.plugin_failed(plugin, error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            listen = %config.listen(),
            service = config.service_name(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn listener_ready(&self, addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_ready",
            %addr,
            "accepting connections"
        );
    }

    fn plugin_activated(&self, plugin: &PluginId) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "plugin_activated",
            plugin = %plugin,
            "plugin activated"
        );
    }

    fn plugin_failed(&self, plugin: &PluginId, error: &PluginError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "plugin_failed",
            plugin = %plugin,
            error = %error,
            "plugin activation failed"
        );
    }
}
