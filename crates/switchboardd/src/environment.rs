//! Host environment for the plugin framework.

use std::sync::Arc;

use switchboard_config::Config;
use switchboard_plugins::{EnablementPolicy, ExtensionRegistry, PluginId, PluginManager};
use tracing::debug;

use crate::health::{ActivationReporter, HealthReporter};

/// Identifier prefix of plugins shipped with the daemon.
pub const BUILTIN_PLUGIN_PREFIX: &str = "switchboard.";

const ENVIRONMENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::plugins");

/// Enables plugins according to the configured directives.
///
/// An explicit directive for a plugin wins. Without one, plugins in the
/// built-in namespace are enabled and all others stay disabled.
#[derive(Debug, Clone)]
pub struct ConfigEnablementPolicy {
    config: Arc<Config>,
}

impl ConfigEnablementPolicy {
    /// Policy driven by `config`.
    #[must_use]
    pub const fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl EnablementPolicy for ConfigEnablementPolicy {
    fn is_enabled(&self, plugin: &PluginId) -> bool {
        let enabled = self.config.plugin_state(plugin.as_str()).map_or_else(
            || plugin.as_str().starts_with(BUILTIN_PLUGIN_PREFIX),
            |state| state.is_enabled(),
        );
        debug!(target: ENVIRONMENT_TARGET, plugin = %plugin, enabled, "plugin enablement decided");
        enabled
    }
}

/// Configuration plus the plugin manager built from it.
///
/// Plugins reach the configuration through
/// [`PluginManager::context`] with `Config` as the type.
#[derive(Debug)]
pub struct Environment {
    config: Arc<Config>,
    manager: Arc<PluginManager>,
}

impl Environment {
    /// Builds the environment for `config` over `registry`, reporting
    /// activations to `reporter`.
    #[must_use]
    pub fn new(
        config: Config,
        registry: Arc<ExtensionRegistry>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        let config = Arc::new(config);
        let policy = Arc::new(ConfigEnablementPolicy::new(Arc::clone(&config)));
        let manager = PluginManager::new(registry, policy)
            .with_context(Arc::clone(&config))
            .with_observer(Arc::new(ActivationReporter::new(reporter)));
        Self {
            config,
            manager: Arc::new(manager),
        }
    }

    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Plugin manager shared with request handling.
    #[must_use]
    pub fn manager(&self) -> Arc<PluginManager> {
        Arc::clone(&self.manager)
    }
}
