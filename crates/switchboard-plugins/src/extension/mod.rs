//! Typed, live views over the providers of one interface.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::warn;

use crate::error::PluginError;
use crate::manager::PluginManager;
use crate::plugin::Interface;

const EXTENSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::plugins");

/// Extension point for the interface `I`.
///
/// Every read asks the manager for each registered provider in definition
/// order, so enablement changes between reads are visible.
pub struct ExtensionPoint<I: Interface> {
    _interface: PhantomData<fn() -> I>,
}

impl<I: Interface> ExtensionPoint<I> {
    /// Extension point for `I`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _interface: PhantomData,
        }
    }

    /// Enabled providers of `I`.
    ///
    /// Providers that fail to activate are logged and skipped.
    #[must_use]
    pub fn extensions(&self, manager: &PluginManager) -> Vec<Arc<I::Object>> {
        let registry = Arc::clone(manager.registry());
        registry
            .providers_of(I::ID)
            .iter()
            .filter_map(|plugin| match manager.resolve_interface::<I>(plugin) {
                Ok(extension) => extension,
                Err(error) => {
                    warn!(
                        target: EXTENSION_TARGET,
                        interface = %I::ID,
                        plugin = %plugin,
                        %error,
                        "skipping extension that failed to activate"
                    );
                    None
                }
            })
            .collect()
    }

    /// Enabled providers of `I`, stopping at the first activation failure.
    ///
    /// # Errors
    ///
    /// Returns the [`PluginError`] of the first provider that fails to
    /// activate.
    pub fn try_extensions(
        &self,
        manager: &PluginManager,
    ) -> Result<Vec<Arc<I::Object>>, PluginError> {
        let registry = Arc::clone(manager.registry());
        let mut extensions = Vec::new();
        for plugin in registry.providers_of(I::ID) {
            if let Some(extension) = manager.resolve_interface::<I>(plugin)? {
                extensions.push(extension);
            }
        }
        Ok(extensions)
    }
}

impl<I: Interface> Default for ExtensionPoint<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Interface> Clone for ExtensionPoint<I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I: Interface> Copy for ExtensionPoint<I> {}

impl<I: Interface> fmt::Debug for ExtensionPoint<I> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ExtensionPoint")
            .field("interface", &I::ID)
            .finish()
    }
}
