//! Process-wide map from extension interfaces to plugin providers.
//!
//! Providers are defined once at start-up with [`ExtensionRegistry::define`]
//! and declare the interfaces they implement. The populated registry is then
//! frozen behind an `Arc` and shared by every [`PluginManager`].

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::{PluginError, RegistryError};
use crate::manager::PluginManager;
use crate::plugin::{Interface, InterfaceId, Plugin, PluginId};

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

static GLOBAL_REGISTRY: OnceCell<Arc<ExtensionRegistry>> = OnceCell::new();

/// An activated plugin viewed both as `Any` and as [`Plugin`].
#[derive(Clone)]
pub(crate) struct Instance {
    pub(crate) any: Arc<dyn Any + Send + Sync>,
    pub(crate) plugin: Arc<dyn Plugin>,
}

type Factory = Box<dyn Fn(&PluginManager) -> Result<Instance, PluginError> + Send + Sync>;
type Caster<I> =
    Box<dyn Fn(Arc<dyn Any + Send + Sync>) -> Option<Arc<<I as Interface>::Object>> + Send + Sync>;

struct Provider {
    factory: Factory,
    casters: HashMap<InterfaceId, Box<dyn Any + Send + Sync>>,
}

/// Registry of plugin providers and the interfaces they implement.
#[derive(Default)]
pub struct ExtensionRegistry {
    providers: BTreeMap<PluginId, Provider>,
    interfaces: BTreeMap<InterfaceId, Vec<PluginId>>,
}

impl ExtensionRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a provider built by `factory`.
    ///
    /// The returned builder declares which interfaces the provider
    /// implements.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePlugin`] when `id` is already taken.
    pub fn define<P, F>(
        &mut self,
        id: impl Into<PluginId>,
        factory: F,
    ) -> Result<ProviderBuilder<'_, P>, RegistryError>
    where
        P: Plugin,
        F: Fn(&PluginManager) -> Result<P, PluginError> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.providers.contains_key(&id) {
            return Err(RegistryError::DuplicatePlugin { plugin: id });
        }
        let factory: Factory = Box::new(move |manager| {
            let concrete = Arc::new(factory(manager)?);
            Ok(Instance {
                any: Arc::clone(&concrete) as Arc<dyn Any + Send + Sync>,
                plugin: concrete as Arc<dyn Plugin>,
            })
        });
        debug!(target: REGISTRY_TARGET, plugin = %id, "plugin defined");
        self.providers.insert(
            id.clone(),
            Provider {
                factory,
                casters: HashMap::new(),
            },
        );
        Ok(ProviderBuilder {
            registry: self,
            id,
            _plugin: PhantomData,
        })
    }

    /// Returns `true` when a provider is defined under `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    /// Every defined provider, in identifier order.
    pub fn plugins(&self) -> impl Iterator<Item = &PluginId> {
        self.providers.keys()
    }

    /// Providers of `interface`, in definition order.
    #[must_use]
    pub fn providers_of(&self, interface: InterfaceId) -> &[PluginId] {
        self.interfaces
            .get(&interface)
            .map_or(&[], Vec::as_slice)
    }

    /// Freezes the registry as the process-wide instance.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyInstalled`] when called twice.
    pub fn install(self) -> Result<Arc<Self>, RegistryError> {
        let shared = Arc::new(self);
        GLOBAL_REGISTRY
            .set(Arc::clone(&shared))
            .map_err(|_| RegistryError::AlreadyInstalled)?;
        Ok(shared)
    }

    /// The process-wide registry, once installed.
    #[must_use]
    pub fn global() -> Option<Arc<Self>> {
        GLOBAL_REGISTRY.get().cloned()
    }

    pub(crate) fn construct(
        &self,
        id: &PluginId,
        manager: &PluginManager,
    ) -> Result<Instance, PluginError> {
        let provider = self
            .providers
            .get(id)
            .ok_or_else(|| PluginError::NotRegistered { plugin: id.clone() })?;
        (provider.factory)(manager).map_err(|source| PluginError::Construction {
            plugin: id.clone(),
            source: Box::new(source),
        })
    }

    pub(crate) fn cast<I: Interface>(
        &self,
        id: &PluginId,
        instance: Arc<dyn Any + Send + Sync>,
    ) -> Option<Arc<I::Object>> {
        let caster = self
            .providers
            .get(id)?
            .casters
            .get(&I::ID)?
            .downcast_ref::<Caster<I>>()?;
        caster(instance)
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ExtensionRegistry")
            .field("plugins", &self.providers.keys().collect::<Vec<_>>())
            .field("interfaces", &self.interfaces)
            .finish()
    }
}

/// Declares the interfaces a freshly defined provider implements.
pub struct ProviderBuilder<'a, P> {
    registry: &'a mut ExtensionRegistry,
    id: PluginId,
    _plugin: PhantomData<fn() -> P>,
}

impl<P: Plugin> ProviderBuilder<'_, P> {
    /// Records that the provider implements `I`, viewing instances through
    /// `cast`.
    pub fn implements<I, C>(self, cast: C) -> Self
    where
        I: Interface,
        C: Fn(Arc<P>) -> Arc<I::Object> + Send + Sync + 'static,
    {
        let caster: Caster<I> = Box::new(move |instance: Arc<dyn Any + Send + Sync>| {
            instance.downcast::<P>().ok().map(&cast)
        });
        if let Some(provider) = self.registry.providers.get_mut(&self.id) {
            provider.casters.insert(I::ID, Box::new(caster));
        }
        let providers = self.registry.interfaces.entry(I::ID).or_default();
        if !providers.contains(&self.id) {
            providers.push(self.id.clone());
        }
        debug!(
            target: REGISTRY_TARGET,
            plugin = %self.id,
            interface = %I::ID,
            "interface implemented"
        );
        self
    }

    /// Identifier of the provider being declared.
    #[must_use]
    pub const fn id(&self) -> &PluginId {
        &self.id
    }
}

#[cfg(test)]
mod tests;
