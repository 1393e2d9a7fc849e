//! Extension points and lazy plugin activation.
//!
//! Providers are defined once at process start in an [`ExtensionRegistry`],
//! each declaring the [`Interface`]s it implements. A [`PluginManager`]
//! activates providers on demand, at most once each, subject to an
//! [`EnablementPolicy`]. An [`ExtensionPoint`] yields the enabled providers
//! of one interface, freshly on every read.
//!
//! ```ignore
//! struct Greeter;
//! impl Plugin for Greeter {}
//!
//! let mut registry = ExtensionRegistry::new();
//! registry
//!     .define("acme.greeter", |_| Ok(Greeter))?
//!     .implements::<GreetingService, _>(|greeter| greeter);
//! let manager = PluginManager::new(Arc::new(registry), Arc::new(AlwaysEnabled));
//! let greeters = ExtensionPoint::<GreetingService>::new().extensions(&manager);
//! ```

mod error;
mod extension;
mod manager;
mod plugin;
mod registry;

pub use error::{PluginError, RegistryError};
pub use extension::ExtensionPoint;
pub use manager::{ActivationObserver, AlwaysEnabled, EnablementPolicy, PluginManager};
pub use plugin::{Interface, InterfaceId, Plugin, PluginId};
pub use registry::{ExtensionRegistry, ProviderBuilder};

#[cfg(test)]
mod tests;
