//! Lazy, at-most-once plugin activation scoped to one manager.
//!
//! A [`PluginManager`] decides once per plugin whether it is enabled and
//! activates each enabled plugin at most once. Activation runs the factory
//! and the plugin initialiser outside the state lock; other threads asking
//! for the same plugin wait on a condition variable until the activating
//! thread publishes the instance or gives up. A wait that would close a
//! cycle between activating threads fails with
//! [`PluginError::CyclicConstruction`] instead of blocking, and a factory or
//! initialiser that panics fails like one that returned an error.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tracing::{debug, warn};

use crate::error::PluginError;
use crate::plugin::{Interface, Plugin, PluginId};
use crate::registry::{ExtensionRegistry, Instance};

const PLUGINS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::plugins");

/// Decides whether a plugin may be activated.
pub trait EnablementPolicy: Send + Sync {
    /// Returns `true` when `plugin` may be activated.
    ///
    /// Called at most once per plugin per manager, with the manager's state
    /// lock held.
    fn is_enabled(&self, plugin: &PluginId) -> bool;
}

/// Policy that enables every plugin.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysEnabled;

impl EnablementPolicy for AlwaysEnabled {
    fn is_enabled(&self, _plugin: &PluginId) -> bool {
        true
    }
}

/// Observes plugin activations.
pub trait ActivationObserver: Send + Sync {
    /// Called once after `plugin` has been constructed and initialised.
    fn activated(&self, plugin: &PluginId);

    /// Called when constructing or initialising `plugin` failed.
    fn activation_failed(&self, plugin: &PluginId, error: &PluginError) {
        let _ = (plugin, error);
    }
}

enum Slot {
    Constructing { owner: ThreadId },
    Initialising { owner: ThreadId, instance: Instance },
    Ready(Instance),
}

impl Slot {
    const fn owner(&self) -> Option<ThreadId> {
        match self {
            Self::Constructing { owner } | Self::Initialising { owner, .. } => Some(*owner),
            Self::Ready(_) => None,
        }
    }
}

enum Lookup {
    Found(Instance),
    Cyclic,
    Wait(ThreadId),
    Activate,
}

#[derive(Default)]
struct ManagerState {
    enabled: HashMap<PluginId, bool>,
    slots: HashMap<PluginId, Slot>,
    /// Plugin each blocked thread is waiting on.
    waiting: HashMap<ThreadId, PluginId>,
}

impl ManagerState {
    /// Returns `true` when `owner` is `current` or is itself waiting, directly
    /// or through other threads, on an activation `current` owns.
    fn leads_back_to(&self, owner: ThreadId, current: ThreadId) -> bool {
        let mut thread = owner;
        for _ in 0..=self.waiting.len() {
            if thread == current {
                return true;
            }
            let next = self
                .waiting
                .get(&thread)
                .and_then(|plugin| self.slots.get(plugin))
                .and_then(Slot::owner);
            match next {
                Some(owner) => thread = owner,
                None => return false,
            }
        }
        false
    }
}

/// Owns the activated plugin instances of one environment.
pub struct PluginManager {
    registry: Arc<ExtensionRegistry>,
    policy: Arc<dyn EnablementPolicy>,
    observer: Option<Arc<dyn ActivationObserver>>,
    context: Option<Arc<dyn Any + Send + Sync>>,
    state: Mutex<ManagerState>,
    settled: Condvar,
}

impl PluginManager {
    /// Builds a manager over `registry` using `policy` for enablement.
    #[must_use]
    pub fn new(registry: Arc<ExtensionRegistry>, policy: Arc<dyn EnablementPolicy>) -> Self {
        Self {
            registry,
            policy,
            observer: None,
            context: None,
            state: Mutex::new(ManagerState::default()),
            settled: Condvar::new(),
        }
    }

    /// Attaches a value plugins can read through [`PluginManager::context`].
    #[must_use]
    pub fn with_context<T: Any + Send + Sync>(mut self, context: Arc<T>) -> Self {
        self.context = Some(context);
        self
    }

    /// Attaches an observer notified after each activation.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ActivationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Registry this manager activates plugins from.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    /// Context value attached with [`PluginManager::with_context`], if it is
    /// a `T`.
    #[must_use]
    pub fn context<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.context.clone()?.downcast::<T>().ok()
    }

    /// Returns whether `plugin` is enabled, consulting the policy on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::LockPoisoned`] when the state lock is poisoned.
    pub fn is_enabled(&self, plugin: &PluginId) -> Result<bool, PluginError> {
        let mut state = self.lock()?;
        Ok(self.enabled_locked(&mut state, plugin))
    }

    /// Overrides the memoized enablement decision for `plugin`.
    ///
    /// Disabling an active plugin hides it from later resolutions; the
    /// instance itself is kept and reappears when re-enabled.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::LockPoisoned`] when the state lock is poisoned.
    pub fn set_enabled(&self, plugin: &PluginId, enabled: bool) -> Result<(), PluginError> {
        let mut state = self.lock()?;
        state.enabled.insert(plugin.clone(), enabled);
        debug!(target: PLUGINS_TARGET, plugin = %plugin, enabled, "plugin enablement overridden");
        Ok(())
    }

    /// Returns `true` once `plugin` has been fully activated.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::LockPoisoned`] when the state lock is poisoned.
    pub fn is_active(&self, plugin: &PluginId) -> Result<bool, PluginError> {
        let state = self.lock()?;
        Ok(matches!(state.slots.get(plugin), Some(Slot::Ready(_))))
    }

    /// Resolves `plugin` as its concrete type, activating it on first use.
    ///
    /// Returns `Ok(None)` when the plugin is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when the plugin is unknown, its factory or
    /// initialiser fails, or it is not a `P`.
    pub fn resolve<P: Plugin>(&self, plugin: &PluginId) -> Result<Option<Arc<P>>, PluginError> {
        let Some(instance) = self.activate(plugin)? else {
            return Ok(None);
        };
        instance
            .any
            .downcast::<P>()
            .map(Some)
            .map_err(|_| PluginError::TypeMismatch {
                plugin: plugin.clone(),
                expected: type_name::<P>(),
            })
    }

    /// Resolves `plugin` through the interface `I`, activating it on first
    /// use.
    ///
    /// Returns `Ok(None)` when the plugin is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when the plugin is unknown, its activation
    /// fails, or it does not implement `I`.
    pub fn resolve_interface<I: Interface>(
        &self,
        plugin: &PluginId,
    ) -> Result<Option<Arc<I::Object>>, PluginError> {
        let Some(instance) = self.activate(plugin)? else {
            return Ok(None);
        };
        self.registry
            .cast::<I>(plugin, instance.any)
            .map(Some)
            .ok_or_else(|| PluginError::TypeMismatch {
                plugin: plugin.clone(),
                expected: I::ID.as_str(),
            })
    }

    fn activate(&self, plugin: &PluginId) -> Result<Option<Instance>, PluginError> {
        let current = thread::current().id();
        let mut state = self.lock()?;
        loop {
            if !self.enabled_locked(&mut state, plugin) {
                return Ok(None);
            }
            let lookup = match state.slots.get(plugin) {
                Some(Slot::Ready(instance)) => Lookup::Found(instance.clone()),
                Some(Slot::Initialising { owner, instance }) if *owner == current => {
                    Lookup::Found(instance.clone())
                }
                Some(Slot::Constructing { owner }) if *owner == current => Lookup::Cyclic,
                Some(Slot::Constructing { owner } | Slot::Initialising { owner, .. }) => {
                    Lookup::Wait(*owner)
                }
                None => Lookup::Activate,
            };
            match lookup {
                Lookup::Found(instance) => return Ok(Some(instance)),
                Lookup::Cyclic => {
                    return Err(PluginError::CyclicConstruction {
                        plugin: plugin.clone(),
                    });
                }
                Lookup::Wait(owner) => {
                    if state.leads_back_to(owner, current) {
                        return Err(PluginError::CyclicConstruction {
                            plugin: plugin.clone(),
                        });
                    }
                    state.waiting.insert(current, plugin.clone());
                    state = self
                        .settled
                        .wait(state)
                        .map_err(|_| PluginError::LockPoisoned)?;
                    state.waiting.remove(&current);
                }
                Lookup::Activate => break,
            }
        }

        if !self.registry.contains(plugin.as_str()) {
            return Err(PluginError::NotRegistered {
                plugin: plugin.clone(),
            });
        }
        state
            .slots
            .insert(plugin.clone(), Slot::Constructing { owner: current });
        drop(state);

        let pending = PendingActivation {
            manager: self,
            plugin,
        };
        let instance = guard_panics(plugin, || self.registry.construct(plugin, self))
            .inspect_err(|error| self.report_failure(plugin, error))?;

        self.lock()?.slots.insert(
            plugin.clone(),
            Slot::Initialising {
                owner: current,
                instance: instance.clone(),
            },
        );
        guard_panics(plugin, || {
            instance
                .plugin
                .initialise(self)
                .map_err(|source| PluginError::Initialisation {
                    plugin: plugin.clone(),
                    source: Box::new(source),
                })
        })
        .inspect_err(|error| self.report_failure(plugin, error))?;

        pending.complete(instance.clone())?;
        debug!(target: PLUGINS_TARGET, plugin = %plugin, "plugin activated");
        if let Some(observer) = &self.observer {
            observer.activated(plugin);
        }
        Ok(Some(instance))
    }

    fn report_failure(&self, plugin: &PluginId, error: &PluginError) {
        warn!(target: PLUGINS_TARGET, plugin = %plugin, %error, "plugin activation failed");
        if let Some(observer) = &self.observer {
            observer.activation_failed(plugin, error);
        }
    }

    fn enabled_locked(&self, state: &mut ManagerState, plugin: &PluginId) -> bool {
        *state
            .enabled
            .entry(plugin.clone())
            .or_insert_with(|| self.policy.is_enabled(plugin))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ManagerState>, PluginError> {
        self.state.lock().map_err(|_| PluginError::LockPoisoned)
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PluginManager")
            .field("registry", &self.registry)
            .field("has_observer", &self.observer.is_some())
            .field("has_context", &self.context.is_some())
            .finish_non_exhaustive()
    }
}

/// Runs one activation step, turning a panic into [`PluginError::Panicked`].
fn guard_panics<T>(
    plugin: &PluginId,
    step: impl FnOnce() -> Result<T, PluginError>,
) -> Result<T, PluginError> {
    panic::catch_unwind(AssertUnwindSafe(step)).unwrap_or_else(|payload| {
        Err(PluginError::Panicked {
            plugin: plugin.clone(),
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}

/// Rolls back an activation that did not complete.
///
/// Dropping the guard without calling [`PendingActivation::complete`]
/// removes the plugin's slot and wakes waiters, so a later resolution can
/// retry.
struct PendingActivation<'a> {
    manager: &'a PluginManager,
    plugin: &'a PluginId,
}

impl PendingActivation<'_> {
    fn complete(self, instance: Instance) -> Result<(), PluginError> {
        let mut state = self.manager.lock()?;
        state.slots.insert(self.plugin.clone(), Slot::Ready(instance));
        drop(state);
        self.manager.settled.notify_all();
        std::mem::forget(self);
        Ok(())
    }
}

impl Drop for PendingActivation<'_> {
    fn drop(&mut self) {
        let mut state = self
            .manager
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.slots.remove(self.plugin);
        drop(state);
        self.manager.settled.notify_all();
    }
}
