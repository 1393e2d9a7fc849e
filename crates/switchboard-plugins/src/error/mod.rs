//! Domain errors raised by the plugin framework.
//!
//! Activation failures carry the plugin identifier so callers can report
//! which provider misbehaved. The underlying cause is boxed to keep the
//! error small.

use thiserror::Error;

use crate::PluginId;

/// Errors arising while resolving or activating plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No provider is registered under the identifier.
    #[error("plugin '{plugin}' is not registered")]
    NotRegistered {
        /// Identifier that was looked up.
        plugin: PluginId,
    },

    /// The plugin factory failed to build an instance.
    #[error("plugin '{plugin}' could not be constructed: {source}")]
    Construction {
        /// Plugin being activated.
        plugin: PluginId,
        /// Failure reported by the factory.
        #[source]
        source: Box<Self>,
    },

    /// The plugin initialiser failed; the plugin may be retried later.
    #[error("plugin '{plugin}' failed to initialise: {source}")]
    Initialisation {
        /// Plugin being activated.
        plugin: PluginId,
        /// Failure reported by the initialiser.
        #[source]
        source: Box<Self>,
    },

    /// The plugin's factory asked for the plugin it is still building.
    #[error("plugin '{plugin}' was requested while it was being constructed")]
    CyclicConstruction {
        /// Plugin being constructed.
        plugin: PluginId,
    },

    /// The plugin's factory or initialiser panicked.
    #[error("plugin '{plugin}' panicked during activation: {message}")]
    Panicked {
        /// Plugin being activated.
        plugin: PluginId,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// The activated instance is not of the requested type.
    #[error("plugin '{plugin}' is not a '{expected}'")]
    TypeMismatch {
        /// Plugin that was resolved.
        plugin: PluginId,
        /// Requested Rust type.
        expected: &'static str,
    },

    /// The manager state lock was poisoned by a panicking thread.
    #[error("plugin manager state is poisoned")]
    LockPoisoned,

    /// Failure raised by plugin code.
    #[error("{message}")]
    Failed {
        /// Human-readable failure description.
        message: String,
    },
}

impl PluginError {
    /// Failure raised by plugin code.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Plugin the error concerns, when known.
    #[must_use]
    pub const fn plugin(&self) -> Option<&PluginId> {
        match self {
            Self::NotRegistered { plugin }
            | Self::Construction { plugin, .. }
            | Self::Initialisation { plugin, .. }
            | Self::CyclicConstruction { plugin }
            | Self::Panicked { plugin, .. }
            | Self::TypeMismatch { plugin, .. } => Some(plugin),
            Self::LockPoisoned | Self::Failed { .. } => None,
        }
    }
}

/// Errors raised while populating or installing an extension registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A provider with the same identifier was already defined.
    #[error("plugin '{plugin}' is already defined")]
    DuplicatePlugin {
        /// Conflicting identifier.
        plugin: PluginId,
    },

    /// The process-wide registry was already installed.
    #[error("the process-wide extension registry is already installed")]
    AlreadyInstalled,
}
