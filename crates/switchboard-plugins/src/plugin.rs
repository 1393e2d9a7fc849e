//! Plugin identities and the traits providers implement.

use std::any::Any;
use std::borrow::Borrow;
use std::fmt;

use crate::error::PluginError;
use crate::manager::PluginManager;

/// Stable identifier of a plugin provider, e.g. `switchboard.rpclogging`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(String);

impl PluginId {
    /// Wraps an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for PluginId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PluginId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for PluginId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identifier of an extension interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(&'static str);

impl InterfaceId {
    /// Declares an interface identifier.
    #[must_use]
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    /// Identifier text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.0)
    }
}

/// Marker for an extension interface.
///
/// `Object` is the trait object providers are viewed through, such as
/// `dyn ServiceBundle`.
pub trait Interface: 'static {
    /// Trait object exposed by providers of this interface.
    type Object: ?Sized + Send + Sync + 'static;

    /// Identifier recorded in the extension registry.
    const ID: InterfaceId;
}

/// A plugin provider.
pub trait Plugin: Any + Send + Sync {
    /// Runs once after construction, before the instance is handed out.
    ///
    /// Resolving this same plugin from inside `initialise` returns the
    /// instance being initialised. Returning an error discards the instance
    /// so a later resolution can try again.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when the plugin cannot start.
    fn initialise(&self, manager: &PluginManager) -> Result<(), PluginError> {
        let _ = manager;
        Ok(())
    }
}
