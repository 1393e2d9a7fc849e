//! Plugins shipped with the daemon.

mod logging;

use switchboard_plugins::{ExtensionRegistry, RegistryError};

use crate::interfaces::RpcService;

pub use self::logging::{LOGGING_SERVICE, RPC_LOGGING_PLUGIN, RpcLogging};

/// Defines the built-in plugins in `registry`.
///
/// # Errors
///
/// Returns [`RegistryError::DuplicatePlugin`] when a built-in identifier is
/// already taken.
pub fn register_builtin_plugins(registry: &mut ExtensionRegistry) -> Result<(), RegistryError> {
    registry
        .define(RPC_LOGGING_PLUGIN, RpcLogging::from_manager)?
        .implements::<RpcService, _>(|plugin| plugin);
    Ok(())
}

#[cfg(test)]
mod tests;
