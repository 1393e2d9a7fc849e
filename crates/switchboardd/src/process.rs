//! Process lifecycle: serve until a termination signal arrives.

use std::io;
use std::sync::Arc;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use switchboard_plugins::{ExtensionRegistry, RegistryError};
use thiserror::Error;
use tracing::info;

use crate::bootstrap::{
    BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with, builtin_registry,
};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::transport::ListenerError;

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the notification mechanism cannot be
    /// installed.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener that waits for termination signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        if let Some(signal) = signals.forever().next() {
            info!(target: PROCESS_TARGET, signal, "shutdown signal received");
        }
        Ok(())
    }
}

/// Errors surfaced while running the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Built-in plugins could not be registered.
    #[error("failed to register plugins: {0}")]
    Registry(#[from] RegistryError),
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// Waiting for shutdown failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    /// The listener did not stop cleanly.
    #[error("failed to stop listener: {0}")]
    Listener(#[from] ListenerError),
}

/// Runs the daemon using the production collaborators.
///
/// The built-in plugins are installed as the process-wide extension
/// registry.
///
/// # Errors
///
/// Returns [`LaunchError`] when start-up fails or the listener does not stop
/// cleanly.
pub fn run_daemon() -> Result<(), LaunchError> {
    let registry = builtin_registry()?.install()?;
    run_daemon_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        registry,
        &SystemShutdownSignal,
    )
}

/// Runs the daemon with injected collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when start-up fails or the listener does not stop
/// cleanly.
pub fn run_daemon_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    registry: Arc<ExtensionRegistry>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let daemon = bootstrap_with(loader, reporter, registry)?;
    let running = daemon.serve()?;
    info!(
        target: PROCESS_TARGET,
        addr = %running.local_addr(),
        "daemon running"
    );
    shutdown.wait()?;
    running.stop()?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
