//! Daemon bootstrap orchestration.

use std::net::SocketAddr;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use switchboard_config::Config;
use switchboard_plugins::{ExtensionRegistry, RegistryError};
use switchboard_rpc::ServiceIdentity;
use thiserror::Error;
use uuid::Uuid;

use crate::environment::Environment;
use crate::health::HealthReporter;
use crate::plugins::register_builtin_plugins;
use crate::routing::RoutingDispatchEngine;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{ConnectionListener, ListenerError, ListenerHandle, RpcConnectionHandler};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader error when no configuration can be resolved.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a configuration resolved earlier.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The listener could not be bound or started.
    #[error("failed to start listener: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
}

/// Builds a registry holding the built-in plugins.
///
/// # Errors
///
/// Returns [`RegistryError`] when a built-in identifier is defined twice.
pub fn builtin_registry() -> Result<ExtensionRegistry, RegistryError> {
    let mut registry = ExtensionRegistry::new();
    register_builtin_plugins(&mut registry)?;
    Ok(registry)
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    environment: Environment,
    engine: RoutingDispatchEngine,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        self.environment.config()
    }

    /// Accessor for the plugin environment.
    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Dispatch engine serving requests.
    #[must_use]
    pub const fn engine(&self) -> &RoutingDispatchEngine {
        &self.engine
    }

    /// Dispatch engine, for registering extra procedures before serving.
    pub const fn engine_mut(&mut self) -> &mut RoutingDispatchEngine {
        &mut self.engine
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Binds the configured endpoint and starts serving requests.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Listener`] when the endpoint cannot be
    /// bound.
    pub fn serve(self) -> Result<RunningDaemon, BootstrapError> {
        let Self {
            environment,
            engine,
            reporter,
            ..
        } = self;
        let listen = || -> Result<(SocketAddr, ListenerHandle), ListenerError> {
            let listener = ConnectionListener::bind(environment.config().listen())?;
            let addr = listener.local_addr()?;
            let handle = listener.start(Arc::new(RpcConnectionHandler::new(engine)))?;
            Ok((addr, handle))
        };
        match listen() {
            Ok((addr, handle)) => {
                reporter.listener_ready(addr);
                Ok(RunningDaemon {
                    addr,
                    handle,
                    environment,
                })
            }
            Err(source) => {
                let error = BootstrapError::Listener { source };
                reporter.bootstrap_failed(&error);
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Daemon")
            .field("environment", &self.environment)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

/// A daemon accepting connections.
#[derive(Debug)]
pub struct RunningDaemon {
    addr: SocketAddr,
    handle: ListenerHandle,
    environment: Environment,
}

impl RunningDaemon {
    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Plugin environment serving requests.
    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Stops accepting connections and waits for the accept loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the accept loop panicked.
    pub fn stop(self) -> Result<(), ListenerError> {
        self.handle.shutdown();
        self.handle.join()
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration or telemetry cannot be
/// set up. Failures are also reported to `reporter`.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    registry: Arc<ExtensionRegistry>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let identity = service_identity(&config);
    let environment = Environment::new(config, registry, Arc::clone(&reporter));
    let engine = RoutingDispatchEngine::new(identity, environment.manager());
    reporter.bootstrap_succeeded(environment.config());

    Ok(Daemon {
        environment,
        engine,
        telemetry,
        reporter,
    })
}

fn service_identity(config: &Config) -> ServiceIdentity {
    let id = config
        .service_id()
        .map_or_else(|| format!("urn:uuid:{}", Uuid::new_v4()), str::to_owned);
    let mut identity =
        ServiceIdentity::new(config.service_name(), id).with_version(env!("CARGO_PKG_VERSION"));
    if let Some(summary) = config.service_summary() {
        identity = identity.with_summary(summary);
    }
    identity
}
