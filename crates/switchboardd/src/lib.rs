//! The switchboard daemon.
//!
//! The daemon exposes JSON-RPC services over TCP. Which services exist is
//! decided at runtime: every enabled plugin implementing
//! [`interfaces::RpcService`] contributes a namespace, alongside procedures
//! registered directly on the [`RoutingDispatchEngine`].
//!
//! Start-up loads layered configuration, initialises structured telemetry,
//! builds the plugin [`Environment`] with a configuration-driven enablement
//! policy, and binds the [`ConnectionListener`]. Health reporting hooks emit
//! structured events at each stage. Each accepted connection carries exactly
//! one request and receives at most one response.

mod bootstrap;
mod environment;
mod health;
pub mod interfaces;
pub mod plugins;
mod process;
mod routing;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, RunningDaemon, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with, builtin_registry,
};
pub use environment::{BUILTIN_PLUGIN_PREFIX, ConfigEnablementPolicy, Environment};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon, run_daemon_with,
};
pub use routing::{PluginServiceSource, RoutingDispatchEngine};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};
pub use transport::{
    ConnectionHandler, ConnectionListener, ListenerError, ListenerHandle, MAX_REQUEST_BYTES,
    READ_CHUNK_BYTES, RequestHandler, RpcConnectionHandler,
};

#[cfg(test)]
mod tests;
