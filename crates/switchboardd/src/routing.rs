//! Dispatch engine that also routes to plugin-provided services.

use std::sync::Arc;

use switchboard_plugins::{ExtensionPoint, PluginManager};
use switchboard_rpc::{BundleSource, DispatchEngine, ServiceBundle, ServiceIdentity};

use crate::interfaces::RpcService;
use crate::transport::RequestHandler;

/// Live set of [`RpcService`] plugins, read afresh for every request.
#[derive(Debug)]
pub struct PluginServiceSource {
    manager: Arc<PluginManager>,
    services: ExtensionPoint<RpcService>,
}

impl PluginServiceSource {
    /// Reads services through `manager`.
    #[must_use]
    pub const fn new(manager: Arc<PluginManager>) -> Self {
        Self {
            manager,
            services: ExtensionPoint::new(),
        }
    }
}

impl BundleSource for PluginServiceSource {
    fn bundles(&self) -> Vec<Arc<dyn ServiceBundle>> {
        self.services.extensions(&self.manager)
    }
}

/// [`DispatchEngine`] whose namespaces include every enabled
/// [`RpcService`] plugin.
///
/// Plugin services are matched before statically registered ones. A plugin
/// that is disabled or fails to activate is simply absent, so its namespace
/// answers `Method not found`.
#[derive(Debug)]
pub struct RoutingDispatchEngine {
    engine: DispatchEngine,
}

impl RoutingDispatchEngine {
    /// Builds an engine that resolves plugin services through `manager`.
    #[must_use]
    pub fn new(identity: ServiceIdentity, manager: Arc<PluginManager>) -> Self {
        let source = Arc::new(PluginServiceSource::new(manager));
        Self {
            engine: DispatchEngine::new(identity).with_bundle_source(source),
        }
    }

    /// Underlying engine.
    #[must_use]
    pub const fn engine(&self) -> &DispatchEngine {
        &self.engine
    }

    /// Underlying engine, for registering static procedures and services.
    pub const fn engine_mut(&mut self) -> &mut DispatchEngine {
        &mut self.engine
    }

    /// Handles one request; see [`DispatchEngine::handle`].
    #[must_use]
    pub fn handle(&self, text: &str) -> Option<String> {
        self.engine.handle(text)
    }
}

impl RequestHandler for RoutingDispatchEngine {
    fn handle_request(&self, payload: &[u8]) -> Option<String> {
        self.engine.handle_bytes(payload)
    }
}
