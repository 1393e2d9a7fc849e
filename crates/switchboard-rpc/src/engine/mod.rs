//! Request dispatch.
//!
//! [`DispatchEngine`] parses a request, resolves its method against the
//! built-in introspection procedures, the top-level procedure table and the
//! service bundles, invokes the target, and encodes the response. Bundles
//! supplied by an attached [`BundleSource`] are consulted before statically
//! registered ones.

mod introspection;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::descriptor::ProcedureDescriptor;
use crate::error::{CallError, CallResult, RpcError};
use crate::params::Params;
use crate::protocol::{Request, Response};
use crate::registry::{Procedure, ProcedureRegistry, RegistryError, ServiceBundle, member_of};

use self::introspection::{Builtin, DESCRIBE_METHOD};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Identity reported by `service.describe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    name: String,
    id: String,
    version: Option<String>,
    summary: Option<String>,
    help: Option<String>,
}

impl ServiceIdentity {
    /// Identity with a name and stable id.
    #[must_use]
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            version: None,
            summary: None,
            help: None,
        }
    }

    /// Sets the reported version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the reported summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets the reported help text.
    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Service id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Supplies service bundles that may change between requests.
pub trait BundleSource: Send + Sync {
    /// Bundles currently available, in resolution order.
    fn bundles(&self) -> Vec<Arc<dyn ServiceBundle>>;
}

/// Resolved call target.
enum Target {
    Builtin(Builtin),
    Procedure(Arc<dyn Procedure>),
    Member {
        bundle: Arc<dyn ServiceBundle>,
        member: String,
    },
}

/// JSON-RPC request handler over a procedure registry.
pub struct DispatchEngine {
    identity: ServiceIdentity,
    registry: ProcedureRegistry,
    source: Option<Arc<dyn BundleSource>>,
}

impl DispatchEngine {
    /// Engine with no registered procedures besides the built-ins.
    #[must_use]
    pub fn new(identity: ServiceIdentity) -> Self {
        Self {
            identity,
            registry: ProcedureRegistry::new(),
            source: None,
        }
    }

    /// Consults `source` for bundles ahead of the static ones.
    #[must_use]
    pub fn with_bundle_source(mut self, source: Arc<dyn BundleSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Reported identity.
    #[must_use]
    pub const fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// Underlying registry.
    #[must_use]
    pub const fn registry(&self) -> &ProcedureRegistry {
        &self.registry
    }

    /// Adds a top-level procedure; an existing entry with the same name is
    /// replaced.
    pub fn register_procedure(
        &mut self,
        descriptor: ProcedureDescriptor,
        procedure: impl Procedure + 'static,
    ) {
        self.registry.register_procedure(descriptor, procedure);
    }

    /// Adds a service bundle.
    ///
    /// # Errors
    ///
    /// Rejects empty names and the reserved `system` namespace.
    pub fn register_service(&mut self, bundle: Arc<dyn ServiceBundle>) -> Result<(), RegistryError> {
        self.registry.register_service(bundle)
    }

    /// Handles raw request bytes. Invalid UTF-8 is reported as a parse error.
    #[must_use]
    pub fn handle_bytes(&self, payload: &[u8]) -> Option<String> {
        match std::str::from_utf8(payload) {
            Ok(text) => self.handle(text),
            Err(error) => Some(
                Response::failure(Value::Null, RpcError::parse_error(error.to_string())).encode(),
            ),
        }
    }

    /// Handles one request and returns the encoded response, or `None` for a
    /// notification.
    #[must_use]
    pub fn handle(&self, text: &str) -> Option<String> {
        let request = match Request::parse(text) {
            Ok(request) => request,
            Err(rejection) => {
                debug!(
                    target: DISPATCH_TARGET,
                    code = rejection.error.code,
                    "request rejected before dispatch"
                );
                let id = rejection.id?;
                return Some(Response::failure(id, rejection.error).encode());
            }
        };

        debug!(target: DISPATCH_TARGET, method = %request.method, "dispatching request");
        let outcome = self.invoke(&request.method, request.params);
        if let Err(error) = &outcome {
            debug!(
                target: DISPATCH_TARGET,
                method = %request.method,
                code = error.code,
                "request failed"
            );
        }

        let id = request.id?;
        let response = match outcome {
            Ok(result) => Response::success(id, result),
            Err(error) => Response::failure(id, error),
        };
        Some(response.encode())
    }

    /// Resolves and invokes `method`, converting every failure, including a
    /// panic inside the target, into an [`RpcError`].
    ///
    /// # Errors
    ///
    /// Returns the error object to report to the client.
    pub fn invoke(&self, method: &str, params: Params) -> Result<Value, RpcError> {
        let target = self
            .resolve(method)
            .ok_or_else(|| RpcError::method_not_found(method))?;
        match panic::catch_unwind(AssertUnwindSafe(|| self.call(&target, params))) {
            Ok(result) => result.map_err(CallError::into_rpc_error),
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                warn!(target: DISPATCH_TARGET, method, detail = %detail, "procedure panicked");
                Err(RpcError::internal(detail))
            }
        }
    }

    /// Bundles in resolution order: live bundles first, then static ones.
    ///
    /// A live source that panics contributes nothing to this resolution.
    fn bundles(&self) -> Vec<Arc<dyn ServiceBundle>> {
        let mut bundles = self
            .source
            .as_ref()
            .map(|source| self.live_bundles(source.as_ref()))
            .unwrap_or_default();
        bundles.extend(self.registry.services().iter().cloned());
        bundles
    }

    fn live_bundles(&self, source: &dyn BundleSource) -> Vec<Arc<dyn ServiceBundle>> {
        panic::catch_unwind(AssertUnwindSafe(|| source.bundles())).unwrap_or_else(|payload| {
            let detail = panic_message(payload.as_ref());
            warn!(
                target: DISPATCH_TARGET,
                service = %self.identity.name(),
                detail = %detail,
                "live bundle source panicked"
            );
            Vec::new()
        })
    }

    fn resolve(&self, method: &str) -> Option<Target> {
        if method == DESCRIBE_METHOD {
            return Some(Target::Builtin(Builtin::Describe));
        }
        if let Some(entry) = self.registry.procedure(method) {
            return Some(Target::Procedure(entry.procedure()));
        }
        if let Some(builtin) = Builtin::from_method(method) {
            return Some(Target::Builtin(builtin));
        }
        self.bundles().into_iter().find_map(|bundle| {
            let member = member_of(method, bundle.service_name())?.to_owned();
            Some(Target::Member { bundle, member })
        })
    }

    fn call(&self, target: &Target, params: Params) -> CallResult {
        match target {
            Target::Builtin(builtin) => builtin.call(self, params),
            Target::Procedure(procedure) => procedure.call(params),
            Target::Member { bundle, member } => bundle.invoke(member, params),
        }
    }

    /// Descriptor for a method in any namespace, used by introspection.
    fn descriptor_for(&self, method: &str) -> Option<ProcedureDescriptor> {
        if let Some(entry) = self.registry.procedure(method) {
            return Some(entry.descriptor().clone());
        }
        if let Some(builtin) = Builtin::from_method(method) {
            return Some(builtin.descriptor());
        }
        self.bundles().into_iter().find_map(|bundle| {
            let member = member_of(method, bundle.service_name())?;
            bundle.describe_procedure(member)
        })
    }
}

impl std::fmt::Debug for DispatchEngine {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("DispatchEngine")
            .field("identity", &self.identity)
            .field("registry", &self.registry)
            .field("has_bundle_source", &self.source.is_some())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("procedure panicked")
    }
}
