//! Callable targets and the table that binds them to names.
//!
//! Top-level procedures are keyed by their full method name. Service bundles
//! own a namespace and are reachable as `<service>.<procedure>`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::descriptor::ProcedureDescriptor;
use crate::error::{CallResult, RpcError};
use crate::params::Params;

/// Namespace reserved for the built-in introspection procedures.
pub const SYSTEM_NAMESPACE: &str = "system";

/// A single callable exposed over RPC.
pub trait Procedure: Send + Sync {
    /// Invokes the procedure.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::CallError`] describing why the call failed.
    fn call(&self, params: Params) -> CallResult;
}

impl<F> Procedure for F
where
    F: Fn(Params) -> CallResult + Send + Sync,
{
    fn call(&self, params: Params) -> CallResult {
        self(params)
    }
}

/// A named group of procedures reachable as `<service_name>.<procedure>`.
pub trait ServiceBundle: Send + Sync {
    /// Namespace the bundle answers to.
    fn service_name(&self) -> &str;

    /// Procedure names relative to the namespace.
    fn procedure_names(&self) -> Vec<String>;

    /// Metadata for one procedure, if the bundle knows it.
    fn describe_procedure(&self, name: &str) -> Option<ProcedureDescriptor>;

    /// Invokes a procedure by its relative name.
    ///
    /// # Errors
    ///
    /// Returns a method-not-found error for unknown names, or whatever the
    /// procedure itself reports.
    fn invoke(&self, name: &str, params: Params) -> CallResult;

    /// Fully qualified procedure names.
    fn qualified_names(&self) -> Vec<String> {
        let service = self.service_name();
        self.procedure_names()
            .into_iter()
            .map(|name| format!("{service}.{name}"))
            .collect()
    }

    /// Description records for every procedure, names prefixed with the
    /// namespace.
    fn descriptions(&self) -> Vec<Value> {
        let service = self.service_name();
        self.procedure_names()
            .into_iter()
            .map(|name| {
                self.describe_procedure(&name)
                    .unwrap_or_else(|| ProcedureDescriptor::bare(name))
                    .description(Some(service))
            })
            .collect()
    }
}

/// Procedure paired with its descriptor.
#[derive(Clone)]
pub struct RegisteredProcedure {
    descriptor: ProcedureDescriptor,
    procedure: Arc<dyn Procedure>,
}

impl RegisteredProcedure {
    /// Pairs a procedure with its metadata.
    pub fn new(descriptor: ProcedureDescriptor, procedure: impl Procedure + 'static) -> Self {
        Self {
            descriptor,
            procedure: Arc::new(procedure),
        }
    }

    /// Procedure metadata.
    #[must_use]
    pub const fn descriptor(&self) -> &ProcedureDescriptor {
        &self.descriptor
    }

    /// Shared handle to the callable.
    #[must_use]
    pub fn procedure(&self) -> Arc<dyn Procedure> {
        Arc::clone(&self.procedure)
    }
}

impl std::fmt::Debug for RegisteredProcedure {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RegisteredProcedure")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Ready-made [`ServiceBundle`] built from closures or [`Procedure`] values.
#[derive(Debug, Clone)]
pub struct ProcedureSet {
    name: String,
    entries: Vec<RegisteredProcedure>,
}

impl ProcedureSet {
    /// Empty bundle answering to `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Adds a procedure, replacing any existing one with the same name.
    #[must_use]
    pub fn with(
        mut self,
        descriptor: ProcedureDescriptor,
        procedure: impl Procedure + 'static,
    ) -> Self {
        self.insert(descriptor, procedure);
        self
    }

    /// Adds a procedure, replacing any existing one with the same name.
    pub fn insert(&mut self, descriptor: ProcedureDescriptor, procedure: impl Procedure + 'static) {
        let entry = RegisteredProcedure::new(descriptor, procedure);
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.descriptor.name() == entry.descriptor.name())
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    fn entry(&self, name: &str) -> Option<&RegisteredProcedure> {
        self.entries
            .iter()
            .find(|entry| entry.descriptor.name() == name)
    }
}

impl ServiceBundle for ProcedureSet {
    fn service_name(&self) -> &str {
        &self.name
    }

    fn procedure_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.descriptor.name().to_owned())
            .collect()
    }

    fn describe_procedure(&self, name: &str) -> Option<ProcedureDescriptor> {
        self.entry(name).map(|entry| entry.descriptor.clone())
    }

    fn invoke(&self, name: &str, params: Params) -> CallResult {
        let entry = self.entry(name).ok_or_else(|| {
            RpcError::method_not_found(format!("{name} in service {}", self.name))
        })?;
        entry.procedure.call(params)
    }
}

/// Errors raised while registering targets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The `system` namespace is reserved for introspection.
    #[error("service name 'system' is reserved")]
    ReservedNamespace,
    /// Service bundles need a non-empty name.
    #[error("service name must not be empty")]
    EmptyServiceName,
}

/// Table of top-level procedures and service bundles.
#[derive(Default)]
pub struct ProcedureRegistry {
    procedures: BTreeMap<String, RegisteredProcedure>,
    services: Vec<Arc<dyn ServiceBundle>>,
}

impl ProcedureRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top-level procedure keyed by its descriptor name. An existing
    /// entry with the same name is replaced.
    pub fn register_procedure(
        &mut self,
        descriptor: ProcedureDescriptor,
        procedure: impl Procedure + 'static,
    ) {
        let name = descriptor.name().to_owned();
        self.procedures
            .insert(name, RegisteredProcedure::new(descriptor, procedure));
    }

    /// Adds a service bundle. Re-registering a name replaces the earlier
    /// bundle in place, keeping its position in the resolution order.
    ///
    /// # Errors
    ///
    /// Rejects empty names and the reserved `system` namespace.
    pub fn register_service(&mut self, bundle: Arc<dyn ServiceBundle>) -> Result<(), RegistryError> {
        let name = bundle.service_name();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyServiceName);
        }
        if name == SYSTEM_NAMESPACE {
            return Err(RegistryError::ReservedNamespace);
        }
        match self
            .services
            .iter_mut()
            .find(|existing| existing.service_name() == bundle.service_name())
        {
            Some(existing) => *existing = bundle,
            None => self.services.push(bundle),
        }
        Ok(())
    }

    /// Top-level procedure registered under `name`.
    #[must_use]
    pub fn procedure(&self, name: &str) -> Option<&RegisteredProcedure> {
        self.procedures.get(name)
    }

    /// Top-level procedures in name order.
    pub fn procedures(&self) -> impl Iterator<Item = &RegisteredProcedure> {
        self.procedures.values()
    }

    /// Service bundles in registration order.
    #[must_use]
    pub fn services(&self) -> &[Arc<dyn ServiceBundle>] {
        &self.services
    }
}

impl std::fmt::Debug for ProcedureRegistry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let services: Vec<&str> = self.services.iter().map(|s| s.service_name()).collect();
        formatter
            .debug_struct("ProcedureRegistry")
            .field("procedures", &self.procedures.keys().collect::<Vec<_>>())
            .field("services", &services)
            .finish()
    }
}

/// Splits `method` into the relative procedure name when it lives in
/// `service`'s namespace.
#[must_use]
pub fn member_of<'a>(method: &'a str, service: &str) -> Option<&'a str> {
    method.strip_prefix(service)?.strip_prefix('.')
}
