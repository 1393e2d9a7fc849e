//! JSON-RPC 2.0 dispatch for the switchboard daemon.
//!
//! The crate turns one request payload into at most one response payload.
//! Procedures are registered either at the top level, keyed by their full
//! method name, or inside a [`ServiceBundle`] that owns a dot-separated
//! namespace. The engine also answers the standard introspection methods
//! (`system.listMethods`, `system.methodSignature`, `system.methodHelp`,
//! `system.echo`) and `service.describe`.
//!
//! Procedures report failure through [`CallError`]. Deliberate protocol
//! errors travel to the client unchanged; call-shape mismatches become
//! `Invalid params`; everything else, panics included, becomes
//! `Internal error` with the failure description attached.

mod descriptor;
mod engine;
mod error;
mod params;
mod protocol;
mod registry;

pub use descriptor::{
    DescriptorError, ParamType, ParameterDescriptor, ProcedureDescriptor,
    ProcedureDescriptorBuilder,
};
pub use engine::{BundleSource, DispatchEngine, ServiceIdentity};
pub use error::{CallError, CallResult, ErrorKind, RpcError};
pub use params::Params;
pub use protocol::{JSONRPC_VERSION, Outcome, Rejection, Request, Response};
pub use registry::{
    Procedure, ProcedureRegistry, ProcedureSet, RegisteredProcedure, RegistryError,
    SYSTEM_NAMESPACE, ServiceBundle, member_of,
};

#[cfg(test)]
mod tests;
