//! Built-in `system.*` procedures and `service.describe`.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::DispatchEngine;
use crate::descriptor::{ParamType, ParameterDescriptor, ProcedureDescriptor};
use crate::error::CallResult;
use crate::params::Params;
use crate::registry::SYSTEM_NAMESPACE;

/// Method answered with the service description.
pub(super) const DESCRIBE_METHOD: &str = "service.describe";

const DESCRIPTION_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Builtin {
    ListMethods,
    MethodSignature,
    MethodHelp,
    Echo,
    Describe,
}

/// Argument of `system.methodSignature` and `system.methodHelp`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MethodName {
    name: String,
}

impl Builtin {
    /// Built-ins listed in descriptions; `service.describe` never describes
    /// itself.
    const LISTED: [Self; 4] = [
        Self::ListMethods,
        Self::MethodSignature,
        Self::MethodHelp,
        Self::Echo,
    ];

    pub(super) fn from_method(method: &str) -> Option<Self> {
        match method {
            "system.listMethods" => Some(Self::ListMethods),
            "system.methodSignature" => Some(Self::MethodSignature),
            "system.methodHelp" => Some(Self::MethodHelp),
            "system.echo" => Some(Self::Echo),
            DESCRIBE_METHOD => Some(Self::Describe),
            _ => None,
        }
    }

    const fn method(self) -> &'static str {
        match self {
            Self::ListMethods => "system.listMethods",
            Self::MethodSignature => "system.methodSignature",
            Self::MethodHelp => "system.methodHelp",
            Self::Echo => "system.echo",
            Self::Describe => DESCRIBE_METHOD,
        }
    }

    pub(super) fn descriptor(self) -> ProcedureDescriptor {
        let builder = ProcedureDescriptor::builder(self.method());
        let builder = match self {
            Self::ListMethods => builder
                .summary("Lists every non-system method supported by the server.")
                .idempotent()
                .returns(ParamType::Arr),
            Self::MethodSignature => builder
                .summary("Returns the signature of a method as [return, params...].")
                .idempotent()
                .param(ParameterDescriptor::of(ParamType::Str))
                .returns(ParamType::Arr),
            Self::MethodHelp => builder
                .summary("Returns the documentation string of a method, or an empty string.")
                .idempotent()
                .param(ParameterDescriptor::of(ParamType::Str))
                .returns(ParamType::Str),
            Self::Echo => builder
                .summary("Returns the parameters it was called with.")
                .idempotent()
                .param(ParameterDescriptor::of(ParamType::Any))
                .returns(ParamType::Any),
            Self::Describe => builder
                .summary("Returns the service description.")
                .idempotent()
                .returns(ParamType::Obj),
        };
        builder
            .build()
            .unwrap_or_else(|_| ProcedureDescriptor::bare(self.method()))
    }

    pub(super) fn call(self, engine: &DispatchEngine, params: Params) -> CallResult {
        match self {
            Self::ListMethods => {
                params.expect_none()?;
                Ok(Value::from(list_methods(engine)))
            }
            Self::MethodSignature => {
                let MethodName { name } = params.decode()?;
                let signature = engine
                    .descriptor_for(&name)
                    .and_then(|descriptor| descriptor.signature());
                Ok(signature.map_or(Value::Null, |types| {
                    Value::Array(types.iter().map(|t| Value::from(t.as_str())).collect())
                }))
            }
            Self::MethodHelp => {
                let MethodName { name } = params.decode()?;
                let help = engine
                    .descriptor_for(&name)
                    .map(|descriptor| descriptor.help_text().to_owned())
                    .unwrap_or_default();
                Ok(Value::from(help))
            }
            Self::Echo => Ok(params.into_value()),
            Self::Describe => {
                params.expect_none()?;
                Ok(describe(engine))
            }
        }
    }
}

/// Sorted, deduplicated method names outside the `system` namespace.
fn list_methods(engine: &DispatchEngine) -> Vec<String> {
    let system_prefix = format!("{SYSTEM_NAMESPACE}.");
    let mut names: BTreeSet<String> = engine
        .registry
        .procedures()
        .map(|entry| entry.descriptor().name().to_owned())
        .filter(|name| !name.starts_with(&system_prefix))
        .collect();
    for bundle in engine.bundles() {
        names.extend(bundle.qualified_names());
    }
    names.into_iter().collect()
}

fn describe(engine: &DispatchEngine) -> Value {
    let identity = &engine.identity;
    let mut object = Map::new();
    object.insert("sdversion".to_owned(), Value::from(DESCRIPTION_VERSION));
    object.insert("name".to_owned(), Value::from(identity.name.as_str()));
    object.insert("id".to_owned(), Value::from(identity.id.as_str()));
    let optional = [
        ("version", &identity.version),
        ("summary", &identity.summary),
        ("help", &identity.help),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            object.insert(key.to_owned(), Value::from(value.as_str()));
        }
    }

    let mut procs: Vec<Value> = Builtin::LISTED
        .iter()
        .filter(|builtin| engine.registry.procedure(builtin.method()).is_none())
        .map(|builtin| builtin.descriptor().description(None))
        .collect();
    procs.extend(
        engine
            .registry
            .procedures()
            .map(|entry| entry.descriptor().description(None)),
    );
    for bundle in engine.bundles() {
        procs.extend(bundle.descriptions());
    }
    object.insert("procs".to_owned(), Value::Array(procs));
    Value::Object(object)
}
