//! Procedure metadata used for introspection.
//!
//! Descriptors never restrict what arguments a procedure accepts at call
//! time. They feed `system.methodSignature`, `system.methodHelp` and
//! `service.describe`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Wire type of a parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Boolean.
    Bit,
    /// Number.
    Num,
    /// String.
    Str,
    /// Array.
    Arr,
    /// Object.
    Obj,
    /// Any JSON value.
    Any,
}

impl ParamType {
    /// Short type string used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bit => "bit",
            Self::Num => "num",
            Self::Str => "str",
            Self::Arr => "arr",
            Self::Obj => "obj",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ParamType {
    type Err = DescriptorError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "bit" => Ok(Self::Bit),
            "num" => Ok(Self::Num),
            "str" => Ok(Self::Str),
            "arr" => Ok(Self::Arr),
            "obj" => Ok(Self::Obj),
            "any" => Ok(Self::Any),
            other => Err(DescriptorError::UnknownType {
                value: other.to_owned(),
            }),
        }
    }
}

/// Errors raised while building a [`ProcedureDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The procedure name was empty.
    #[error("procedure name must not be empty")]
    EmptyName,
    /// A type string is not one of `bit`, `num`, `str`, `arr`, `obj`, `any`.
    #[error("invalid parameter type '{value}'")]
    UnknownType {
        /// Rejected type string.
        value: String,
    },
    /// Named and unnamed parameters were combined in one list.
    #[error("procedure '{procedure}' mixes named and unnamed parameters")]
    MixedNaming {
        /// Procedure being described.
        procedure: String,
    },
}

/// One parameter: a wire type with an optional name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    kind: ParamType,
    name: Option<String>,
}

impl ParameterDescriptor {
    /// Unnamed parameter of the given type.
    #[must_use]
    pub const fn of(kind: ParamType) -> Self {
        Self { kind, name: None }
    }

    /// Named parameter of the given type.
    #[must_use]
    pub fn named(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            kind,
            name: Some(name.into()),
        }
    }

    /// Wire type.
    #[must_use]
    pub const fn kind(&self) -> ParamType {
        self.kind
    }

    /// Parameter name, when declared.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Introspection form: `{"name", "type"}` when named, else the bare type string.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match &self.name {
            Some(name) => {
                let mut object = Map::new();
                object.insert("name".to_owned(), Value::from(name.as_str()));
                object.insert("type".to_owned(), Value::from(self.kind.as_str()));
                Value::Object(object)
            }
            None => Value::from(self.kind.as_str()),
        }
    }
}

/// Immutable metadata for one callable procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureDescriptor {
    name: String,
    summary: Option<String>,
    help: Option<String>,
    idempotent: bool,
    params: Vec<ParameterDescriptor>,
    returns: Option<ParamType>,
}

impl ProcedureDescriptor {
    /// Starts describing a procedure called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ProcedureDescriptorBuilder {
        ProcedureDescriptorBuilder {
            descriptor: Self::bare(name),
        }
    }

    /// Descriptor carrying only a name.
    pub(crate) fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: None,
            help: None,
            idempotent: false,
            params: Vec::new(),
            returns: None,
        }
    }

    /// Procedure name, relative to its namespace.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Longer help text.
    #[must_use]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Whether repeated calls have no further effect.
    #[must_use]
    pub const fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    /// Declared parameters; empty when none were declared.
    #[must_use]
    pub fn params(&self) -> &[ParameterDescriptor] {
        &self.params
    }

    /// Declared return type.
    #[must_use]
    pub const fn returns(&self) -> Option<ParamType> {
        self.returns
    }

    /// Help text for `system.methodHelp`: help, else summary, else empty.
    #[must_use]
    pub fn help_text(&self) -> &str {
        self.help
            .as_deref()
            .or(self.summary.as_deref())
            .unwrap_or_default()
    }

    /// Call signature `[return, param...]`, available only when a return type
    /// is declared.
    #[must_use]
    pub fn signature(&self) -> Option<Vec<ParamType>> {
        let returns = self.returns?;
        let mut signature = Vec::with_capacity(self.params.len() + 1);
        signature.push(returns);
        signature.extend(self.params.iter().map(ParameterDescriptor::kind));
        Some(signature)
    }

    /// Procedure description record. `prefix` is joined to the name with a
    /// dot when present.
    #[must_use]
    pub fn description(&self, prefix: Option<&str>) -> Value {
        let name = match prefix {
            Some(prefix) => format!("{prefix}.{}", self.name),
            None => self.name.clone(),
        };
        let mut object = Map::new();
        object.insert("name".to_owned(), Value::from(name));
        if let Some(summary) = &self.summary {
            object.insert("summary".to_owned(), Value::from(summary.as_str()));
        }
        if let Some(help) = &self.help {
            object.insert("help".to_owned(), Value::from(help.as_str()));
        }
        if self.idempotent {
            object.insert("idempotent".to_owned(), Value::Bool(true));
        }
        if !self.params.is_empty() {
            let params = self.params.iter().map(ParameterDescriptor::to_value);
            object.insert("params".to_owned(), Value::Array(params.collect()));
        }
        if let Some(returns) = self.returns {
            object.insert("return".to_owned(), Value::from(returns.as_str()));
        }
        Value::Object(object)
    }
}

/// Builder for [`ProcedureDescriptor`].
#[derive(Debug, Clone)]
pub struct ProcedureDescriptorBuilder {
    descriptor: ProcedureDescriptor,
}

impl ProcedureDescriptorBuilder {
    /// Sets the one-line summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.descriptor.summary = Some(summary.into());
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.descriptor.help = Some(help.into());
        self
    }

    /// Marks the procedure idempotent.
    #[must_use]
    pub const fn idempotent(mut self) -> Self {
        self.descriptor.idempotent = true;
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, param: ParameterDescriptor) -> Self {
        self.descriptor.params.push(param);
        self
    }

    /// Declares the return type.
    #[must_use]
    pub const fn returns(mut self, returns: ParamType) -> Self {
        self.descriptor.returns = Some(returns);
        self
    }

    /// Finishes the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::EmptyName`] for a blank name and
    /// [`DescriptorError::MixedNaming`] when named and unnamed parameters are
    /// combined.
    pub fn build(self) -> Result<ProcedureDescriptor, DescriptorError> {
        let descriptor = self.descriptor;
        if descriptor.name.trim().is_empty() {
            return Err(DescriptorError::EmptyName);
        }
        let named = descriptor.params.iter().filter(|p| p.name.is_some()).count();
        if named != 0 && named != descriptor.params.len() {
            return Err(DescriptorError::MixedNaming {
                procedure: descriptor.name,
            });
        }
        Ok(descriptor)
    }
}
