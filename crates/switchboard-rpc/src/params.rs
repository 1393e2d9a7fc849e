//! Call arguments as received on the wire.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{CallError, RpcError};

/// Arguments supplied with a request.
///
/// A JSON array means positional arguments only, an object means keyed
/// arguments only, and an absent member means no arguments at all.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    /// No `params` member was sent.
    #[default]
    None,
    /// Positional arguments.
    Positional(Vec<Value>),
    /// Keyed arguments.
    Keyed(Map<String, Value>),
}

impl Params {
    /// Interprets the `params` member of a request.
    ///
    /// `null` is treated like an absent member.
    ///
    /// # Errors
    ///
    /// Returns an invalid-request error when `params` is a scalar.
    pub fn from_member(member: Option<Value>) -> Result<Self, RpcError> {
        match member {
            None | Some(Value::Null) => Ok(Self::None),
            Some(Value::Array(values)) => Ok(Self::Positional(values)),
            Some(Value::Object(map)) => Ok(Self::Keyed(map)),
            Some(_) => Err(RpcError::invalid_request(
                "params must be an array or an object",
            )),
        }
    }

    /// Number of supplied arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Positional(values) => values.len(),
            Self::Keyed(map) => map.len(),
        }
    }

    /// Returns `true` when no arguments were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fails unless the call carries no arguments.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Shape`] when any argument is present.
    pub fn expect_none(&self) -> Result<(), CallError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CallError::shape(format!(
                "takes no parameters but {} were given",
                self.len()
            )))
        }
    }

    /// Decodes the arguments into `T`.
    ///
    /// Structs decode from both positional and keyed arguments, so one type
    /// serves both call shapes. Absent arguments decode as an empty sequence.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Shape`] when the arguments do not fit `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, CallError> {
        let value = match self {
            Self::None => Value::Array(Vec::new()),
            Self::Positional(values) => Value::Array(values),
            Self::Keyed(map) => Value::Object(map),
        };
        serde_json::from_value(value).map_err(|error| CallError::shape(error.to_string()))
    }

    /// Arguments as a single JSON value: an array for positional arguments,
    /// otherwise an object.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::None => Value::Object(Map::new()),
            Self::Positional(values) => Value::Array(values),
            Self::Keyed(map) => Value::Object(map),
        }
    }
}
