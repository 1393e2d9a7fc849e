//! Wire-level error taxonomy and procedure failure types.
//!
//! [`RpcError`] is the error object sent to clients. [`CallError`] is what a
//! procedure returns on failure; the dispatch boundary converts it into an
//! [`RpcError`] so deliberate domain errors reach the client verbatim while
//! anything else is reported as an internal error.

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Fixed JSON-RPC error kinds understood by the dispatch engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Request text is not valid JSON.
    Parse,
    /// The request object is missing members or names the wrong protocol.
    InvalidRequest,
    /// No procedure or service namespace matches the method name.
    MethodNotFound,
    /// Arguments do not fit the resolved procedure.
    InvalidParams,
    /// Unexpected failure while invoking a procedure.
    Internal,
    /// Domain code signalled a business-level failure.
    Application,
    /// Domain code signalled a data or integrity check failure.
    Assertion,
    /// Domain code signalled an intentionally unimplemented operation.
    NotImplemented,
}

impl ErrorKind {
    /// Every kind, in code order.
    pub const ALL: [Self; 8] = [
        Self::Parse,
        Self::InvalidRequest,
        Self::MethodNotFound,
        Self::InvalidParams,
        Self::Internal,
        Self::Application,
        Self::Assertion,
        Self::NotImplemented,
    ];

    /// Numeric code sent on the wire.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Parse => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::Internal => -32603,
            Self::Application => -32000,
            Self::Assertion => -32001,
            Self::NotImplemented => -32002,
        }
    }

    /// Standard message paired with the code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Parse => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::Internal => "Internal error",
            Self::Application => "Application error",
            Self::Assertion => "Assertion error",
            Self::NotImplemented => "Not Implemented",
        }
    }

    /// Maps a wire code back to its kind, if the code is part of the taxonomy.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            -32700 => Some(Self::Parse),
            -32600 => Some(Self::InvalidRequest),
            -32601 => Some(Self::MethodNotFound),
            -32602 => Some(Self::InvalidParams),
            -32603 => Some(Self::Internal),
            -32000 => Some(Self::Application),
            -32001 => Some(Self::Assertion),
            -32002 => Some(Self::NotImplemented),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.message())
    }
}

/// JSON-RPC error object: `{code, message, data?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message} ({code})")]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Short description of the error.
    pub message: String,
    /// Optional diagnostic detail supplied by the raiser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Builds an error of the given kind without diagnostic data.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            code: kind.code(),
            message: kind.message().to_owned(),
            data: None,
        }
    }

    /// Builds an error with a code and message outside the fixed taxonomy.
    #[must_use]
    pub fn custom(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches diagnostic data.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Kind matching this error's code, if any.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        ErrorKind::from_code(self.code)
    }

    /// Request text could not be parsed.
    #[must_use]
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse).with_data(detail.into())
    }

    /// Request object failed validation.
    #[must_use]
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest).with_data(detail.into())
    }

    /// No target matches `method`.
    #[must_use]
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotFound).with_data(method.into())
    }

    /// Arguments did not fit the target.
    #[must_use]
    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams).with_data(detail.into())
    }

    /// Unexpected failure during invocation.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_data(detail.into())
    }

    /// Business-level failure raised by domain code.
    #[must_use]
    pub fn application(data: impl Into<Value>) -> Self {
        Self::new(ErrorKind::Application).with_data(data)
    }

    /// Data or integrity check failure raised by domain code.
    #[must_use]
    pub fn assertion(data: impl Into<Value>) -> Self {
        Self::new(ErrorKind::Assertion).with_data(data)
    }

    /// Operation deliberately left unimplemented.
    #[must_use]
    pub fn not_implemented(data: impl Into<Value>) -> Self {
        Self::new(ErrorKind::NotImplemented).with_data(data)
    }
}

impl From<ErrorKind> for RpcError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Failure returned by a procedure.
#[derive(Debug, Error)]
pub enum CallError {
    /// Deliberate protocol error; sent to the client unchanged.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Arguments did not match the procedure's call shape.
    #[error("invalid call shape: {message}")]
    Shape {
        /// Description of the mismatch.
        message: String,
    },

    /// Any other failure; reported to the client as an internal error.
    #[error("{0}")]
    Failure(Box<dyn StdError + Send + Sync>),
}

impl CallError {
    /// Creates a call-shape mismatch.
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }

    /// Wraps an arbitrary failure.
    pub fn failure(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Failure(error.into())
    }

    /// Converts the failure into the error object sent to the client.
    #[must_use]
    pub fn into_rpc_error(self) -> RpcError {
        match self {
            Self::Rpc(error) => error,
            Self::Shape { message } => RpcError::invalid_params(message),
            Self::Failure(error) => RpcError::internal(error.to_string()),
        }
    }
}

/// Result returned by every procedure.
pub type CallResult = Result<Value, CallError>;
