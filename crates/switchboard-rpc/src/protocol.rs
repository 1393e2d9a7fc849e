//! JSON-RPC 2.0 envelopes.
//!
//! A request without an `id` member is a notification. An explicit `"id":
//! null` is answered like any other id.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RpcError;
use crate::params::Params;

/// Protocol version accepted and emitted.
pub const JSONRPC_VERSION: &str = "2.0";

/// A validated request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Dot-separated method name.
    pub method: String,
    /// Call arguments.
    pub params: Params,
    /// Request id; `None` marks a notification.
    pub id: Option<Value>,
}

/// A request that failed before dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Error to report.
    pub error: RpcError,
    /// Id to echo; `None` when the request was a notification.
    pub id: Option<Value>,
}

impl Rejection {
    fn unanswerable(error: RpcError) -> Self {
        Self {
            error,
            id: Some(Value::Null),
        }
    }
}

impl Request {
    /// Parses and validates request text.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] carrying a parse error for invalid JSON and an
    /// invalid-request error for objects that are not JSON-RPC 2.0 requests.
    /// Rejections for payloads that never yielded an id carry `null`.
    pub fn parse(text: &str) -> Result<Self, Rejection> {
        let value: Value = serde_json::from_str(text)
            .map_err(|error| Rejection::unanswerable(RpcError::parse_error(error.to_string())))?;
        let Value::Object(object) = value else {
            return Err(Rejection::unanswerable(RpcError::invalid_request(
                "request must be a JSON object",
            )));
        };
        Self::from_object(object)
    }

    fn from_object(mut object: Map<String, Value>) -> Result<Self, Rejection> {
        let id = object.remove("id");
        let reject = |detail: &str| Rejection {
            error: RpcError::invalid_request(detail),
            id: id.clone(),
        };

        let missing: Vec<&str> = ["jsonrpc", "method"]
            .into_iter()
            .filter(|member| !object.contains_key(*member))
            .collect();
        if !missing.is_empty() {
            return Err(reject(&format!(
                "Required members ({}) missing from request",
                missing.join(", ")
            )));
        }
        if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(reject("service only supports JSON-RPC 2.0"));
        }
        let method = match object.remove("method") {
            Some(Value::String(method)) if !method.is_empty() => method,
            _ => return Err(reject("method must be a non-empty string")),
        };
        let params = Params::from_member(object.remove("params")).map_err(|error| Rejection {
            error,
            id: id.clone(),
        })?;

        Ok(Self { method, params, id })
    }

    /// Returns `true` when no response may be sent.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Result or error carried by a [`Response`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Successful call.
    Result(Value),
    /// Failed call.
    Error(RpcError),
}

/// A response envelope. Exactly one of `result` or `error` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Call outcome.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Echo of the request id.
    pub id: Value,
}

impl Response {
    /// Success response.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self::new(id, Outcome::Result(result))
    }

    /// Error response.
    #[must_use]
    pub fn failure(id: Value, error: RpcError) -> Self {
        Self::new(id, Outcome::Error(error))
    }

    fn new(id: Value, outcome: Outcome) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            outcome,
            id,
        }
    }

    /// Encodes the response. If encoding fails, a fixed internal-error
    /// payload is produced instead.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|error| encoding_failure(&error.to_string(), &self.id))
    }
}

/// Literal response used when a response cannot be encoded.
pub(crate) fn encoding_failure(detail: &str, id: &Value) -> String {
    let detail = serde_json::to_string(&format!("Result encoding failed: {detail}"))
        .unwrap_or_else(|_| String::from("\"Result encoding failed\""));
    let id = serde_json::to_string(id).unwrap_or_else(|_| String::from("null"));
    format!(
        r#"{{"jsonrpc": "2.0", "error": {{"code": -32603, "message": "Internal error.", "data": {detail}}}, "id": {id}}}"#
    )
}
