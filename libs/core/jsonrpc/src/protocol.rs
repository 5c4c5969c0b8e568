//! JSON-RPC 2.0 envelope types and request validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RpcError;

pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC error codes, standard range plus gateway-specific ones.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    pub const UNAUTHORIZED: i32 = -32001;
    pub const RATE_LIMITED: i32 = -32002;
    pub const STREAMING_NOT_SUPPORTED: i32 = -32003;
}

/// Request correlation id.
///
/// Numbers keep their original representation (`7` stays `7`, `7.0` stays `7.0`).
/// `Null` is used when the request carried no id or could not be read far enough to find one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(serde_json::Number),
    String(String),
    Null,
}

impl From<&str> for RpcId {
    fn from(value: &str) -> Self {
        RpcId::String(value.to_string())
    }
}

impl From<i64> for RpcId {
    fn from(value: i64) -> Self {
        RpcId::Number(value.into())
    }
}

/// A request that passed envelope validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub id: RpcId,
    pub method: String,
    pub params: Option<Map<String, Value>>,
}

/// An envelope violation together with the id to echo back.
#[derive(Debug)]
pub struct Rejection {
    pub id: RpcId,
    pub error: RpcError,
}

impl Rejection {
    fn new(id: RpcId, error: RpcError) -> Self {
        Self { id, error }
    }

    pub fn into_response(self) -> RpcResponse {
        RpcResponse::error(self.id, &self.error)
    }
}

impl RpcRequest {
    /// Parse and validate a raw request body.
    ///
    /// Checks run in a fixed order: JSON syntax, single object, `id` type,
    /// `jsonrpc` version, `method`, `params`. Once `id` has been read it is echoed
    /// in every later rejection.
    pub fn parse(body: &[u8]) -> Result<Self, Rejection> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| Rejection::new(RpcId::Null, RpcError::Parse(e.to_string())))?;

        let mut envelope = match value {
            Value::Object(map) => map,
            Value::Array(_) => {
                return Err(Rejection::new(
                    RpcId::Null,
                    RpcError::InvalidRequest("batch requests are not supported".to_string()),
                ));
            }
            _ => {
                return Err(Rejection::new(
                    RpcId::Null,
                    RpcError::InvalidRequest("request must be a JSON object".to_string()),
                ));
            }
        };

        let id = match envelope.remove("id") {
            None => RpcId::Null,
            Some(Value::String(s)) => RpcId::String(s),
            Some(Value::Number(n)) => RpcId::Number(n),
            Some(_) => {
                return Err(Rejection::new(
                    RpcId::Null,
                    RpcError::InvalidRequest("id must be a string or a number".to_string()),
                ));
            }
        };

        match envelope.get("jsonrpc") {
            Some(Value::String(v)) if v == JSONRPC_VERSION => {}
            _ => {
                return Err(Rejection::new(
                    id,
                    RpcError::InvalidRequest(format!("jsonrpc must be \"{}\"", JSONRPC_VERSION)),
                ));
            }
        }

        let method = match envelope.remove("method") {
            Some(Value::String(m)) if !m.trim().is_empty() => m,
            _ => {
                return Err(Rejection::new(
                    id,
                    RpcError::InvalidRequest("method must be a non-empty string".to_string()),
                ));
            }
        };

        let params = match envelope.remove("params") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                return Err(Rejection::new(
                    id,
                    RpcError::InvalidRequest("params must be an object".to_string()),
                ));
            }
        };

        Ok(Self { id, method, params })
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
}

/// Exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(ErrorObject),
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub id: RpcId,
}

impl RpcResponse {
    pub fn success(id: RpcId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            outcome: Outcome::Result(result),
            id,
        }
    }

    /// Error envelope. Internal detail is logged here and replaced with a generic message.
    pub fn error(id: RpcId, error: &RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            outcome: Outcome::Error(error.to_error_object()),
            id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }
}
