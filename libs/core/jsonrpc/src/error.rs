use thiserror::Error;

use crate::protocol::{ErrorObject, error_codes};

/// Every failure the RPC pipeline can report to a client.
///
/// Each variant maps to exactly one JSON-RPC error code. `Internal` carries
/// diagnostic detail for the logs only; clients see a generic message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Streaming is not supported for method '{0}'")]
    StreamingNotSupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    pub fn code(&self) -> i32 {
        match self {
            RpcError::Parse(_) => error_codes::PARSE_ERROR,
            RpcError::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            RpcError::Unauthorized(_) => error_codes::UNAUTHORIZED,
            RpcError::RateLimited => error_codes::RATE_LIMITED,
            RpcError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            RpcError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            RpcError::StreamingNotSupported(_) => error_codes::STREAMING_NOT_SUPPORTED,
            RpcError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Message safe to hand to the client.
    pub fn client_message(&self) -> String {
        match self {
            RpcError::Unauthorized(reason) => reason.clone(),
            RpcError::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn to_error_object(&self) -> ErrorObject {
        if let RpcError::Internal(detail) = self {
            tracing::error!(detail = %detail, "Internal error while handling RPC request");
        }

        ErrorObject {
            code: self.code(),
            message: self.client_message(),
        }
    }
}
