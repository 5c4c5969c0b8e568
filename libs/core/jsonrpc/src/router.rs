use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RpcError;
use crate::stream::StreamSink;

/// Static description of one callable method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Permission a principal must hold to call the method
    pub permission: &'static str,
    pub supports_streaming: bool,
}

/// Maps method names onto validated, ready-to-run calls.
///
/// Routing is split from invocation so that every validation failure is known
/// before the pipeline commits to a streamed response.
#[async_trait]
pub trait MethodRouter: Send + Sync + 'static {
    /// A fully validated invocation.
    type Call: Send + 'static;

    /// The static method table.
    fn methods(&self) -> &[MethodDescriptor];

    fn describe(&self, method: &str) -> Option<&MethodDescriptor> {
        self.methods().iter().find(|m| m.name == method)
    }

    /// Resolve `method` and validate `params`.
    ///
    /// Fails with `MethodNotFound`, then `StreamingNotSupported` when `streaming`
    /// is requested of a method that cannot stream, then `InvalidParams`.
    fn route(
        &self,
        method: &str,
        params: Option<Map<String, Value>>,
        streaming: bool,
    ) -> Result<Self::Call, RpcError>;

    /// Run a routed call. With a sink, partial results may be pushed before the
    /// returned value, which becomes the terminal event.
    async fn invoke(&self, call: Self::Call, sink: Option<StreamSink>) -> Result<Value, RpcError>;
}
