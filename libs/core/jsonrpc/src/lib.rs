//! JSON-RPC 2.0 over HTTP with optional server-sent-event responses.
//!
//! The crate owns the protocol pipeline and leaves the domain behind two seams:
//! [`Authenticator`] decides who is calling, [`MethodRouter`] decides what a
//! method name means.
//!
//! ```ignore
//! let state = RpcState::new(Arc::new(router), Arc::new(authenticator), RpcSettings::default());
//! let app = jsonrpc::rpc_routes("/rpc", state);
//! ```

pub mod auth;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod rate_limit;
pub mod router;
pub mod stream;

pub use auth::{AuthOutcome, Authenticator, Principal, WILDCARD_PERMISSION};
pub use error::RpcError;
pub use handler::{RpcSettings, RpcState, handle_rpc, rpc_routes};
pub use protocol::{
    ErrorObject, JSONRPC_VERSION, Outcome, RpcId, RpcRequest, RpcResponse, error_codes,
};
pub use rate_limit::KeyedRateLimiter;
pub use router::{MethodDescriptor, MethodRouter};
pub use stream::{StreamSession, StreamSink};
