//! The RPC request pipeline.
//!
//! `Received → Validated → Authenticated → Routed → {Completed | Streaming} → Closed`
//!
//! Every failure up to and including routing is answered as a buffered JSON
//! envelope, even when the client asked for an event stream. Only a request that
//! has been fully routed can open a stream.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{KeepAlive, Sse},
    },
    routing::post,
};
use axum_helpers::errors::handlers::method_not_allowed;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, Span, debug, info, info_span, warn};
use uuid::Uuid;

use crate::auth::{AuthOutcome, Authenticator, Principal};
use crate::error::RpcError;
use crate::protocol::{RpcId, RpcRequest, RpcResponse};
use crate::rate_limit::KeyedRateLimiter;
use crate::router::MethodRouter;
use crate::stream::StreamSession;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const EVENT_STREAM_MEDIA_TYPE: &str = "text/event-stream";

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct RpcSettings {
    /// Skip authentication entirely. Never enable outside local development.
    pub dev_mode: bool,
    /// Deadline for one dispatch, streamed or buffered
    pub request_timeout: Duration,
    /// Requests per minute per credential; 0 disables the limit
    pub rate_limit_per_minute: u32,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            dev_mode: false,
            request_timeout: Duration::from_secs(30),
            rate_limit_per_minute: 0,
        }
    }
}

/// Shared state for the RPC endpoint.
pub struct RpcState<R: MethodRouter> {
    router: Arc<R>,
    authenticator: Arc<dyn Authenticator>,
    limiter: Option<Arc<KeyedRateLimiter>>,
    settings: RpcSettings,
}

impl<R: MethodRouter> Clone for RpcState<R> {
    fn clone(&self) -> Self {
        Self {
            router: self.router.clone(),
            authenticator: self.authenticator.clone(),
            limiter: self.limiter.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<R: MethodRouter> RpcState<R> {
    pub fn new(router: Arc<R>, authenticator: Arc<dyn Authenticator>, settings: RpcSettings) -> Self {
        if settings.dev_mode {
            warn!("RPC authentication is disabled (development mode)");
        }
        let limiter = KeyedRateLimiter::per_minute(settings.rate_limit_per_minute).map(Arc::new);

        Self {
            router,
            authenticator,
            limiter,
            settings,
        }
    }

    pub fn router(&self) -> &Arc<R> {
        &self.router
    }

    pub fn rate_limiter(&self) -> Option<&Arc<KeyedRateLimiter>> {
        self.limiter.as_ref()
    }
}

/// Mounts the RPC endpoint at `path`: POST dispatches, OPTIONS answers 204, anything else 405.
pub fn rpc_routes<R: MethodRouter>(path: &str, state: RpcState<R>) -> Router {
    Router::new()
        .route(
            path,
            post(handle_rpc::<R>)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .with_state(state)
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    Received,
    Validated,
    Authenticated,
    Routed,
    Completed,
    Streaming,
}

/// Tracks the request state and logs `Closed` when dropped, whatever path ended the request.
struct Lifecycle {
    state: RequestState,
}

impl Lifecycle {
    fn new() -> Self {
        debug!(state = ?RequestState::Received, "request state");
        Self {
            state: RequestState::Received,
        }
    }

    fn advance(&mut self, next: RequestState) {
        debug!(from = ?self.state, to = ?next, "request state");
        self.state = next;
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        debug!(from = ?self.state, to = "Closed", "request state");
    }
}

/// POST handler for the RPC path.
pub async fn handle_rpc<R: MethodRouter>(
    State(state): State<RpcState<R>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!(
        "rpc",
        %request_id,
        method = tracing::field::Empty,
        key_id = tracing::field::Empty
    );

    process(state, headers, body).instrument(span).await
}

async fn process<R: MethodRouter>(state: RpcState<R>, headers: HeaderMap, body: Bytes) -> Response {
    let mut lifecycle = Lifecycle::new();

    let request = match RpcRequest::parse(&body) {
        Ok(request) => request,
        Err(rejection) => {
            debug!(error = %rejection.error, "Rejected request envelope");
            return json_response(rejection.into_response());
        }
    };
    let RpcRequest { id, method, params } = request;
    Span::current().record("method", method.as_str());
    lifecycle.advance(RequestState::Validated);

    let streaming = wants_event_stream(&headers);

    let principal = if state.settings.dev_mode {
        Principal::development()
    } else {
        match state.authenticator.validate(presented_token(&headers)).await {
            AuthOutcome::Valid(principal) => principal,
            AuthOutcome::Invalid { reason } => {
                info!(%reason, "Authentication failed");
                return error_response(id, RpcError::Unauthorized(reason));
            }
        }
    };
    Span::current().record("key_id", principal.key_id.as_str());
    lifecycle.advance(RequestState::Authenticated);

    let Some(descriptor) = state.router.describe(&method) else {
        return error_response(id, RpcError::MethodNotFound(method));
    };
    if !principal.has_permission(descriptor.permission) {
        info!(permission = descriptor.permission, "Permission denied");
        return error_response(
            id,
            RpcError::Unauthorized(format!(
                "API key lacks the '{}' permission",
                descriptor.permission
            )),
        );
    }

    if let Some(limiter) = &state.limiter {
        if !limiter.check(&principal.key_id) {
            info!("Rate limit exceeded");
            return error_response(id, RpcError::RateLimited);
        }
    }

    let call = match state.router.route(&method, params, streaming) {
        Ok(call) => call,
        Err(e) => return error_response(id, e),
    };
    lifecycle.advance(RequestState::Routed);

    let timeout = state.settings.request_timeout;

    if streaming {
        let (session, sink, events) = StreamSession::open(id);
        let cancel = session.cancellation_token();
        let router = state.router.clone();
        lifecycle.advance(RequestState::Streaming);
        debug!(session_id = %session.session_id(), "Streaming response");

        tokio::spawn(
            async move {
                // the driver owns the lifecycle so Closed is logged when the stream ends
                let _lifecycle = lifecycle;
                let outcome = tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Client disconnected, abandoning dispatch");
                        return;
                    }
                    outcome = with_deadline(timeout, router.invoke(call, Some(sink))) => outcome,
                };

                match outcome {
                    Ok(result) => session.finish(result).await,
                    Err(e) => session.fail(&e).await,
                };
            }
            .in_current_span(),
        );

        return Sse::new(events)
            .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
            .into_response();
    }

    let outcome = with_deadline(timeout, state.router.invoke(call, None)).await;
    lifecycle.advance(RequestState::Completed);

    match outcome {
        Ok(result) => json_response(RpcResponse::success(id, result)),
        Err(e) => error_response(id, e),
    }
}

async fn with_deadline<F>(timeout: Duration, dispatch: F) -> Result<Value, RpcError>
where
    F: Future<Output = Result<Value, RpcError>>,
{
    tokio::time::timeout(timeout, dispatch)
        .await
        .unwrap_or_else(|_| {
            Err(RpcError::Internal(format!(
                "dispatch exceeded deadline of {:?}",
                timeout
            )))
        })
}

fn json_response(response: RpcResponse) -> Response {
    (StatusCode::OK, Json(response)).into_response()
}

fn error_response(id: RpcId, error: RpcError) -> Response {
    json_response(RpcResponse::error(id, &error))
}

/// `true` when any `Accept` header lists `text/event-stream`.
pub fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains(EVENT_STREAM_MEDIA_TYPE))
}

/// Token from `x-api-key`, falling back to `Authorization: Bearer <token>`.
pub fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    api_key.or_else(|| {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.trim().split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_presented_token_prefers_api_key_header() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("cg_live_1"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer other"));
        assert_eq!(presented_token(&headers), Some("cg_live_1"));
    }

    #[test]
    fn test_presented_token_bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer  tok "));
        assert_eq!(presented_token(&headers), Some("tok"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(presented_token(&headers), None);
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("  "));
        assert_eq!(presented_token(&headers), None);
    }

    #[test]
    fn test_wants_event_stream() {
        let mut headers = HeaderMap::new();
        assert!(!wants_event_stream(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json, text/event-stream"));
        assert!(wants_event_stream(&headers));
    }
}
