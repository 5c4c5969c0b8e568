//! Server-sent-event transport for streamed RPC responses.
//!
//! A [`StreamSession`] owns the terminal write, [`StreamSink`] clones push partial
//! results, and [`EventStream`] is the response body handed to axum's `Sse`.
//! Writes go through a channel of capacity one, so a producer waits for the client
//! to take each event before it can queue the next.

use axum::response::sse::Event;
use futures::Stream;
use serde_json::Value;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::RpcError;
use crate::protocol::{RpcId, RpcResponse};

pub const PARTIAL_EVENT: &str = "partial";
pub const FINAL_EVENT: &str = "final";
pub const ERROR_EVENT: &str = "error";

struct Frame {
    event: Event,
    terminal: bool,
}

struct Shared {
    session_id: Uuid,
    request_id: RpcId,
    tx: mpsc::Sender<Frame>,
    closed: AtomicBool,
    cancel: CancellationToken,
}

impl Shared {
    fn is_writable(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.cancel.is_cancelled()
    }

    async fn write(&self, name: &'static str, response: &RpcResponse, terminal: bool) -> bool {
        let event = match Event::default().event(name).json_data(response) {
            Ok(event) => event,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Failed to encode stream event");
                return false;
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(Frame { event, terminal }) => sent.is_ok(),
        }
    }
}

/// One streamed response: open until exactly one terminal event has been written.
pub struct StreamSession {
    shared: Arc<Shared>,
}

/// Cloneable handle for pushing partial results into an open session.
#[derive(Clone)]
pub struct StreamSink {
    shared: Arc<Shared>,
}

/// SSE body. Ends after the terminal event; dropping it (client went away) cancels the session.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

impl StreamSession {
    pub fn open(request_id: RpcId) -> (StreamSession, StreamSink, EventStream) {
        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let shared = Arc::new(Shared {
            session_id: Uuid::new_v4(),
            request_id,
            tx,
            closed: AtomicBool::new(false),
            cancel: cancel.clone(),
        });
        debug!(session_id = %shared.session_id, "Stream session opened");

        let stream = event_stream(rx, cancel);

        (
            StreamSession {
                shared: shared.clone(),
            },
            StreamSink { shared },
            stream,
        )
    }

    pub fn session_id(&self) -> Uuid {
        self.shared.session_id
    }

    /// Token cancelled when the client disconnects.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Write the terminal success event. Returns `false` if nothing was written.
    pub async fn finish(self, result: Value) -> bool {
        let response = RpcResponse::success(self.shared.request_id.clone(), result);
        self.terminate(FINAL_EVENT, response).await
    }

    /// Write the terminal error event. Returns `false` if nothing was written.
    pub async fn fail(self, error: &RpcError) -> bool {
        let response = RpcResponse::error(self.shared.request_id.clone(), error);
        self.terminate(ERROR_EVENT, response).await
    }

    async fn terminate(self, name: &'static str, response: RpcResponse) -> bool {
        if !self.shared.is_writable() {
            debug!(session_id = %self.shared.session_id, "Session already cancelled, dropping terminal event");
            return false;
        }
        self.shared.closed.store(true, Ordering::Release);
        let written = self.shared.write(name, &response, true).await;
        debug!(session_id = %self.shared.session_id, event = name, written, "Stream session closed");
        written
    }
}

impl StreamSink {
    /// Push one partial result. Object results get `"partial": true` added.
    ///
    /// Returns `false` once the session is closed or cancelled; callers should stop producing.
    pub async fn send_partial(&self, mut result: Value) -> bool {
        if !self.shared.is_writable() {
            return false;
        }
        if let Value::Object(map) = &mut result {
            map.insert("partial".to_string(), Value::Bool(true));
        }
        let response = RpcResponse::success(self.shared.request_id.clone(), result);
        self.shared.write(PARTIAL_EVENT, &response, false).await
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub fn session_id(&self) -> Uuid {
        self.shared.session_id
    }
}

fn event_stream(mut rx: mpsc::Receiver<Frame>, cancel: CancellationToken) -> EventStream {
    let cancel_on_drop = cancel.drop_guard();

    Box::pin(async_stream::stream! {
        let _cancel_on_drop = cancel_on_drop;

        while let Some(frame) = rx.recv().await {
            let terminal = frame.terminal;
            yield Ok::<_, Infallible>(frame.event);
            if terminal {
                break;
            }
        }
    })
}
