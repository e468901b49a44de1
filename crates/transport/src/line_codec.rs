// SPDX-License-Identifier: MIT

//! Line-delimited JSON-RPC framing over any `AsyncRead`/`AsyncWrite` pair
//! (§4.2 C2). Each outbound JSON value is written as one line; each inbound
//! line is parsed and classified as a request, notification, or response.
//!
//! Grounded in the teacher's length-prefixed `oj-wire` framing for the
//! write-one-message-at-a-time discipline (a single writer lock serializes
//! concurrent senders) and in the Crucible ACP host's
//! `tokio::io::{AsyncBufReadExt, BufReader}` line-reading loop for the
//! read side — ACP itself is newline-delimited, not length-prefixed.

use crate::error::TransportError;
use crate::message::{
    IncomingMessage, OutgoingNotification, OutgoingRequest, OutgoingResponse, ResponsePayload,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};

/// Inbound traffic the transport can't resolve itself: requests and
/// notifications from the peer, plus lines that failed to parse.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Request {
        id: Value,
        method: String,
        params: Option<Value>,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
    ParseError {
        line: String,
        message: String,
    },
}

struct Pending {
    next_id: AtomicI64,
    waiters: AsyncMutex<HashMap<String, oneshot::Sender<ResponsePayload>>>,
}

/// Line-delimited JSON-RPC transport. Cheap to clone; clones share the
/// writer lock and the pending-request table.
#[derive(Clone)]
pub struct LineTransport<W> {
    writer: Arc<AsyncMutex<W>>,
    pending: Arc<Pending>,
    inbound: mpsc::UnboundedSender<InboundEvent>,
}

impl<W> LineTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps `writer`/`reader`, spawning a background task that reads lines
    /// from `reader` until EOF. Inbound requests/notifications/parse errors
    /// are delivered on the returned receiver; responses are matched against
    /// outstanding `request()` calls instead.
    pub fn spawn<R>(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<InboundEvent>)
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(Pending {
            next_id: AtomicI64::new(1),
            waiters: AsyncMutex::new(HashMap::new()),
        });
        let transport = Self {
            writer: Arc::new(AsyncMutex::new(writer)),
            pending: pending.clone(),
            inbound: tx.clone(),
        };

        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        Self::dispatch_line(&pending, &tx, line).await;
                    }
                    Ok(None) => break,
                    Err(err) => {
                        let _ = tx.send(InboundEvent::ParseError {
                            line: String::new(),
                            message: err.to_string(),
                        });
                        break;
                    }
                }
            }
        });

        (transport, rx)
    }

    async fn dispatch_line(
        pending: &Arc<Pending>,
        tx: &mpsc::UnboundedSender<InboundEvent>,
        line: String,
    ) {
        match IncomingMessage::parse(&line) {
            Ok(IncomingMessage::Request { id, method, params }) => {
                let _ = tx.send(InboundEvent::Request { id, method, params });
            }
            Ok(IncomingMessage::Notification { method, params }) => {
                let _ = tx.send(InboundEvent::Notification { method, params });
            }
            Ok(IncomingMessage::Response { id, payload }) => {
                let key = id_key(&id);
                if let Some(waiter) = pending.waiters.lock().await.remove(&key) {
                    let _ = waiter.send(payload);
                }
                // Responses to requests nobody is waiting on (timed out,
                // or a duplicate) are dropped silently.
            }
            Err(err) => {
                let _ = tx.send(InboundEvent::ParseError {
                    line,
                    message: err.to_string(),
                });
            }
        }
    }

    async fn write_line(&self, body: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        guard.write_all(body).await.map_err(TransportError::Write)?;
        guard.write_all(b"\n").await.map_err(TransportError::Write)?;
        guard.flush().await.map_err(TransportError::Write)
    }

    /// Sends a JSON-RPC request and waits for its matching response. The id
    /// is allocated internally; callers never need to track id reuse.
    pub async fn request(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> Result<ResponsePayload, TransportError> {
        let id = Value::from(self.pending.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        self.pending
            .waiters
            .lock()
            .await
            .insert(id_key(&id), tx);

        let request = OutgoingRequest::new(id.clone(), method, params);
        let body = serde_json::to_vec(&request).map_err(|_| TransportError::Closed)?;
        if let Err(err) = self.write_line(&body).await {
            self.pending.waiters.lock().await.remove(&id_key(&id));
            return Err(err);
        }

        rx.await.map_err(|_| TransportError::ChildExited)
    }

    pub async fn notify(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> Result<(), TransportError> {
        let notification = OutgoingNotification::new(method, params);
        let body = serde_json::to_vec(&notification).map_err(|_| TransportError::Closed)?;
        self.write_line(&body).await
    }

    pub async fn respond(&self, id: Value, result: Value) -> Result<(), TransportError> {
        let response = OutgoingResponse::ok(id, result);
        let body = serde_json::to_vec(&response).map_err(|_| TransportError::Closed)?;
        self.write_line(&body).await
    }

    pub async fn respond_error(
        &self,
        id: Value,
        code: i64,
        message: impl Into<String>,
    ) -> Result<(), TransportError> {
        let response = OutgoingResponse::err(id, code, message);
        let body = serde_json::to_vec(&response).map_err(|_| TransportError::Closed)?;
        self.write_line(&body).await
    }

    /// Fails every outstanding `request()` call, used when the child exits
    /// or the transport is torn down so waiters don't hang forever.
    pub async fn fail_all_pending(&self) {
        let mut waiters = self.pending.waiters.lock().await;
        for (_, waiter) in waiters.drain() {
            drop(waiter);
        }
    }
}

fn id_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
