// SPDX-License-Identifier: MIT

//! Agent Transport (§4.6 C7): pairs one Child Process Handle with one
//! line-delimited JSON-RPC transport, exposing `request`/`notify` and
//! `notification`/`request`/`stderr`/`stdout`/`exit` event streams.
//!
//! If no listener is attached to the `request` event by the time an
//! inbound agent request needs dispatching, the transport auto-replies
//! with JSON-RPC `-32601` so the agent never deadlocks waiting on a reply
//! — exactly spec.md §4.6's "Request-from-agent handling" rule.

use serde_json::Value;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use xpod_transport::{
    message::ResponsePayload, InboundEvent, LineTransport, SpawnConfig, TransportError,
    METHOD_NOT_FOUND,
};

/// A JSON-RPC request from the agent, awaiting exactly one of
/// [`PendingAgentRequest::respond`]/[`PendingAgentRequest::fail`].
pub struct PendingAgentRequest {
    id: Value,
    method: String,
    params: Option<Value>,
    transport: LineTransport<tokio::process::ChildStdin>,
    answered: Arc<AtomicBool>,
}

impl PendingAgentRequest {
    pub fn id(&self) -> &Value {
        &self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }

    pub async fn respond(self, result: Value) -> Result<(), TransportError> {
        self.answered.store(true, Ordering::SeqCst);
        self.transport.respond(self.id, result).await
    }

    pub async fn fail(self, code: i64, message: impl Into<String>) -> Result<(), TransportError> {
        self.answered.store(true, Ordering::SeqCst);
        self.transport.respond_error(self.id, code, message).await
    }
}

#[derive(Debug, Clone)]
pub enum AgentTransportEvent {
    Notification { method: String, params: Option<Value> },
    Stderr(String),
    Exit { code: Option<i32>, signal: Option<i32> },
}

/// One spawned agent subprocess wired up as an ACP peer.
pub struct AgentTransport {
    line_transport: LineTransport<tokio::process::ChildStdin>,
    events: mpsc::UnboundedReceiver<AgentTransportEvent>,
    /// Requests the agent has issued that need a caller-supplied answer.
    /// When nobody polls this, the background task auto-replies -32601.
    requests: mpsc::UnboundedReceiver<PendingAgentRequest>,
    stderr_tap: broadcast::Sender<String>,
    pid: u32,
}

impl AgentTransport {
    pub fn start(config: &SpawnConfig) -> Result<Self, TransportError> {
        let mut command = tokio::process::Command::new(&config.command);
        command.args(&config.args);
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }
        command.env("FORCE_COLOR", "0");
        for (key, value) in &config.env {
            match value {
                Some(v) => {
                    command.env(key, v);
                }
                None => {
                    command.env_remove(key);
                }
            }
        }
        command.stdin(Stdio::piped());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command.spawn().map_err(TransportError::Spawn)?;
        let pid = child.id().unwrap_or(0);
        let stdin = child.stdin.take().ok_or(TransportError::StdinClosed)?;
        let stdout = child.stdout.take().ok_or(TransportError::ChildExited)?;
        let stderr = child.stderr.take();

        let (line_transport, mut inbound) = LineTransport::spawn(stdin, stdout);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (stderr_tx, _) = broadcast::channel(256);

        if let Some(stderr) = stderr {
            let event_tx = event_tx.clone();
            let stderr_tx = stderr_tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let _ = stderr_tx.send(line.clone());
                    let _ = event_tx.send(AgentTransportEvent::Stderr(line));
                }
            });
        }

        {
            let line_transport = line_transport.clone();
            let event_tx = event_tx.clone();
            tokio::spawn(async move {
                while let Some(message) = inbound.recv().await {
                    match message {
                        InboundEvent::Notification { method, params } => {
                            let _ = event_tx.send(AgentTransportEvent::Notification { method, params });
                        }
                        InboundEvent::Request { id, method, params } => {
                            let answered = Arc::new(AtomicBool::new(false));
                            let pending = PendingAgentRequest {
                                id: id.clone(),
                                method,
                                params,
                                transport: line_transport.clone(),
                                answered: answered.clone(),
                            };
                            if request_tx.send(pending).is_err() {
                                // No one is listening at all: auto-reply immediately.
                                let _ = line_transport
                                    .respond_error(id, METHOD_NOT_FOUND, "Method not found")
                                    .await;
                                continue;
                            }
                            // Give a listener a brief window to claim it; if the
                            // receiver is simply not being polled, fall back to
                            // auto-reply so the agent never deadlocks.
                            let line_transport = line_transport.clone();
                            tokio::spawn(async move {
                                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                                if !answered.load(Ordering::SeqCst) {
                                    let _ = line_transport
                                        .respond_error(id, METHOD_NOT_FOUND, "Method not found")
                                        .await;
                                }
                            });
                        }
                        InboundEvent::ParseError { line, message } => {
                            tracing::debug!(%line, %message, "agent stdout parse error");
                        }
                    }
                }
            });
        }

        tokio::spawn(async move {
            let status = child.wait().await;
            let (code, signal) = match status {
                Ok(status) => (status.code(), unix_signal(&status)),
                Err(_) => (None, None),
            };
            let _ = event_tx.send(AgentTransportEvent::Exit { code, signal });
        });

        Ok(Self {
            line_transport,
            events: event_rx,
            requests: request_rx,
            stderr_tap: stderr_tx,
            pid,
        })
    }

    pub async fn request(&self, method: impl Into<String>, params: Option<Value>) -> Result<ResponsePayload, TransportError> {
        self.line_transport.request(method, params).await
    }

    pub async fn notify(&self, method: impl Into<String>, params: Option<Value>) -> Result<(), TransportError> {
        self.line_transport.notify(method, params).await
    }

    pub async fn next_event(&mut self) -> Option<AgentTransportEvent> {
        self.events.recv().await
    }

    /// Claims the next agent-originated request, if the auto-reply window
    /// hasn't already fired.
    pub async fn next_request(&mut self) -> Option<PendingAgentRequest> {
        self.requests.recv().await
    }

    pub fn subscribe_stderr(&self) -> broadcast::Receiver<String> {
        self.stderr_tap.subscribe()
    }

    pub async fn fail_all_pending(&self) {
        self.line_transport.fail_all_pending().await;
    }

    /// Splits the transport into a cheap, cloneable request/notify handle
    /// plus the two raw event streams. Lets a runtime own long-lived
    /// forwarder tasks for the streams while still issuing requests from
    /// anywhere through the handle.
    pub fn split(
        self,
    ) -> (
        AgentTransportHandle,
        mpsc::UnboundedReceiver<AgentTransportEvent>,
        mpsc::UnboundedReceiver<PendingAgentRequest>,
    ) {
        let handle = AgentTransportHandle {
            line_transport: self.line_transport,
            stderr_tap: self.stderr_tap,
            pid: self.pid,
        };
        (handle, self.events, self.requests)
    }
}

/// Cloneable request/notify surface detached from the raw event streams.
#[derive(Clone)]
pub struct AgentTransportHandle {
    line_transport: LineTransport<tokio::process::ChildStdin>,
    stderr_tap: broadcast::Sender<String>,
    pid: u32,
}

impl AgentTransportHandle {
    pub async fn request(&self, method: impl Into<String>, params: Option<Value>) -> Result<ResponsePayload, TransportError> {
        self.line_transport.request(method, params).await
    }

    pub async fn notify(&self, method: impl Into<String>, params: Option<Value>) -> Result<(), TransportError> {
        self.line_transport.notify(method, params).await
    }

    pub fn subscribe_stderr(&self) -> broadcast::Receiver<String> {
        self.stderr_tap.subscribe()
    }

    pub async fn fail_all_pending(&self) {
        self.line_transport.fail_all_pending().await;
    }

    /// Best-effort `SIGINT` to the agent process.
    pub fn stop(&self) -> Result<(), TransportError> {
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(self.pid as i32), nix::sys::signal::Signal::SIGINT)
            .map_err(|errno| TransportError::Signal(std::io::Error::from_raw_os_error(errno as i32)))
    }
}

#[cfg(unix)]
fn unix_signal(status: &std::process::ExitStatus) -> Option<i32> {
    std::os::unix::process::ExitStatusExt::signal(status)
}

#[cfg(not(unix))]
fn unix_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}
