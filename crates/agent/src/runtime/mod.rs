// SPDX-License-Identifier: MIT

//! Per-thread agent runtime (§4.7): the heart of the core. Owns one live
//! agent child per `threadId`, negotiates its session once, and serializes
//! user turns through a single-job-at-a-time pump while streaming output
//! back through a [`PushQueue`].

pub mod config;
pub mod env_isolation;
pub mod extraction;
pub mod handshake;
pub mod worktree;

use crate::error::{RuntimeError, StartupError};
use crate::transport::{AgentTransport, AgentTransportEvent, AgentTransportHandle, PendingAgentRequest};
use config::ThreadConfig;
use parking_lot::Mutex as SyncMutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex as AsyncMutex};
use tokio::time::Instant;
use xpod_core::{OutputEvent, PushQueue, ThreadId};
use xpod_transport::SpawnConfig;

const AUTO_ACK_METHODS: &[&str] = &["session/request_permission", "auth/request", "auth/authorize"];
const URL_KEYS: &[&str] = &[
    "url",
    "authorizationUrl",
    "authorization_url",
    "authUrl",
    "auth_url",
    "browserUrl",
    "browser_url",
    "verificationUri",
    "verification_uri",
    "verificationUrl",
];
const OPTIONS_KEYS: &[&str] = &["methods", "options", "authMethods", "auth_methods"];
const MAX_ERROR_DATA_MESSAGE: usize = 800;

enum Job {
    SendMessage {
        text: String,
        output: PushQueue<OutputEvent>,
    },
    RespondToRequest {
        request_id: String,
        output: String,
        output_queue: PushQueue<OutputEvent>,
    },
}

struct ThreadEntry {
    handle: AgentTransportHandle,
    session_id: String,
    config: ThreadConfig,
    events: broadcast::Sender<AgentTransportEvent>,
    current_request_sink: SyncMutex<Option<mpsc::UnboundedSender<PendingAgentRequest>>>,
    pending_requests: AsyncMutex<HashMap<String, PendingAgentRequest>>,
    jobs_tx: mpsc::UnboundedSender<Job>,
    alive: AtomicBool,
}

/// State returned by `ensureStarted` once a thread's agent is live.
#[derive(Debug, Clone)]
pub struct ThreadState {
    pub session_id: String,
}

/// Owns every live agent thread. One instance per process; the thread map is
/// the single point of truth for "is this thread running."
#[derive(Clone, Default)]
pub struct AgentRuntime {
    threads: Arc<SyncMutex<HashMap<ThreadId, Arc<ThreadEntry>>>>,
}

impl AgentRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self, thread_id: &ThreadId) -> bool {
        self.threads
            .lock()
            .get(thread_id)
            .map(|entry| entry.alive.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Idempotent: returns the existing state if the thread is already live.
    pub async fn ensure_started(
        &self,
        thread_id: ThreadId,
        config: ThreadConfig,
    ) -> Result<ThreadState, StartupError> {
        if let Some(entry) = self.threads.lock().get(&thread_id) {
            return Ok(ThreadState {
                session_id: entry.session_id.clone(),
            });
        }

        config.runner.validate().map_err(StartupError::Config)?;
        let workdir = worktree::resolve_workdir(&config.workspace, &thread_id)
            .await
            .map_err(StartupError::Config)?;

        let runner_kind = config.runner.kind;
        let home = env_isolation::isolated_home_dir(runner_kind, &thread_id, &workdir);
        let overlay = env_isolation::build_env_overlay(runner_kind, &home, config.agent_config.as_ref())
            .map_err(crate::error::ConfigError::EnvSetup)
            .map_err(StartupError::Config)?;

        let argv = config.runner.resolved_argv();
        let (command, args) = argv
            .split_first()
            .map(|(cmd, rest)| (cmd.clone(), rest.to_vec()))
            .ok_or_else(|| StartupError::Config(crate::error::ConfigError::MissingRootPath(workdir.clone())))?;

        let spawn_config = SpawnConfig {
            command,
            args,
            working_dir: Some(workdir.clone()),
            env: overlay,
        };

        let transport = AgentTransport::start(&spawn_config).map_err(StartupError::Spawn)?;
        handshake::initialize(&transport).await?;
        let session_id = handshake::new_session(&transport, &workdir, config.agent_config.as_ref()).await?;

        let (handle, events_rx, requests_rx) = transport.split();
        let (events_tx, _) = broadcast::channel(1024);
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();

        let entry = Arc::new(ThreadEntry {
            handle,
            session_id: session_id.clone(),
            config,
            events: events_tx.clone(),
            current_request_sink: SyncMutex::new(None),
            pending_requests: AsyncMutex::new(HashMap::new()),
            jobs_tx,
            alive: AtomicBool::new(true),
        });

        self.threads.lock().insert(thread_id.clone(), entry.clone());

        spawn_event_forwarder(self.threads.clone(), thread_id.clone(), entry.clone(), events_rx);
        spawn_request_forwarder(entry.clone(), requests_rx);
        spawn_job_pump(entry.clone(), jobs_rx);

        Ok(ThreadState { session_id })
    }

    /// Best-effort `SIGINT`; the thread entry stays until the child's
    /// `exit` event is observed by the event forwarder.
    pub fn stop(&self, thread_id: &ThreadId) -> Result<(), RuntimeError> {
        let entry = self
            .threads
            .lock()
            .get(thread_id)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownThread(thread_id.clone()))?;
        let _ = entry.handle.stop();
        Ok(())
    }

    pub fn send_message(
        &self,
        thread_id: &ThreadId,
        text: impl Into<String>,
    ) -> Result<PushQueue<OutputEvent>, RuntimeError> {
        let entry = self
            .threads
            .lock()
            .get(thread_id)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownThread(thread_id.clone()))?;
        let output = PushQueue::new();
        let _ = entry.jobs_tx.send(Job::SendMessage {
            text: text.into(),
            output: output.clone(),
        });
        Ok(output)
    }

    pub async fn respond_to_request(
        &self,
        thread_id: &ThreadId,
        request_id: impl Into<String>,
        output: impl Into<String>,
    ) -> Result<PushQueue<OutputEvent>, RuntimeError> {
        let request_id = request_id.into();
        let entry = self
            .threads
            .lock()
            .get(thread_id)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownThread(thread_id.clone()))?;
        if !entry.pending_requests.lock().await.contains_key(&request_id) {
            return Err(RuntimeError::UnknownPendingRequest {
                thread_id: thread_id.clone(),
                request_id,
            });
        }
        let output_queue = PushQueue::new();
        let _ = entry.jobs_tx.send(Job::RespondToRequest {
            request_id,
            output: output.into(),
            output_queue: output_queue.clone(),
        });
        Ok(output_queue)
    }
}

/// Owns the raw event stream for the lifetime of the thread: re-broadcasts
/// every event to whichever job is currently listening, and on `Exit`
/// performs the cleanup in §4.7.10 — reject pending transport requests,
/// drop tool-call entries, remove the thread from the map.
fn spawn_event_forwarder(
    threads: Arc<SyncMutex<HashMap<ThreadId, Arc<ThreadEntry>>>>,
    thread_id: ThreadId,
    entry: Arc<ThreadEntry>,
    mut events_rx: mpsc::UnboundedReceiver<AgentTransportEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let is_exit = matches!(event, AgentTransportEvent::Exit { .. });
            let _ = entry.events.send(event);
            if is_exit {
                entry.alive.store(false, Ordering::Release);
                entry.handle.fail_all_pending().await;
                entry.pending_requests.lock().await.clear();
                threads.lock().remove(&thread_id);
                break;
            }
        }
    });
}

/// Owns the raw request stream: forwards each agent-originated request to
/// whichever job currently registered a sink, or lets it fall through to
/// the transport's own auto-reply timeout when no job is listening.
fn spawn_request_forwarder(entry: Arc<ThreadEntry>, mut requests_rx: mpsc::UnboundedReceiver<PendingAgentRequest>) {
    tokio::spawn(async move {
        while let Some(request) = requests_rx.recv().await {
            let sink = entry.current_request_sink.lock().clone();
            if let Some(sink) = sink {
                let _ = sink.send(request);
            }
            // No active job: drop it, the transport's own grace-window
            // timer auto-replies -32601.
        }
    });
}

/// The job pump (§4.7.7): one permanent task per thread draining jobs
/// strictly one at a time. This is the serialization law's implementation —
/// equivalent in observable behavior to "launch on enqueue, no-op while
/// already running," just without the lazy-spawn bookkeeping.
fn spawn_job_pump(entry: Arc<ThreadEntry>, mut jobs_rx: mpsc::UnboundedReceiver<Job>) {
    tokio::spawn(async move {
        while let Some(job) = jobs_rx.recv().await {
            run_job(entry.clone(), job).await;
        }
    });
}

async fn run_job(entry: Arc<ThreadEntry>, job: Job) {
    let (output, kind) = match job {
        Job::SendMessage { text, output } => (output, JobKind::SendMessage { text }),
        Job::RespondToRequest {
            request_id,
            output,
            output_queue,
        } => (output_queue, JobKind::RespondToRequest { request_id, output }),
    };

    let (request_tx, mut request_rx) = mpsc::unbounded_channel();
    *entry.current_request_sink.lock() = Some(request_tx);
    let mut events_rx = entry.events.subscribe();

    let idle_ms = entry.config.idle_ms.max(1);
    let auth_wait_ms = entry.config.effective_auth_wait_ms();
    let mut deadline = Instant::now() + Duration::from_millis(idle_ms);

    let mut prompt_rx = match kind {
        JobKind::SendMessage { text } => Some(issue_prompt(&entry, text)),
        JobKind::RespondToRequest { request_id, output: raw_output } => {
            answer_pending_request(&entry, &request_id, &raw_output).await;
            None
        }
    };

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                break;
            }
            event = events_rx.recv() => {
                match event {
                    Ok(AgentTransportEvent::Notification { method, params }) if method == "session/update" => {
                        if notification_matches_session(&params, &entry.session_id) {
                            let update = params
                                .as_ref()
                                .and_then(|p| p.get("update"))
                                .cloned()
                                .unwrap_or(Value::Null);
                            if let Some(delta) = extraction::extract_text_delta(&update) {
                                output.push(OutputEvent::text(delta));
                                deadline = Instant::now() + Duration::from_millis(idle_ms);
                            }
                        }
                    }
                    Ok(AgentTransportEvent::Notification { .. }) => {}
                    Ok(AgentTransportEvent::Stderr(_)) => {}
                    Ok(AgentTransportEvent::Exit { .. }) => {
                        output.push(OutputEvent::error("agent process exited"));
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            Some(request) = request_rx.recv() => {
                if handle_agent_request(&entry, &output, request, idle_ms, auth_wait_ms, &mut deadline).await {
                    break;
                }
            }
            result = poll_prompt(&mut prompt_rx) => {
                if let Some(result) = result {
                    handle_prompt_result(&output, result);
                    prompt_rx = None;
                }
            }
        }
    }

    *entry.current_request_sink.lock() = None;
    output.close();
}

enum JobKind {
    SendMessage { text: String },
    RespondToRequest { request_id: String, output: String },
}

/// Sends `session/prompt` without awaiting inline; the response is raced
/// against notification/idle events in the job loop's `select!`.
fn issue_prompt(entry: &Arc<ThreadEntry>, text: String) -> tokio::sync::oneshot::Receiver<xpod_transport::message::ResponsePayload> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    let handle = entry.handle.clone();
    let session_id = entry.session_id.clone();
    tokio::spawn(async move {
        let params = json!({
            "sessionId": session_id,
            "prompt": [{ "type": "text", "text": text }],
        });
        if let Ok(result) = handle.request("session/prompt", Some(params)).await {
            let _ = tx.send(result);
        }
    });
    rx
}

async fn poll_prompt(
    rx: &mut Option<tokio::sync::oneshot::Receiver<xpod_transport::message::ResponsePayload>>,
) -> Option<xpod_transport::message::ResponsePayload> {
    match rx {
        Some(receiver) => receiver.await.ok(),
        None => std::future::pending().await,
    }
}

fn handle_prompt_result(output: &PushQueue<OutputEvent>, result: xpod_transport::message::ResponsePayload) {
    use xpod_transport::message::ResponsePayload;
    match result {
        ResponsePayload::Result { result } => {
            if let Some(delta) = extraction::extract_text_delta(&result) {
                output.push(OutputEvent::text(delta));
            }
        }
        ResponsePayload::Error { error } => {
            let mut message = error.message.clone();
            if let Some(data_message) = error.data.as_ref().and_then(|d| d.get("message")).and_then(Value::as_str) {
                let truncated: String = data_message.chars().take(MAX_ERROR_DATA_MESSAGE).collect();
                message = format!("{truncated}: {message}");
            }
            output.push(OutputEvent::error(message));
        }
    }
}

fn notification_matches_session(params: &Option<Value>, session_id: &str) -> bool {
    match params {
        Some(value) => match value.get("sessionId").or_else(|| value.get("session_id")) {
            Some(Value::String(s)) => s == session_id,
            // Agents that omit the session id on single-session transports
            // are treated as addressing the only live session.
            None => true,
            _ => false,
        },
        None => true,
    }
}

/// Handles one agent-originated request within a job. Returns `true` if the
/// job should finish immediately (the tool-call case: the caller must issue
/// `respondToRequest` on a fresh stream).
async fn handle_agent_request(
    entry: &Arc<ThreadEntry>,
    output: &PushQueue<OutputEvent>,
    request: PendingAgentRequest,
    idle_ms: u64,
    auth_wait_ms: u64,
    deadline: &mut Instant,
) -> bool {
    let method = request_method(&request);
    if AUTO_ACK_METHODS.contains(&method.as_str()) {
        let params = request_params(&request);
        let url = find_first_url(&params);
        let options = find_options(&params);
        let message = params
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        output.push(OutputEvent::AuthRequired {
            method: method.clone(),
            url,
            message,
            options,
        });
        *deadline = Instant::now() + Duration::from_millis(auth_wait_ms.max(idle_ms));
        let ack = if method == "session/request_permission" {
            json!({ "granted": true })
        } else {
            json!({ "handled": true })
        };
        let _ = request.respond(ack).await;
        false
    } else {
        let request_id = format!("acp:{}", value_to_key(request.id()));
        let params = request_params(&request);
        entry
            .pending_requests
            .lock()
            .await
            .insert(request_id.clone(), request);
        output.push(OutputEvent::tool_call(Value::String(request_id), method, &params));
        true
    }
}

async fn answer_pending_request(entry: &Arc<ThreadEntry>, request_id: &str, raw_output: &str) {
    let pending = entry.pending_requests.lock().await.remove(request_id);
    if let Some(pending) = pending {
        let value: Value = serde_json::from_str(raw_output).unwrap_or_else(|_| Value::String(raw_output.to_string()));
        let _ = pending.respond(value).await;
    }
}

fn request_method(request: &PendingAgentRequest) -> String {
    request.method().to_string()
}

fn request_params(request: &PendingAgentRequest) -> Value {
    request.params().cloned().unwrap_or(Value::Null)
}

fn value_to_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn find_first_url(params: &Value) -> Option<String> {
    for key in URL_KEYS {
        if let Some(s) = params.get(key).and_then(Value::as_str) {
            if s.starts_with("http") {
                return Some(s.to_string());
            }
        }
    }
    None
}

fn find_options(params: &Value) -> Option<Vec<String>> {
    for key in OPTIONS_KEYS {
        if let Some(array) = params.get(key).and_then(Value::as_array) {
            let values: Vec<String> = array
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
                    _ => None,
                })
                .collect();
            if !values.is_empty() {
                return Some(values);
            }
        }
    }
    None
}
