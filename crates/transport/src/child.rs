// SPDX-License-Identifier: MIT

//! Child Process Handle (§4.3 C4): spawns a command with a chosen working
//! directory and environment, exposing its stdio and exit as channels
//! instead of raw handles. Grounded in the teacher's
//! `adapters/agent/coop/spawn.rs` spawn pattern — piped stdio, an env
//! overlay on top of a base map, and a dedicated reaper task so exit status
//! is always observed.

use crate::error::TransportError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Sigint,
    Sigterm,
}

/// Events a [`ChildHandle`] surfaces in place of raw stdio handles.
#[derive(Debug, Clone)]
pub enum ChildEvent {
    Data(Vec<u8>),
    Exit {
        code: Option<i32>,
        signal: Option<i32>,
    },
    Error(String),
}

#[derive(Debug, Clone)]
pub struct SpawnConfig {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Overlay applied on top of the current process environment. A `None`
    /// value removes the variable instead of setting it.
    pub env: HashMap<String, Option<String>>,
}

impl SpawnConfig {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            working_dir: None,
            env: HashMap::new(),
        }
    }
}

/// A spawned child process plus the plumbing needed to treat it as an
/// ACP peer: its stdin for writing, and a channel of [`ChildEvent`]s
/// fed by a stdout reader and a reaper task.
pub struct ChildHandle {
    stdin: Arc<AsyncMutex<ChildStdin>>,
    pid: u32,
    running: Arc<AtomicBool>,
}

impl ChildHandle {
    pub fn spawn(config: &SpawnConfig) -> Result<(Self, mpsc::UnboundedReceiver<ChildEvent>), TransportError> {
        let mut command = Command::new(&config.command);
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

        let mut child: Child = command.spawn().map_err(TransportError::Spawn)?;
        let pid = child.id().unwrap_or(0);

        let stdin = child.stdin.take().ok_or(TransportError::StdinClosed)?;
        let stdout = child.stdout.take().ok_or(TransportError::ChildExited)?;
        let stderr = child.stderr.take();

        let (tx, rx) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));

        // stdout reader: raw lines forwarded as Data chunks. Line framing
        // into JSON-RPC messages is LineTransport's job, not this handle's
        // — the handle only promises bytes, exit, and error.
        {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stdout);
                let mut buf = Vec::new();
                loop {
                    buf.clear();
                    match reader.read_until(b'\n', &mut buf).await {
                        Ok(0) => break,
                        Ok(_) => {
                            if tx.send(ChildEvent::Data(buf.clone())).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            let _ = tx.send(ChildEvent::Error(err.to_string()));
                            break;
                        }
                    }
                }
            });
        }

        if let Some(stderr) = stderr {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "xpod_transport::child_stderr", %line);
                }
            });
        }

        // Reaper: the only task allowed to call `child.wait()`, so exit
        // status is observed exactly once and the process never zombies.
        {
            let tx = tx.clone();
            let running = running.clone();
            tokio::spawn(async move {
                let status = child.wait().await;
                running.store(false, Ordering::SeqCst);
                match status {
                    Ok(status) => {
                        let _ = tx.send(ChildEvent::Exit {
                            code: status.code(),
                            signal: unix_signal(&status),
                        });
                    }
                    Err(err) => {
                        let _ = tx.send(ChildEvent::Error(err.to_string()));
                    }
                }
            });
        }

        Ok((
            Self {
                stdin: Arc::new(AsyncMutex::new(stdin)),
                pid,
                running,
            },
            rx,
        ))
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn write(&self, text: &str) -> Result<(), TransportError> {
        if !self.is_running() {
            return Err(TransportError::StdinClosed);
        }
        let mut guard = self.stdin.lock().await;
        guard
            .write_all(text.as_bytes())
            .await
            .map_err(TransportError::Write)?;
        guard.flush().await.map_err(TransportError::Write)
    }

    /// Best-effort stop. `SIGINT` does not guarantee death; callers that
    /// need certainty send `SIGTERM` after a bounded wait.
    pub fn stop(&self, signal: StopSignal) -> Result<(), TransportError> {
        let sig = match signal {
            StopSignal::Sigint => nix::sys::signal::Signal::SIGINT,
            StopSignal::Sigterm => nix::sys::signal::Signal::SIGTERM,
        };
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(self.pid as i32), sig)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawns_echo_and_reads_stdout_line() {
        let config = SpawnConfig::new("sh", vec!["-c".into(), "echo hello".into()]);
        let (handle, mut events) = ChildHandle::spawn(&config).unwrap();
        assert!(handle.pid() > 0);

        let mut saw_data = false;
        let mut saw_exit = false;
        while let Some(event) = events.recv().await {
            match event {
                ChildEvent::Data(chunk) => {
                    assert_eq!(chunk, b"hello\n");
                    saw_data = true;
                }
                ChildEvent::Exit { code, .. } => {
                    assert_eq!(code, Some(0));
                    saw_exit = true;
                    break;
                }
                ChildEvent::Error(err) => panic!("unexpected error: {err}"),
            }
        }
        assert!(saw_data && saw_exit);
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn env_overlay_is_visible_to_child() {
        let mut config = SpawnConfig::new("sh", vec!["-c".into(), "echo $XPOD_TEST_VAR".into()]);
        config.env.insert("XPOD_TEST_VAR".into(), Some("marker".into()));
        let (_handle, mut events) = ChildHandle::spawn(&config).unwrap();
        loop {
            match events.recv().await.unwrap() {
                ChildEvent::Data(chunk) => {
                    assert_eq!(chunk, b"marker\n");
                    break;
                }
                ChildEvent::Exit { .. } => panic!("exited before producing output"),
                ChildEvent::Error(err) => panic!("unexpected error: {err}"),
            }
        }
    }
}
