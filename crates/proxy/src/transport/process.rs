//! Host in a `quarry-worker` child process.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use quarry_executor::wire::{decode, encode, frame_len, prefix_for, LEN_PREFIX};
use quarry_executor::{Error, Request, Response, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use super::{Shutdown, Transport};

/// File name of the worker binary, without the platform suffix.
pub const WORKER_BINARY: &str = "quarry-worker";

/// Locate the worker binary: the configured path, else next to the current
/// executable or one directory up (test binaries live in `deps/`).
pub fn resolve_worker(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }

    let exe = std::env::current_exe()
        .map_err(|e| Error::transport(format!("cannot locate current executable: {e}")))?;
    let name = format!("{WORKER_BINARY}{}", std::env::consts::EXE_SUFFIX);
    exe.ancestors()
        .skip(1)
        .take(2)
        .map(|dir| dir.join(&name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| Error::transport(format!("{name} not found next to {}", exe.display())))
}

/// Execution host running as a child process.
pub struct ProcessTransport {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: ChildStdout,
}

impl ProcessTransport {
    /// Start the worker at `path`. The worker waits for `Request::Configure`.
    pub fn spawn(path: &Path) -> Result<Self> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::transport(format!("failed to start {}: {e}", path.display())))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::transport("worker stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::transport("worker stdout unavailable"))?;

        info!(target: "quarry::proxy", worker = %path.display(), pid = ?child.id(), "Spawned worker process");
        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout,
        })
    }

    async fn write_request(&mut self, request: &Request) -> Result<()> {
        let payload = encode(request)?;
        let prefix = prefix_for(&payload)?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::transport("worker input already closed"))?;
        stdin.write_all(&prefix).await.map_err(exited)?;
        stdin.write_all(&payload).await.map_err(exited)?;
        stdin.flush().await.map_err(exited)?;
        Ok(())
    }

    async fn read_response(&mut self) -> Result<Response> {
        let mut prefix = [0u8; LEN_PREFIX];
        self.stdout.read_exact(&mut prefix).await.map_err(exited)?;
        let mut payload = vec![0u8; frame_len(prefix)?];
        self.stdout.read_exact(&mut payload).await.map_err(exited)?;
        decode(&payload)
    }
}

fn exited(e: std::io::Error) -> Error {
    Error::transport(format!("worker process unexpectedly exited: {e}"))
}

#[async_trait]
impl Transport for ProcessTransport {
    async fn round_trip(&mut self, request: Request) -> Result<Response> {
        self.write_request(&request).await?;
        self.read_response().await
    }

    async fn shutdown(&mut self, timeout: Duration) -> Result<Shutdown> {
        if !self.is_alive() {
            self.stdin = None;
            return Ok(Shutdown::AlreadyExited);
        }

        // Closing stdin is the worker's end of input.
        self.stdin = None;
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(target: "quarry::proxy", %status, "Worker exited");
                Ok(Shutdown::Graceful)
            }
            Ok(Err(e)) => Err(Error::transport(format!("waiting for worker failed: {e}"))),
            Err(_) => {
                warn!(target: "quarry::proxy", ?timeout, "Worker did not stop in time; killing");
                self.child.kill().await.map_err(|e| Error::Timeout {
                    reason: format!("worker overran {timeout:?} and could not be killed: {e}"),
                })?;
                Ok(Shutdown::Forced)
            }
        }
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}
